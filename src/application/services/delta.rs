//! # Delta Strategies
//!
//! Per-provider enhancement deltas: what the law requires that the provider
//! quote does not already cover.
//!
//! Strategies are tried in order; the deterministic strategy never fails,
//! so a chain ending with it always yields an outcome.

use crate::application::error::{EnhancementError, EnhancementResult};
use crate::application::services::retry::RetryPolicy;
use crate::domain::entities::{
    EnhancementRecord, EnhancementSource, LegalBaseline, LegalProfile, NormalizedQuote, OverlapAnalysis,
    StandardizedBenefitData,
};
use crate::domain::services::DeterministicCalculator;
use crate::domain::value_objects::money::round_money;
use crate::domain::value_objects::{EnhancementKind, QuoteType};
use crate::infrastructure::reasoning::{EnhancementRequest, ReasoningService};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::baseline::REASONING_DEFAULT_CONFIDENCE;

/// Inputs to a delta computation.
#[derive(Debug, Clone, Copy)]
pub struct DeltaContext<'a> {
    /// Normalized provider quote.
    pub quote: &'a NormalizedQuote,
    /// What the quote already includes.
    pub inclusions: &'a StandardizedBenefitData,
    /// Country legal profile.
    pub profile: &'a LegalProfile,
    /// Legal baseline for the hire.
    pub baseline: &'a LegalBaseline,
    /// Enhancement mode.
    pub quote_type: QuoteType,
    /// Contract length in months.
    pub contract_months: u32,
}

/// Result of a delta computation.
#[derive(Debug, Clone, Default)]
pub struct DeltaOutcome {
    /// Records by kind.
    pub records: BTreeMap<EnhancementKind, EnhancementRecord>,
    /// Overlap analysis, when the strategy produced one.
    pub overlap: Option<OverlapAnalysis>,
    /// Overall confidence, when the strategy produced one.
    pub overall_confidence: Option<f64>,
    /// Data-quality warnings.
    pub warnings: Vec<String>,
    /// Recommendations to surface as explanations.
    pub recommendations: Vec<String>,
}

/// One way of computing deltas.
#[async_trait]
pub trait DeltaStrategy: Send + Sync + fmt::Debug {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// Computes the deltas.
    async fn compute(&self, context: &DeltaContext<'_>) -> EnhancementResult<DeltaOutcome>;
}

/// Asks the reasoning service for the deltas.
#[derive(Debug)]
pub struct ReasoningDeltaStrategy {
    service: Arc<dyn ReasoningService>,
    retry: RetryPolicy,
}

impl ReasoningDeltaStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(service: Arc<dyn ReasoningService>, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }
}

#[async_trait]
impl DeltaStrategy for ReasoningDeltaStrategy {
    fn name(&self) -> &'static str {
        "reasoning"
    }

    async fn compute(&self, context: &DeltaContext<'_>) -> EnhancementResult<DeltaOutcome> {
        let request = EnhancementRequest {
            provider: context.quote.provider(),
            base_quote: context.quote.clone(),
            quote_type: context.quote_type,
            contract_duration_months: context.contract_months,
            extracted_benefits: context.inclusions.clone(),
            legal_profile: context.profile.clone(),
            prepass_baseline: None,
        };

        let response = self
            .retry
            .run("compute_enhancements", |_| self.service.compute_enhancements(&request))
            .await?;

        let mut warnings = response.warnings;
        let mut records = BTreeMap::new();
        for (key, item) in response.enhancements {
            let Some(kind) = EnhancementKind::from_reasoning_key(&key) else {
                warn!(key = %key, provider = %context.quote.provider(), "ignoring unknown enhancement");
                warnings.push(format!("reasoning service returned unknown enhancement `{key}`"));
                continue;
            };

            let confidence = item.confidence.unwrap_or(REASONING_DEFAULT_CONFIDENCE).clamp(0.0, 1.0);
            let mandatory = context.baseline.items.get(&kind).is_some_and(|b| b.mandatory);
            let record = if item.already_included {
                EnhancementRecord::already_included(kind, item.explanation, confidence, EnhancementSource::Reasoning)
            } else {
                let amount = round_money(item.monthly_amount.unwrap_or(Decimal::ZERO).max(Decimal::ZERO));
                EnhancementRecord::missing(kind, amount, item.explanation, confidence, EnhancementSource::Reasoning)
            };
            records.insert(kind, record.mandatory(mandatory));
        }

        if records.is_empty() && !context.baseline.items.is_empty() {
            return Err(EnhancementError::reasoning_service(
                self.retry.max_attempts(),
                "reasoning service returned no usable enhancements",
            ));
        }

        let analysis = response.analysis;
        Ok(DeltaOutcome {
            records,
            overlap: Some(OverlapAnalysis {
                provider_coverage: analysis.provider_coverage,
                missing_requirements: analysis.missing_requirements,
                double_counting_risks: analysis.double_counting_risks,
            }),
            overall_confidence: response.confidence_scores.overall.map(|c| c.clamp(0.0, 1.0)),
            warnings,
            recommendations: response.recommendations,
        })
    }
}

/// Computes deltas from the baseline with the deterministic calculator.
#[derive(Debug, Clone, Default)]
pub struct DeterministicDeltaStrategy {
    calculator: DeterministicCalculator,
}

impl DeterministicDeltaStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(calculator: DeterministicCalculator) -> Self {
        Self { calculator }
    }

    /// Computes the outcome synchronously.
    #[must_use]
    pub fn outcome(&self, baseline: &LegalBaseline, inclusions: &StandardizedBenefitData) -> DeltaOutcome {
        let records = self.calculator.deltas(baseline, inclusions);
        let overlap = self.calculator.overlap_analysis(baseline, inclusions, &records);
        DeltaOutcome {
            records,
            overlap: Some(overlap),
            overall_confidence: None,
            warnings: baseline.warnings.clone(),
            recommendations: Vec::new(),
        }
    }
}

#[async_trait]
impl DeltaStrategy for DeterministicDeltaStrategy {
    fn name(&self) -> &'static str {
        "deterministic"
    }

    async fn compute(&self, context: &DeltaContext<'_>) -> EnhancementResult<DeltaOutcome> {
        Ok(self.outcome(context.baseline, context.inclusions))
    }
}

/// Ordered list of delta strategies; the first success wins.
#[derive(Debug, Default)]
pub struct DeltaChain {
    strategies: Vec<Arc<dyn DeltaStrategy>>,
}

impl DeltaChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a strategy.
    #[must_use]
    pub fn then(mut self, strategy: Arc<dyn DeltaStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Returns the strategy names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Runs the strategies in order.
    ///
    /// # Errors
    ///
    /// Returns the last strategy's error if every strategy fails.
    pub async fn compute(&self, context: &DeltaContext<'_>) -> EnhancementResult<DeltaOutcome> {
        let mut last_error = EnhancementError::internal("no delta strategy configured");
        for strategy in &self.strategies {
            match strategy.compute(context).await {
                Ok(outcome) => {
                    debug!(strategy = strategy.name(), provider = %context.quote.provider(), "deltas computed");
                    return Ok(outcome);
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), provider = %context.quote.provider(), error = %e, "delta strategy failed; trying next");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

/// Merges externally computed records with deterministic ones.
///
/// An external record wins only when it adds a positive amount; otherwise
/// the deterministic record for the same kind is used, so mandated items
/// are never dropped. Kinds only one side knows are kept as they are.
#[must_use]
pub fn merge_records(
    external: BTreeMap<EnhancementKind, EnhancementRecord>,
    deterministic: BTreeMap<EnhancementKind, EnhancementRecord>,
) -> BTreeMap<EnhancementKind, EnhancementRecord> {
    let mut merged = deterministic;
    for (kind, record) in external {
        let adds_amount = record.contribution() > Decimal::ZERO;
        if adds_amount || !merged.contains_key(&kind) {
            merged.insert(kind, record);
        }
    }
    merged
}
