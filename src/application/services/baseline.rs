//! # Legal Baseline Resolution
//!
//! Computes the provider-independent [`LegalBaseline`] for one hire.
//!
//! Strategies are tried in order by a [`BaselineChain`]; each failure hands
//! over to the next:
//!
//! ```text
//! ReasoningBaselineStrategy (≤ 2 attempts) ─▶ DeterministicBaselineStrategy
//! ```
//!
//! [`BaselineResolver`] fronts the chain with a TTL cache and an in-flight
//! registry so concurrent requests for the same key share one resolution.
//! Each resolution runs as its own task and completes even if every caller
//! goes away.

use crate::application::error::{EnhancementError, EnhancementResult};
use crate::application::services::retry::RetryPolicy;
use crate::domain::entities::{BaselineItem, BaselineSource, LegalBaseline, LegalProfile};
use crate::domain::services::{BaselineInput, DeterministicCalculator};
use crate::domain::value_objects::money::round_money;
use crate::domain::value_objects::{EmploymentType, EnhancementKind, QuoteType};
use crate::infrastructure::cache::{CacheStats, TtlCache, content_hash};
use crate::infrastructure::reasoning::{BaselineRequest, ReasoningService};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Confidence assumed for reasoning items that carry none.
pub const REASONING_DEFAULT_CONFIDENCE: f64 = 0.7;

/// Everything a baseline depends on.
#[derive(Debug, Clone)]
pub struct BaselineContext {
    /// Country legal profile.
    pub profile: Arc<LegalProfile>,
    /// Monthly gross salary.
    pub base_salary: Decimal,
    /// Salary currency.
    pub currency: String,
    /// Contract length in months.
    pub contract_months: u32,
    /// Employment type.
    pub employment_type: EmploymentType,
    /// Enhancement mode.
    pub quote_type: QuoteType,
}

impl BaselineContext {
    /// Returns the de-duplication and cache key.
    #[must_use]
    pub fn key(&self) -> String {
        let projection = json!({
            "country": self.profile.country_code,
            "employmentType": self.employment_type.as_str(),
            "contractMonths": self.contract_months,
            "quoteType": self.quote_type.as_str(),
            "baseSalary": self.base_salary.normalize().to_string(),
            "currency": self.currency.to_uppercase(),
        });
        format!("baseline:{}", content_hash(&projection))
    }

    fn calculator_input(&self) -> BaselineInput<'_> {
        BaselineInput {
            requirements: &self.profile.requirements,
            base_salary: self.base_salary,
            currency: &self.currency,
            contract_months: self.contract_months,
            quote_type: self.quote_type,
        }
    }
}

/// One way of computing a baseline.
#[async_trait]
pub trait BaselineStrategy: Send + Sync + fmt::Debug {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// Computes the baseline.
    async fn resolve(&self, context: &BaselineContext) -> EnhancementResult<LegalBaseline>;
}

/// Asks the reasoning service for the baseline.
#[derive(Debug)]
pub struct ReasoningBaselineStrategy {
    service: Arc<dyn ReasoningService>,
    retry: RetryPolicy,
}

impl ReasoningBaselineStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(service: Arc<dyn ReasoningService>, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }
}

#[async_trait]
impl BaselineStrategy for ReasoningBaselineStrategy {
    fn name(&self) -> &'static str {
        "reasoning"
    }

    async fn resolve(&self, context: &BaselineContext) -> EnhancementResult<LegalBaseline> {
        let request = BaselineRequest {
            country_code: context.profile.country_code.clone(),
            country_name: context.profile.country_name.clone(),
            base_salary: context.base_salary,
            currency: context.currency.clone(),
            contract_duration_months: context.contract_months,
            employment_type: context.employment_type,
            quote_type: context.quote_type,
            legal_profile: context.profile.as_ref().clone(),
        };

        let response = self
            .retry
            .run("compute_baseline", |_| self.service.compute_baseline(&request))
            .await?;

        let mut warnings = response.warnings;
        let mut items = BTreeMap::new();
        for (key, item) in response.items {
            let Some(kind) = EnhancementKind::from_reasoning_key(&key) else {
                warn!(key = %key, "ignoring unknown baseline item");
                warnings.push(format!("reasoning service returned unknown item `{key}`"));
                continue;
            };
            if context.quote_type.is_statutory_only()
                && (kind.is_termination_provision() || (kind.is_allowance() && !item.mandatory))
            {
                continue;
            }
            let amount = round_money(item.monthly_amount.unwrap_or(Decimal::ZERO).max(Decimal::ZERO));
            items.insert(
                kind,
                BaselineItem {
                    monthly_amount: amount,
                    mandatory: item.mandatory,
                    explanation: item.explanation,
                    confidence: item
                        .confidence
                        .unwrap_or(REASONING_DEFAULT_CONFIDENCE)
                        .clamp(0.0, 1.0),
                },
            );
        }

        if items.is_empty() {
            return Err(EnhancementError::reasoning_service(
                self.retry.max_attempts(),
                "reasoning service returned no usable baseline items",
            ));
        }

        Ok(LegalBaseline {
            items,
            source: BaselineSource::Reasoning,
            currency: context.currency.clone(),
            base_salary: context.base_salary,
            contract_months: context.contract_months,
            quote_type: context.quote_type,
            warnings,
        })
    }
}

/// Computes the baseline with closed-form formulas.
#[derive(Debug, Clone, Default)]
pub struct DeterministicBaselineStrategy {
    calculator: DeterministicCalculator,
}

impl DeterministicBaselineStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new(calculator: DeterministicCalculator) -> Self {
        Self { calculator }
    }
}

#[async_trait]
impl BaselineStrategy for DeterministicBaselineStrategy {
    fn name(&self) -> &'static str {
        "deterministic"
    }

    async fn resolve(&self, context: &BaselineContext) -> EnhancementResult<LegalBaseline> {
        Ok(self.calculator.baseline(context.calculator_input()))
    }
}

/// Ordered list of strategies; the first success wins.
#[derive(Debug, Default)]
pub struct BaselineChain {
    strategies: Vec<Arc<dyn BaselineStrategy>>,
}

impl BaselineChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a strategy.
    #[must_use]
    pub fn then(mut self, strategy: Arc<dyn BaselineStrategy>) -> Self {
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
    pub async fn resolve(&self, context: &BaselineContext) -> EnhancementResult<LegalBaseline> {
        let mut last_error = EnhancementError::internal("no baseline strategy configured");
        for strategy in &self.strategies {
            match strategy.resolve(context).await {
                Ok(baseline) => {
                    debug!(strategy = strategy.name(), country = %context.profile.country_code, "baseline resolved");
                    return Ok(baseline);
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), country = %context.profile.country_code, error = %e, "baseline strategy failed; trying next");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

type BaselineFuture = Shared<BoxFuture<'static, EnhancementResult<LegalBaseline>>>;

/// Cached, de-duplicating front for a [`BaselineChain`].
#[derive(Debug)]
pub struct BaselineResolver {
    chain: Arc<BaselineChain>,
    cache: Arc<TtlCache<LegalBaseline>>,
    in_flight: Arc<Mutex<HashMap<String, BaselineFuture>>>,
}

impl BaselineResolver {
    /// Creates a resolver whose baselines live for `ttl`.
    #[must_use]
    pub fn new(chain: BaselineChain, ttl: Duration, max_entries: usize) -> Self {
        Self {
            chain: Arc::new(chain),
            cache: Arc::new(TtlCache::new(ttl, max_entries)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the chain.
    #[must_use]
    pub fn chain(&self) -> &BaselineChain {
        &self.chain
    }

    /// Returns the cached baseline for `context`, joins an in-flight
    /// resolution for the same key, or starts one.
    ///
    /// # Errors
    ///
    /// Returns the chain's error. Failures are not cached.
    pub async fn resolve(&self, context: BaselineContext) -> EnhancementResult<LegalBaseline> {
        let key = context.key();
        if let Some(baseline) = self.cache.get(&key) {
            debug!(country = %context.profile.country_code, "baseline cache hit");
            return Ok(baseline);
        }

        let pending = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&key) {
                Some(pending) => {
                    debug!(country = %context.profile.country_code, "joining in-flight baseline");
                    pending.clone()
                }
                None => {
                    let pending = self.spawn_resolution(key.clone(), context);
                    in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Must be called with the in-flight lock held so the task cannot
    /// deregister before it is registered.
    fn spawn_resolution(&self, key: String, context: BaselineContext) -> BaselineFuture {
        let chain = Arc::clone(&self.chain);
        let cache = Arc::clone(&self.cache);
        let in_flight = Arc::clone(&self.in_flight);

        let task = tokio::spawn(async move {
            let result = chain.resolve(&context).await;
            if let Ok(baseline) = &result {
                info!(country = %context.profile.country_code, source = %baseline.source, "baseline cached");
                cache.insert(key.clone(), baseline.clone());
            }
            in_flight.lock().remove(&key);
            result
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(EnhancementError::internal(format!("baseline task failed: {e}"))))
        }
        .boxed()
        .shared()
    }

    /// Returns the number of resolutions in flight.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Returns the baseline cache counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops every cached baseline.
    pub fn clear(&self) {
        self.cache.clear();
    }
}
