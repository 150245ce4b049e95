//! # Enhanced Quote Entity
//!
//! A provider quote plus the statutory items it was missing.
//!
//! An [`EnhancedQuote`] is only ever produced through
//! [`EnhancedQuote::assemble`], which recomputes the totals from the
//! enhancement records and then validates every invariant. A quote that
//! fails validation is never returned.
//!
//! # Invariants
//!
//! - `final_total = base_quote.monthly_total + total_enhancement` (two
//!   decimal precision)
//! - `total_enhancement >= 0`
//! - every record has a non-negative monthly amount; records flagged
//!   `is_already_included` contribute zero to the total
//! - statutory-only quotes carry no severance, probation, or termination
//!   records
//! - `overall_confidence` lies in `[0, 1]`

use crate::domain::entities::normalized_quote::NormalizedQuote;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::money::{money_eq, round_money};
use crate::domain::value_objects::{EnhancementKind, ProviderKind, QuoteType, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Where an enhancement record's amount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnhancementSource {
    /// Computed by the reasoning service.
    Reasoning,
    /// Computed by the deterministic calculator.
    Deterministic,
    /// Supplied by the caller's local office.
    LocalOffice,
}

impl fmt::Display for EnhancementSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reasoning => write!(f, "reasoning"),
            Self::Deterministic => write!(f, "deterministic"),
            Self::LocalOffice => write!(f, "localOffice"),
        }
    }
}

/// One statutory item added on top of (or found inside) a provider quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementRecord {
    /// Kind of item.
    pub kind: EnhancementKind,
    /// Monthly amount missing from the provider quote.
    pub monthly_amount: Decimal,
    /// The provider quote already covers this item.
    pub is_already_included: bool,
    /// The law makes this item unavoidable.
    pub is_mandatory: bool,
    /// How the amount was obtained.
    pub explanation: String,
    /// Confidence in the amount, in `[0, 1]`.
    pub confidence: f64,
    /// Origin of the amount.
    pub source: EnhancementSource,
}

impl EnhancementRecord {
    /// Creates a record for an amount the provider quote is missing.
    #[must_use]
    pub fn missing(
        kind: EnhancementKind,
        monthly_amount: Decimal,
        explanation: impl Into<String>,
        confidence: f64,
        source: EnhancementSource,
    ) -> Self {
        Self {
            kind,
            monthly_amount: round_money(monthly_amount),
            is_already_included: false,
            is_mandatory: false,
            explanation: explanation.into(),
            confidence,
            source,
        }
    }

    /// Creates a record for an item the provider quote already covers.
    #[must_use]
    pub fn already_included(
        kind: EnhancementKind,
        explanation: impl Into<String>,
        confidence: f64,
        source: EnhancementSource,
    ) -> Self {
        Self {
            kind,
            monthly_amount: Decimal::ZERO,
            is_already_included: true,
            is_mandatory: false,
            explanation: explanation.into(),
            confidence,
            source,
        }
    }

    /// Marks the record as legally mandatory.
    #[must_use]
    pub fn mandatory(mut self, is_mandatory: bool) -> Self {
        self.is_mandatory = is_mandatory;
        self
    }

    /// Returns the amount this record contributes to the enhancement total.
    #[must_use]
    pub fn contribution(&self) -> Decimal {
        if self.is_already_included {
            Decimal::ZERO
        } else {
            self.monthly_amount
        }
    }

    /// Returns the yearly equivalent of the monthly amount.
    #[must_use]
    pub fn yearly_amount(&self) -> Decimal {
        round_money(self.monthly_amount * Decimal::from(12))
    }
}

/// Monthly cost summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCostBreakdown {
    /// Provider's monthly total.
    pub base_cost: Decimal,
    /// Sum of enhancement contributions.
    pub enhancements: Decimal,
    /// `base_cost + enhancements`.
    pub total: Decimal,
}

/// How the provider's inclusions overlap with legal requirements.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapAnalysis {
    /// Items the provider quote already covers.
    #[serde(default)]
    pub provider_coverage: Vec<String>,
    /// Mandatory items the provider quote misses.
    #[serde(default)]
    pub missing_requirements: Vec<String>,
    /// Items at risk of being counted twice.
    #[serde(default)]
    pub double_counting_risks: Vec<String>,
}

/// Inputs to [`EnhancedQuote::assemble`].
#[derive(Debug, Clone)]
pub struct EnhancedQuoteParts {
    /// Provider.
    pub provider: ProviderKind,
    /// Normalized provider quote.
    pub base_quote: NormalizedQuote,
    /// Enhancement mode.
    pub quote_type: QuoteType,
    /// Records by kind.
    pub enhancements: BTreeMap<EnhancementKind, EnhancementRecord>,
    /// Overall confidence, in `[0, 1]`.
    pub overall_confidence: f64,
    /// Explanations, in presentation order.
    pub explanations: Vec<String>,
    /// Data-quality warnings.
    pub warnings: Vec<String>,
    /// Overlap analysis.
    pub overlap_analysis: OverlapAnalysis,
}

/// A provider quote enhanced with statutory items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedQuote {
    provider: ProviderKind,
    base_quote: NormalizedQuote,
    quote_type: QuoteType,
    enhancements: BTreeMap<EnhancementKind, EnhancementRecord>,
    total_enhancement: Decimal,
    final_total: Decimal,
    monthly_cost_breakdown: MonthlyCostBreakdown,
    overall_confidence: f64,
    explanations: Vec<String>,
    warnings: Vec<String>,
    overlap_analysis: OverlapAnalysis,
    calculated_at: Timestamp,
    base_currency: String,
}

impl EnhancedQuote {
    /// Builds an enhanced quote, recomputing totals and validating.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidEnhancedQuote` if any invariant fails.
    pub fn assemble(parts: EnhancedQuoteParts) -> DomainResult<Self> {
        let total_enhancement = round_money(
            parts
                .enhancements
                .values()
                .map(EnhancementRecord::contribution)
                .sum(),
        );
        let base_total = parts.base_quote.monthly_total();
        let final_total = round_money(base_total + total_enhancement);
        let base_currency = parts.base_quote.currency().to_string();

        let quote = Self {
            provider: parts.provider,
            quote_type: parts.quote_type,
            enhancements: parts.enhancements,
            total_enhancement,
            final_total,
            monthly_cost_breakdown: MonthlyCostBreakdown {
                base_cost: base_total,
                enhancements: total_enhancement,
                total: final_total,
            },
            overall_confidence: parts.overall_confidence,
            explanations: parts.explanations,
            warnings: parts.warnings,
            overlap_analysis: parts.overlap_analysis,
            calculated_at: Timestamp::now(),
            base_currency,
            base_quote: parts.base_quote,
        };

        quote.validate()?;
        Ok(quote)
    }

    /// Checks every invariant.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidEnhancedQuote` naming the first violation.
    pub fn validate(&self) -> DomainResult<()> {
        for (kind, record) in &self.enhancements {
            if record.kind != *kind {
                return Err(DomainError::invalid_enhanced_quote(format!(
                    "record stored under {} has kind {}",
                    kind, record.kind
                )));
            }
            if record.monthly_amount < Decimal::ZERO {
                return Err(DomainError::invalid_enhanced_quote(format!(
                    "{} has negative monthly amount {}",
                    kind, record.monthly_amount
                )));
            }
            if !(0.0..=1.0).contains(&record.confidence) {
                return Err(DomainError::invalid_enhanced_quote(format!(
                    "{} has confidence {} outside [0, 1]",
                    kind, record.confidence
                )));
            }
            if self.quote_type.is_statutory_only() && kind.is_termination_provision() {
                return Err(DomainError::invalid_enhanced_quote(format!(
                    "statutory-only quote carries {}",
                    kind
                )));
            }
        }

        let expected_total: Decimal = self
            .enhancements
            .values()
            .map(EnhancementRecord::contribution)
            .sum();
        if self.total_enhancement < Decimal::ZERO {
            return Err(DomainError::invalid_enhanced_quote(format!(
                "negative total enhancement {}",
                self.total_enhancement
            )));
        }
        if !money_eq(self.total_enhancement, expected_total) {
            return Err(DomainError::invalid_enhanced_quote(format!(
                "total enhancement {} does not match records sum {}",
                self.total_enhancement, expected_total
            )));
        }
        if !money_eq(
            self.final_total,
            self.base_quote.monthly_total() + self.total_enhancement,
        ) {
            return Err(DomainError::invalid_enhanced_quote(format!(
                "final total {} != base {} + enhancements {}",
                self.final_total,
                self.base_quote.monthly_total(),
                self.total_enhancement
            )));
        }
        if !(0.0..=1.0).contains(&self.overall_confidence) {
            return Err(DomainError::invalid_enhanced_quote(format!(
                "overall confidence {} outside [0, 1]",
                self.overall_confidence
            )));
        }
        Ok(())
    }

    /// Returns the provider.
    #[inline]
    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Returns the normalized provider quote.
    #[inline]
    #[must_use]
    pub fn base_quote(&self) -> &NormalizedQuote {
        &self.base_quote
    }

    /// Returns the enhancement mode.
    #[inline]
    #[must_use]
    pub fn quote_type(&self) -> QuoteType {
        self.quote_type
    }

    /// Returns all records.
    #[inline]
    #[must_use]
    pub fn enhancements(&self) -> &BTreeMap<EnhancementKind, EnhancementRecord> {
        &self.enhancements
    }

    /// Returns the record for `kind`, if present.
    #[must_use]
    pub fn enhancement(&self, kind: EnhancementKind) -> Option<&EnhancementRecord> {
        self.enhancements.get(&kind)
    }

    /// Returns the sum of record contributions.
    #[inline]
    #[must_use]
    pub fn total_enhancement(&self) -> Decimal {
        self.total_enhancement
    }

    /// Returns the provider total plus enhancements.
    #[inline]
    #[must_use]
    pub fn final_total(&self) -> Decimal {
        self.final_total
    }

    /// Returns the monthly cost summary.
    #[inline]
    #[must_use]
    pub fn monthly_cost_breakdown(&self) -> &MonthlyCostBreakdown {
        &self.monthly_cost_breakdown
    }

    /// Returns the overall confidence.
    #[inline]
    #[must_use]
    pub fn overall_confidence(&self) -> f64 {
        self.overall_confidence
    }

    /// Returns the explanations.
    #[inline]
    #[must_use]
    pub fn explanations(&self) -> &[String] {
        &self.explanations
    }

    /// Returns the warnings.
    #[inline]
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Returns the overlap analysis.
    #[inline]
    #[must_use]
    pub fn overlap_analysis(&self) -> &OverlapAnalysis {
        &self.overlap_analysis
    }

    /// Returns when the quote was calculated.
    #[inline]
    #[must_use]
    pub fn calculated_at(&self) -> Timestamp {
        self.calculated_at
    }

    /// Returns the currency of every amount.
    #[inline]
    #[must_use]
    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }
}

impl fmt::Display for EnhancedQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EnhancedQuote({} {} base={} +{} = {} {})",
            self.provider,
            self.quote_type,
            self.base_quote.monthly_total(),
            self.total_enhancement,
            self.final_total,
            self.base_currency
        )
    }
}
