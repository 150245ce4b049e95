//! # Normalized Quote Entity
//!
//! One provider-independent shape for EOR quotes.
//!
//! Every provider answers a cost request with its own JSON layout. The
//! [`QuoteNormalizer`](crate::domain::services::QuoteNormalizer) maps each
//! layout onto a [`NormalizedQuote`], which is what the rest of the engine
//! works with. The provider's untouched response is kept in
//! `original_response` so later stages can read provider-specific line items.
//!
//! Callers that already hold a normalized quote say so explicitly through
//! [`QuoteInput::Normalized`]; the engine never guesses from the shape.
//!
//! # Examples
//!
//! ```
//! use eor_quote_engine::domain::entities::NormalizedQuote;
//! use eor_quote_engine::domain::value_objects::ProviderKind;
//! use rust_decimal::Decimal;
//!
//! let quote = NormalizedQuote::new(
//!     ProviderKind::Remote,
//!     Decimal::from(5000),
//!     "EUR",
//!     "Portugal",
//!     Decimal::from(6400),
//! );
//! assert!(quote.is_valid());
//! ```

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::ProviderKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A provider quote mapped onto the common shape.
///
/// # Invariants
///
/// A quote is considered valid when `provider`, `currency` and `country` are
/// non-empty and `monthly_total` is strictly positive. Validation is a pure
/// predicate; construction never fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedQuote {
    provider: ProviderKind,
    base_cost: Decimal,
    currency: String,
    country: String,
    monthly_total: Decimal,
    #[serde(default)]
    breakdown: BTreeMap<String, Decimal>,
    #[serde(default)]
    original_response: Value,
}

impl NormalizedQuote {
    /// Creates a normalized quote with an empty breakdown.
    #[must_use]
    pub fn new(
        provider: ProviderKind,
        base_cost: Decimal,
        currency: impl Into<String>,
        country: impl Into<String>,
        monthly_total: Decimal,
    ) -> Self {
        Self {
            provider,
            base_cost,
            currency: currency.into().trim().to_uppercase(),
            country: country.into().trim().to_string(),
            monthly_total,
            breakdown: BTreeMap::new(),
            original_response: Value::Null,
        }
    }

    /// Adds a breakdown entry.
    ///
    /// Zero amounts are skipped so the breakdown only lists recognized,
    /// populated categories.
    #[must_use]
    pub fn with_breakdown_entry(mut self, category: impl Into<String>, amount: Decimal) -> Self {
        if !amount.is_zero() {
            self.breakdown.insert(category.into(), amount);
        }
        self
    }

    /// Attaches the provider's untouched response.
    #[must_use]
    pub fn with_original_response(mut self, response: Value) -> Self {
        self.original_response = response;
        self
    }

    /// Returns the provider.
    #[inline]
    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    /// Returns the base (gross salary) cost.
    #[inline]
    #[must_use]
    pub fn base_cost(&self) -> Decimal {
        self.base_cost
    }

    /// Returns the ISO currency code.
    #[inline]
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Returns the country name or code as reported by the provider.
    #[inline]
    #[must_use]
    pub fn country(&self) -> &str {
        &self.country
    }

    /// Returns the monthly total employment cost.
    #[inline]
    #[must_use]
    pub fn monthly_total(&self) -> Decimal {
        self.monthly_total
    }

    /// Returns the recognized cost categories.
    #[inline]
    #[must_use]
    pub fn breakdown(&self) -> &BTreeMap<String, Decimal> {
        &self.breakdown
    }

    /// Returns the provider's original response.
    #[inline]
    #[must_use]
    pub fn original_response(&self) -> &Value {
        &self.original_response
    }

    /// Returns true if the quote satisfies the validity predicate.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Validates the quote, naming the first failed condition.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidNormalizedQuote` when the currency or
    /// country is empty or the monthly total is not positive.
    pub fn validate(&self) -> DomainResult<()> {
        if self.currency.is_empty() {
            return Err(DomainError::invalid_normalized_quote(format!(
                "{} quote has no currency",
                self.provider
            )));
        }
        if self.country.is_empty() {
            return Err(DomainError::invalid_normalized_quote(format!(
                "{} quote has no country",
                self.provider
            )));
        }
        if self.monthly_total <= Decimal::ZERO {
            return Err(DomainError::invalid_normalized_quote(format!(
                "{} quote has non-positive monthly total {}",
                self.provider, self.monthly_total
            )));
        }
        Ok(())
    }
}

impl fmt::Display for NormalizedQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NormalizedQuote({} {} {} base={} total={})",
            self.provider, self.country, self.currency, self.base_cost, self.monthly_total
        )
    }
}

/// A provider response exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProviderQuote {
    /// The provider that produced the payload.
    pub provider: ProviderKind,
    /// The untouched JSON payload.
    pub payload: Value,
}

impl RawProviderQuote {
    /// Creates a raw provider quote.
    #[must_use]
    pub fn new(provider: ProviderKind, payload: Value) -> Self {
        Self { provider, payload }
    }
}

/// Input to the enhancement engine: either a raw provider response or a quote
/// that the caller has already normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuoteInput {
    /// A provider response that still needs normalizing.
    Raw(RawProviderQuote),
    /// An already normalized quote.
    Normalized(NormalizedQuote),
}

impl QuoteInput {
    /// Wraps a raw payload.
    #[must_use]
    pub fn raw(provider: ProviderKind, payload: Value) -> Self {
        Self::Raw(RawProviderQuote::new(provider, payload))
    }

    /// Returns the provider this input belongs to.
    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        match self {
            Self::Raw(raw) => raw.provider,
            Self::Normalized(quote) => quote.provider(),
        }
    }

    /// Returns the provider's response payload.
    ///
    /// For normalized inputs this is the retained original response.
    #[must_use]
    pub fn provider_payload(&self) -> &Value {
        match self {
            Self::Raw(raw) => &raw.payload,
            Self::Normalized(quote) => quote.original_response(),
        }
    }
}

impl From<NormalizedQuote> for QuoteInput {
    fn from(quote: NormalizedQuote) -> Self {
        Self::Normalized(quote)
    }
}

impl From<RawProviderQuote> for QuoteInput {
    fn from(raw: RawProviderQuote) -> Self {
        Self::Raw(raw)
    }
}
