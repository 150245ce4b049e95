//! # Standardized Benefit Data
//!
//! What a provider's quote already includes, classified into the fixed
//! [`BenefitKey`] taxonomy and normalized to monthly amounts.

use crate::domain::value_objects::{BenefitKey, Frequency, ProviderKind, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One benefit category found in a provider quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludedBenefit {
    /// Amount at `frequency`.
    pub amount: Decimal,
    /// Frequency of `amount`.
    pub frequency: Frequency,
    /// Label of the first line item classified into this category.
    pub description: String,
}

impl IncludedBenefit {
    /// Returns the monthly equivalent of this benefit.
    #[must_use]
    pub fn monthly_amount(&self) -> Decimal {
        self.frequency.to_monthly(self.amount)
    }
}

/// A provider quote's inclusions, derived without any external call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedBenefitData {
    /// Provider the data was extracted from.
    pub provider: ProviderKind,
    /// Base salary from the normalized quote.
    pub base_salary: Decimal,
    /// Quote currency.
    pub currency: String,
    /// Quote country.
    pub country: String,
    /// Monthly total from the normalized quote.
    pub monthly_total: Decimal,
    /// Categories found in the quote.
    pub included_benefits: BTreeMap<BenefitKey, IncludedBenefit>,
    /// Sum of the monthly amounts of all included benefits.
    pub total_monthly_benefits: Decimal,
    /// Confidence in the extraction, in `[0, 1]`.
    pub extraction_confidence: f64,
    /// When the extraction ran.
    pub extracted_at: Timestamp,
}

impl StandardizedBenefitData {
    /// Returns the monthly amount the provider covers for `key`, or zero.
    #[must_use]
    pub fn covered_monthly(&self, key: BenefitKey) -> Decimal {
        self.included_benefits
            .get(&key)
            .map(IncludedBenefit::monthly_amount)
            .unwrap_or(Decimal::ZERO)
    }

    /// Returns true if the provider quote lists `key`.
    #[must_use]
    pub fn includes(&self, key: BenefitKey) -> bool {
        self.included_benefits.contains_key(&key)
    }

    /// Returns the benefit keys found, in taxonomy order.
    #[must_use]
    pub fn found_keys(&self) -> Vec<BenefitKey> {
        self.included_benefits.keys().copied().collect()
    }
}
