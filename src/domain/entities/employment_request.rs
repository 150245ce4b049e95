//! # Employment Request
//!
//! The caller's description of the hire being quoted: country, salary,
//! contract length, and optional local-office benefits.

use crate::domain::value_objects::money::round_money;
use crate::domain::value_objects::EmploymentType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Contract length assumed when the caller does not give one.
pub const DEFAULT_CONTRACT_MONTHS: u32 = 12;

/// Benefits a client's local office already grants its employees.
///
/// All amounts are monthly and expressed in `currency`. They are only added
/// to a quote whose currency matches; a mismatch is reported as a warning
/// and the amounts are left out of the totals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalOfficeBenefits {
    /// ISO currency code of the amounts below.
    pub currency: String,
    /// Monthly meal voucher value.
    #[serde(default)]
    pub meal_voucher: Option<Decimal>,
    /// Monthly transportation support.
    #[serde(default)]
    pub transportation: Option<Decimal>,
    /// Monthly internet/wifi stipend.
    #[serde(default)]
    pub wifi: Option<Decimal>,
    /// Monthly share of occupational medical exams.
    #[serde(default)]
    pub medical_exam: Option<Decimal>,
    /// Any other monthly benefit.
    #[serde(default)]
    pub other: Option<Decimal>,
}

impl LocalOfficeBenefits {
    /// Returns the populated, positive benefit lines as `(label, amount)`.
    #[must_use]
    pub fn items(&self) -> Vec<(&'static str, Decimal)> {
        [
            ("meal voucher", self.meal_voucher),
            ("transportation", self.transportation),
            ("wifi", self.wifi),
            ("medical exam", self.medical_exam),
            ("other", self.other),
        ]
        .into_iter()
        .filter_map(|(label, amount)| amount.filter(|a| *a > Decimal::ZERO).map(|a| (label, a)))
        .collect()
    }

    /// Returns the sum of all positive benefit lines.
    #[must_use]
    pub fn monthly_total(&self) -> Decimal {
        round_money(self.items().iter().map(|(_, amount)| *amount).sum())
    }

    /// Returns true if this set of benefits is expressed in `currency`.
    #[must_use]
    pub fn matches_currency(&self, currency: &str) -> bool {
        self.currency.trim().eq_ignore_ascii_case(currency.trim())
    }
}

/// Form data describing the requested employment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentRequest {
    /// ISO 3166 country code (aliases such as `UK` are accepted).
    pub country_code: String,
    /// Display name of the country.
    #[serde(default)]
    pub country_name: Option<String>,
    /// Gross monthly salary requested.
    pub base_salary: Decimal,
    /// Currency of `base_salary`.
    pub currency: String,
    /// Contract duration in months; zero means the default of 12.
    #[serde(default)]
    pub contract_duration_months: u32,
    /// Requested contract type.
    #[serde(default)]
    pub employment_type: EmploymentType,
    /// Benefits granted by the client's local office, if any.
    #[serde(default)]
    pub local_office_benefits: Option<LocalOfficeBenefits>,
}

impl EmploymentRequest {
    /// Creates a full-time request with the default contract length.
    #[must_use]
    pub fn new(
        country_code: impl Into<String>,
        base_salary: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            country_code: country_code.into(),
            country_name: None,
            base_salary,
            currency: currency.into(),
            contract_duration_months: DEFAULT_CONTRACT_MONTHS,
            employment_type: EmploymentType::FullTime,
            local_office_benefits: None,
        }
    }

    /// Sets the country display name.
    #[must_use]
    pub fn with_country_name(mut self, name: impl Into<String>) -> Self {
        self.country_name = Some(name.into());
        self
    }

    /// Sets the contract duration in months.
    #[must_use]
    pub fn with_contract_months(mut self, months: u32) -> Self {
        self.contract_duration_months = months;
        self
    }

    /// Sets the employment type.
    #[must_use]
    pub fn with_employment_type(mut self, employment_type: EmploymentType) -> Self {
        self.employment_type = employment_type;
        self
    }

    /// Sets local-office benefits.
    #[must_use]
    pub fn with_local_office_benefits(mut self, benefits: LocalOfficeBenefits) -> Self {
        self.local_office_benefits = Some(benefits);
        self
    }

    /// Returns the effective contract length, falling back to `default_months`
    /// when none was given.
    #[must_use]
    pub fn contract_months_or(&self, default_months: u32) -> u32 {
        if self.contract_duration_months == 0 {
            default_months.max(1)
        } else {
            self.contract_duration_months
        }
    }

    /// Returns the effective contract length with the standard default.
    #[must_use]
    pub fn contract_months(&self) -> u32 {
        self.contract_months_or(DEFAULT_CONTRACT_MONTHS)
    }

    /// Returns the display name, or the country code when none was given.
    #[must_use]
    pub fn display_country(&self) -> &str {
        self.country_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.country_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_months_defaults() {
        let request = EmploymentRequest::new("PT", Decimal::from(1000), "EUR");
        assert_eq!(request.contract_months(), 12);
        assert_eq!(request.clone().with_contract_months(0).contract_months(), 12);
        assert_eq!(request.with_contract_months(6).contract_months(), 6);
    }

    #[test]
    fn display_country_prefers_name() {
        let request = EmploymentRequest::new("PT", Decimal::from(1000), "EUR");
        assert_eq!(request.display_country(), "PT");
        assert_eq!(
            request.with_country_name("Portugal").display_country(),
            "Portugal"
        );
    }

    #[test]
    fn local_office_items_skip_empty_lines() {
        let benefits = LocalOfficeBenefits {
            currency: "EUR".to_string(),
            meal_voucher: Some(Decimal::from(150)),
            transportation: Some(Decimal::ZERO),
            wifi: Some(Decimal::new(2550, 2)),
            medical_exam: None,
            other: None,
        };
        assert_eq!(benefits.items().len(), 2);
        assert_eq!(benefits.monthly_total(), Decimal::new(17550, 2));
        assert!(benefits.matches_currency("eur"));
        assert!(!benefits.matches_currency("USD"));
    }
}
