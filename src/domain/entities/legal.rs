//! # Legal Entities
//!
//! Structured statutory requirements for a country, the cached
//! [`LegalProfile`] built from them, and the [`LegalBaseline`] of monthly
//! legal costs for a concrete salary.
//!
//! # Invariants
//!
//! - Every numeric field in [`LegalRequirements`] is non-negative
//! - Percentages are on a 0–100 scale

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{EmploymentType, EnhancementKind, QuoteType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Termination-related durations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminationTerms {
    /// Statutory notice period in days.
    pub notice_period_days: u32,
    /// Statutory severance in months of salary.
    pub severance_months: Decimal,
    /// Probation period in days.
    pub probation_period_days: u32,
}

/// Mandatory extra salary payments.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MandatorySalaries {
    /// A 13th-month salary is mandatory.
    pub has_13th_salary: bool,
    /// A 14th-month salary is mandatory.
    pub has_14th_salary: bool,
    /// Months of salary paid as the 13th salary.
    #[serde(default)]
    pub monthly_multiplier_13th: Option<Decimal>,
    /// Months of salary paid as the 14th salary.
    #[serde(default)]
    pub monthly_multiplier_14th: Option<Decimal>,
}

/// Statutory bonuses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bonuses {
    /// Vacation bonus as a percentage of annual salary.
    #[serde(default)]
    pub vacation_bonus_percentage: Option<Decimal>,
}

/// Legally defined allowances.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allowances {
    /// Monthly meal voucher amount.
    #[serde(default)]
    pub meal_voucher_amount: Option<Decimal>,
    /// Monthly transportation amount.
    #[serde(default)]
    pub transportation_amount: Option<Decimal>,
    /// Monthly remote-work amount.
    #[serde(default)]
    pub remote_work_amount: Option<Decimal>,
    /// Meal vouchers are mandatory.
    #[serde(default)]
    pub meal_voucher_mandatory: bool,
    /// Transportation allowance is mandatory.
    #[serde(default)]
    pub transportation_mandatory: bool,
    /// Remote-work allowance is mandatory.
    #[serde(default)]
    pub remote_work_mandatory: bool,
}

impl Allowances {
    /// Returns `(amount, mandatory)` for an allowance-type enhancement kind.
    #[must_use]
    pub fn for_kind(&self, kind: EnhancementKind) -> Option<(Decimal, bool)> {
        match kind {
            EnhancementKind::MealVouchers => self
                .meal_voucher_amount
                .map(|a| (a, self.meal_voucher_mandatory)),
            EnhancementKind::TransportationAllowance => self
                .transportation_amount
                .map(|a| (a, self.transportation_mandatory)),
            EnhancementKind::RemoteWorkAllowance => self
                .remote_work_amount
                .map(|a| (a, self.remote_work_mandatory)),
            _ => None,
        }
    }
}

/// Contribution rates keyed by their description.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributions {
    /// Employer contribution rates (percent).
    pub employer_rates: BTreeMap<String, Decimal>,
    /// Employee contribution rates (percent).
    pub employee_rates: BTreeMap<String, Decimal>,
}

impl Contributions {
    /// Returns the sum of all employer rates.
    #[must_use]
    pub fn total_employer_rate(&self) -> Decimal {
        self.employer_rates.values().copied().sum()
    }

    /// Returns the sum of all employee rates.
    #[must_use]
    pub fn total_employee_rate(&self) -> Decimal {
        self.employee_rates.values().copied().sum()
    }
}

/// Structured statutory requirements extracted from a legal document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalRequirements {
    /// Termination terms.
    pub termination_costs: TerminationTerms,
    /// Mandatory extra salaries.
    pub mandatory_salaries: MandatorySalaries,
    /// Statutory bonuses.
    pub bonuses: Bonuses,
    /// Allowances.
    pub allowances: Allowances,
    /// Contribution rates.
    pub contributions: Contributions,
}

impl LegalRequirements {
    /// Returns true if every numeric field is non-negative and every
    /// percentage lies in `[0, 100]`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let pct_ok = |p: &Decimal| *p >= Decimal::ZERO && *p <= Decimal::ONE_HUNDRED;
        let amount_ok = |a: &Option<Decimal>| a.is_none_or(|v| v >= Decimal::ZERO);

        self.termination_costs.severance_months >= Decimal::ZERO
            && self
                .mandatory_salaries
                .monthly_multiplier_13th
                .is_none_or(|m| m >= Decimal::ZERO)
            && self
                .mandatory_salaries
                .monthly_multiplier_14th
                .is_none_or(|m| m >= Decimal::ZERO)
            && self.bonuses.vacation_bonus_percentage.as_ref().is_none_or(pct_ok)
            && amount_ok(&self.allowances.meal_voucher_amount)
            && amount_ok(&self.allowances.transportation_amount)
            && amount_ok(&self.allowances.remote_work_amount)
            && self.contributions.employer_rates.values().all(pct_ok)
            && self.contributions.employee_rates.values().all(pct_ok)
    }

    /// Returns true if the document mentions any termination terms at all.
    #[must_use]
    pub fn has_termination_terms(&self) -> bool {
        self.termination_costs.severance_months > Decimal::ZERO
            || self.termination_costs.probation_period_days > 0
    }
}

/// A country's legal-data document as read from the data source.
///
/// The payload is either wrapped as `{ "results": [{ "data": { .. } }] }` or
/// is the `data` object itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalDocument {
    country_code: String,
    raw: Value,
}

impl LegalDocument {
    /// Wraps a raw document for `country_code`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidLegalDocument` if the payload is not a
    /// JSON object or carries an empty `results` array.
    pub fn new(country_code: impl Into<String>, raw: Value) -> DomainResult<Self> {
        let country_code = country_code.into();
        if !raw.is_object() {
            return Err(DomainError::invalid_legal_document(format!(
                "{country_code}: document is not a JSON object"
            )));
        }
        if raw
            .get("results")
            .and_then(Value::as_array)
            .is_some_and(Vec::is_empty)
        {
            return Err(DomainError::invalid_legal_document(format!(
                "{country_code}: document has no results"
            )));
        }
        Ok(Self { country_code, raw })
    }

    /// Returns the canonical country code.
    #[inline]
    #[must_use]
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Returns the untouched payload.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Returns the `data` section.
    #[must_use]
    pub fn data(&self) -> &Value {
        self.raw
            .get("results")
            .and_then(|results| results.get(0))
            .and_then(|first| first.get("data"))
            .unwrap_or(&self.raw)
    }

    /// Returns the country name recorded in the document, if any.
    #[must_use]
    pub fn country_name(&self) -> Option<&str> {
        [self.data(), &self.raw]
            .into_iter()
            .find_map(|v| v.get("country_name").and_then(Value::as_str))
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Cache key for legal profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalProfileKey {
    /// Canonical ISO country code.
    pub country_code: String,
    /// Employment type.
    pub employment_type: EmploymentType,
    /// Contract length in months.
    pub contract_months: u32,
    /// Enhancement mode.
    pub quote_type: QuoteType,
}

impl fmt::Display for LegalProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.country_code, self.employment_type, self.contract_months, self.quote_type
        )
    }
}

/// Per-country summary of mandatory costs and benefit rules.
///
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalProfile {
    /// Content hash of the profile inputs.
    pub id: String,
    /// Canonical ISO country code.
    pub country_code: String,
    /// Country display name.
    pub country_name: String,
    /// Enhancement mode the profile was built for.
    pub quote_type: QuoteType,
    /// Employment type the profile was built for.
    pub employment_type: EmploymentType,
    /// Contract length the profile was built for.
    pub contract_months: u32,
    /// Structured requirements.
    pub requirements: LegalRequirements,
    /// Readable summary of the requirements.
    pub summary: String,
    /// Deterministic formulas with the country's numbers substituted.
    pub formulas: String,
}

impl LegalProfile {
    /// Returns the cache key this profile was built for.
    #[must_use]
    pub fn key(&self) -> LegalProfileKey {
        LegalProfileKey {
            country_code: self.country_code.clone(),
            employment_type: self.employment_type,
            contract_months: self.contract_months,
            quote_type: self.quote_type,
        }
    }
}

/// Where a legal baseline came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineSource {
    /// Computed by the external reasoning service.
    Reasoning,
    /// Computed locally from closed-form formulas.
    Deterministic,
}

impl fmt::Display for BaselineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reasoning => write!(f, "reasoning"),
            Self::Deterministic => write!(f, "deterministic"),
        }
    }
}

/// One legally required monthly cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineItem {
    /// Required monthly amount, rounded to two decimals.
    pub monthly_amount: Decimal,
    /// Whether the law makes this item unavoidable.
    pub mandatory: bool,
    /// How the amount was obtained.
    pub explanation: String,
    /// Confidence in the amount, in `[0, 1]`.
    pub confidence: f64,
}

/// Monthly legal costs for one salary in one country, independent of any
/// provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalBaseline {
    /// Required items by kind.
    pub items: BTreeMap<EnhancementKind, BaselineItem>,
    /// Origin of the baseline.
    pub source: BaselineSource,
    /// Currency of every amount.
    pub currency: String,
    /// Monthly base salary the baseline was computed for.
    pub base_salary: Decimal,
    /// Contract length the baseline was computed for.
    pub contract_months: u32,
    /// Enhancement mode the baseline was computed for.
    pub quote_type: QuoteType,
    /// Data-quality notices raised while computing.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl LegalBaseline {
    /// Returns the required monthly amount for `kind`, or zero.
    #[must_use]
    pub fn required_monthly(&self, kind: EnhancementKind) -> Decimal {
        self.items
            .get(&kind)
            .map(|item| item.monthly_amount)
            .unwrap_or(Decimal::ZERO)
    }

    /// Returns the sum of all item amounts.
    #[must_use]
    pub fn total_monthly(&self) -> Decimal {
        self.items.values().map(|item| item.monthly_amount).sum()
    }
}
