//! # Deterministic Calculator
//!
//! Closed-form monthly costs from [`LegalRequirements`], with no external
//! call. This is the fallback whenever the reasoning service is not
//! configured or keeps failing.
//!
//! # Formulas
//!
//! All amounts are monthly and rounded half-up to two decimals.
//!
//! ```text
//! thirteenth_salary      = base_salary × multiplier / 12        (if mandatory)
//! fourteenth_salary      = base_salary × multiplier / 12        (if mandatory)
//! vacation_bonus         = base_salary × (vacation_pct / 100) / 12
//! severance              = severance_months × base_salary / contract_months
//! probation              = (probation_days / 30) × base_salary / contract_months
//! allowance              = legal amount        (all-inclusive, or if mandatory)
//! employer_contributions = base_salary × (Σ rates / 100)
//! ```
//!
//! When the document yields no positive severance or probation figure, the
//! configured [`TerminationFallback`] substitutes a flat number of months'
//! salary as severance, at a lower confidence.
//!
//! # Deltas
//!
//! ```text
//! delta(kind) = max(0, required(kind) − provider_covered(kind))
//! ```

use crate::domain::entities::{
    BaselineItem, BaselineSource, EnhancementRecord, EnhancementSource, LegalBaseline,
    LegalRequirements, OverlapAnalysis, StandardizedBenefitData,
};
use crate::domain::value_objects::money::{percent_of, round_money, spread_over, MONTHS_PER_YEAR};
use crate::domain::value_objects::{EnhancementKind, QuoteType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::legal_parsing::DAYS_PER_MONTH;

/// Confidence of amounts computed from parsed legal values.
pub const DETERMINISTIC_CONFIDENCE: f64 = 0.8;

/// Policy for the flat severance substitute used when termination terms
/// cannot be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationFallback {
    /// Whether the substitute is applied at all.
    pub enabled: bool,
    /// Months of salary assumed as total severance exposure.
    pub severance_months: Decimal,
    /// Confidence attached to the substituted record.
    pub confidence: f64,
}

impl Default for TerminationFallback {
    fn default() -> Self {
        Self {
            enabled: true,
            severance_months: Decimal::from(3),
            confidence: 0.4,
        }
    }
}

impl TerminationFallback {
    /// A policy that never substitutes.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Inputs to a baseline calculation.
#[derive(Debug, Clone, Copy)]
pub struct BaselineInput<'a> {
    /// Structured requirements for the country.
    pub requirements: &'a LegalRequirements,
    /// Monthly gross salary.
    pub base_salary: Decimal,
    /// Currency of `base_salary`.
    pub currency: &'a str,
    /// Contract length in months (at least 1).
    pub contract_months: u32,
    /// Enhancement mode.
    pub quote_type: QuoteType,
}

/// Closed-form calculator for legal baselines and deltas.
#[derive(Debug, Clone, Default)]
pub struct DeterministicCalculator {
    fallback: TerminationFallback,
}

impl DeterministicCalculator {
    /// Creates a calculator with the given termination fallback policy.
    #[must_use]
    pub fn new(fallback: TerminationFallback) -> Self {
        Self { fallback }
    }

    /// Returns the termination fallback policy.
    #[must_use]
    pub fn fallback(&self) -> &TerminationFallback {
        &self.fallback
    }

    /// Computes the monthly legal baseline for one salary.
    ///
    /// Statutory-only baselines carry no termination items and no optional
    /// allowances.
    #[must_use]
    pub fn baseline(&self, input: BaselineInput<'_>) -> LegalBaseline {
        let BaselineInput {
            requirements,
            base_salary,
            currency,
            contract_months,
            quote_type,
        } = input;
        let months = Decimal::from(contract_months.max(1));
        let mut items = BTreeMap::new();
        let mut warnings = Vec::new();

        let salaries = &requirements.mandatory_salaries;
        for (kind, has, multiplier) in [
            (
                EnhancementKind::ThirteenthSalary,
                salaries.has_13th_salary,
                salaries.monthly_multiplier_13th,
            ),
            (
                EnhancementKind::FourteenthSalary,
                salaries.has_14th_salary,
                salaries.monthly_multiplier_14th,
            ),
        ] {
            if !has {
                continue;
            }
            let multiplier = multiplier.unwrap_or(Decimal::ONE);
            let amount = round_money(base_salary * multiplier / MONTHS_PER_YEAR);
            items.insert(
                kind,
                item(
                    amount,
                    true,
                    format!(
                        "{}: {} × {} / 12 = {} {}/month",
                        kind.label(),
                        base_salary,
                        multiplier,
                        amount,
                        currency
                    ),
                ),
            );
        }

        if let Some(pct) = requirements
            .bonuses
            .vacation_bonus_percentage
            .filter(|p| *p > Decimal::ZERO)
        {
            let amount = round_money(percent_of(base_salary, pct) / MONTHS_PER_YEAR);
            items.insert(
                EnhancementKind::VacationBonus,
                item(
                    amount,
                    true,
                    format!(
                        "Vacation bonus: {} × {}% / 12 = {} {}/month",
                        base_salary, pct, amount, currency
                    ),
                ),
            );
        }

        for kind in [
            EnhancementKind::MealVouchers,
            EnhancementKind::TransportationAllowance,
            EnhancementKind::RemoteWorkAllowance,
        ] {
            let Some((amount, mandatory)) = requirements.allowances.for_kind(kind) else {
                continue;
            };
            if amount <= Decimal::ZERO || (quote_type.is_statutory_only() && !mandatory) {
                continue;
            }
            let amount = round_money(amount);
            let status = if mandatory { "mandatory" } else { "customary" };
            items.insert(
                kind,
                item(
                    amount,
                    mandatory,
                    format!("{} ({}): {} {}/month", kind.label(), status, amount, currency),
                ),
            );
        }

        let employer_rate = requirements.contributions.total_employer_rate();
        if employer_rate > Decimal::ZERO {
            let amount = round_money(percent_of(base_salary, employer_rate));
            items.insert(
                EnhancementKind::EmployerContributions,
                item(
                    amount,
                    true,
                    format!(
                        "Employer contributions: {} × {}% = {} {}/month",
                        base_salary, employer_rate, amount, currency
                    ),
                ),
            );
        }

        if !quote_type.is_statutory_only() {
            self.termination_items(input, months, &mut items, &mut warnings);
        }

        LegalBaseline {
            items,
            source: BaselineSource::Deterministic,
            currency: currency.to_string(),
            base_salary,
            contract_months: contract_months.max(1),
            quote_type,
            warnings,
        }
    }

    fn termination_items(
        &self,
        input: BaselineInput<'_>,
        months: Decimal,
        items: &mut BTreeMap<EnhancementKind, BaselineItem>,
        warnings: &mut Vec<String>,
    ) {
        let terms = &input.requirements.termination_costs;
        let base_salary = input.base_salary;
        let currency = input.currency;

        let severance = round_money(spread_over(terms.severance_months * base_salary, months));
        if severance > Decimal::ZERO {
            items.insert(
                EnhancementKind::SeveranceProvision,
                item(
                    severance,
                    true,
                    format!(
                        "Severance: {} months × {} / {} = {} {}/month",
                        terms.severance_months, base_salary, months, severance, currency
                    ),
                ),
            );
        }

        let probation_months =
            Decimal::from(terms.probation_period_days) / Decimal::from(DAYS_PER_MONTH);
        let probation = round_money(spread_over(probation_months * base_salary, months));
        if probation > Decimal::ZERO {
            items.insert(
                EnhancementKind::ProbationProvision,
                item(
                    probation,
                    true,
                    format!(
                        "Probation: ({} days / 30) × {} / {} = {} {}/month",
                        terms.probation_period_days, base_salary, months, probation, currency
                    ),
                ),
            );
        }

        if severance.is_zero() && probation.is_zero() && self.fallback.enabled {
            let amount = round_money(spread_over(
                self.fallback.severance_months * base_salary,
                months,
            ));
            if amount > Decimal::ZERO {
                items.insert(
                    EnhancementKind::SeveranceProvision,
                    BaselineItem {
                        monthly_amount: amount,
                        mandatory: true,
                        explanation: format!(
                            "Severance (estimated): {} months × {} / {} = {} {}/month; termination terms could not be read",
                            self.fallback.severance_months, base_salary, months, amount, currency
                        ),
                        confidence: self.fallback.confidence,
                    },
                );
                warnings.push(format!(
                    "termination terms unreadable; assumed {} months' salary severance",
                    self.fallback.severance_months
                ));
            }
        }
    }

    /// Computes per-kind deltas between a baseline and provider inclusions.
    ///
    /// Kinds fully covered by the provider yield an `is_already_included`
    /// record; the rest carry `max(0, required − covered)`.
    #[must_use]
    pub fn deltas(
        &self,
        baseline: &LegalBaseline,
        inclusions: &StandardizedBenefitData,
    ) -> BTreeMap<EnhancementKind, EnhancementRecord> {
        let source = match baseline.source {
            BaselineSource::Reasoning => EnhancementSource::Reasoning,
            BaselineSource::Deterministic => EnhancementSource::Deterministic,
        };

        baseline
            .items
            .iter()
            .filter(|(_, item)| item.monthly_amount > Decimal::ZERO)
            .map(|(kind, item)| {
                let required = item.monthly_amount;
                let covered = covered_monthly(*kind, inclusions);
                let delta = round_money((required - covered).max(Decimal::ZERO));

                let record = if delta.is_zero() {
                    EnhancementRecord::already_included(
                        *kind,
                        format!(
                            "{} already included by {} ({} covers required {})",
                            kind.label(),
                            inclusions.provider,
                            round_money(covered),
                            required
                        ),
                        item.confidence,
                        source,
                    )
                } else if covered > Decimal::ZERO {
                    EnhancementRecord::missing(
                        *kind,
                        delta,
                        format!(
                            "{} partially covered: required {}, provider covers {}, missing {}",
                            kind.label(),
                            required,
                            round_money(covered),
                            delta
                        ),
                        item.confidence,
                        source,
                    )
                } else {
                    EnhancementRecord::missing(*kind, delta, item.explanation.clone(), item.confidence, source)
                };
                (*kind, record.mandatory(item.mandatory))
            })
            .collect()
    }

    /// Derives an overlap analysis without the reasoning service.
    #[must_use]
    pub fn overlap_analysis(
        &self,
        baseline: &LegalBaseline,
        inclusions: &StandardizedBenefitData,
        records: &BTreeMap<EnhancementKind, EnhancementRecord>,
    ) -> OverlapAnalysis {
        let provider_coverage = inclusions
            .found_keys()
            .into_iter()
            .map(|key| key.as_str().to_string())
            .collect();

        let missing_requirements = records
            .values()
            .filter(|record| record.is_mandatory && record.contribution() > Decimal::ZERO)
            .map(|record| record.kind.as_str().to_string())
            .collect();

        let double_counting_risks = baseline
            .items
            .iter()
            .filter(|(kind, item)| {
                let covered = covered_monthly(**kind, inclusions);
                covered > Decimal::ZERO && covered < item.monthly_amount
            })
            .map(|(kind, _)| kind.as_str().to_string())
            .collect();

        OverlapAnalysis {
            provider_coverage,
            missing_requirements,
            double_counting_risks,
        }
    }

    /// Renders the formulas with the country's numbers substituted.
    #[must_use]
    pub fn formulas(
        &self,
        requirements: &LegalRequirements,
        contract_months: u32,
        quote_type: QuoteType,
    ) -> String {
        let mut lines = Vec::new();
        let salaries = &requirements.mandatory_salaries;
        if salaries.has_13th_salary {
            lines.push(format!(
                "thirteenth_salary_monthly = base_salary × {} / 12",
                salaries.monthly_multiplier_13th.unwrap_or(Decimal::ONE)
            ));
        }
        if salaries.has_14th_salary {
            lines.push(format!(
                "fourteenth_salary_monthly = base_salary × {} / 12",
                salaries.monthly_multiplier_14th.unwrap_or(Decimal::ONE)
            ));
        }
        if let Some(pct) = requirements.bonuses.vacation_bonus_percentage {
            lines.push(format!("vacation_bonus_monthly = base_salary × {pct}% / 12"));
        }
        let employer_rate = requirements.contributions.total_employer_rate();
        if employer_rate > Decimal::ZERO {
            lines.push(format!(
                "employer_contributions_monthly = base_salary × {employer_rate}%"
            ));
        }
        for kind in [
            EnhancementKind::MealVouchers,
            EnhancementKind::TransportationAllowance,
            EnhancementKind::RemoteWorkAllowance,
        ] {
            if let Some((amount, mandatory)) = requirements.allowances.for_kind(kind) {
                if quote_type.is_statutory_only() && !mandatory {
                    continue;
                }
                lines.push(format!("{}_monthly = {}", kind.reasoning_key(), amount));
            }
        }
        if !quote_type.is_statutory_only() {
            let terms = &requirements.termination_costs;
            lines.push(format!(
                "severance_monthly = {} × base_salary / {}",
                terms.severance_months, contract_months
            ));
            lines.push(format!(
                "probation_monthly = ({} / 30) × base_salary / {}",
                terms.probation_period_days, contract_months
            ));
        }
        lines.join("\n")
    }
}

fn item(monthly_amount: Decimal, mandatory: bool, explanation: String) -> BaselineItem {
    BaselineItem {
        monthly_amount,
        mandatory,
        explanation,
        confidence: DETERMINISTIC_CONFIDENCE,
    }
}

fn covered_monthly(kind: EnhancementKind, inclusions: &StandardizedBenefitData) -> Decimal {
    kind.covered_by()
        .map(|key| inclusions.covered_monthly(key))
        .unwrap_or(Decimal::ZERO)
}
