//! # Legal Text Parsing
//!
//! Turns the prose of a country's legal-data document into structured
//! [`LegalRequirements`].
//!
//! The documents are written for people, not machines: durations appear as
//! `"30 days"` or `"2 months"`, contribution rates as `"7.3%+0.85%"` or
//! `"20%-26.8%"`, and allowances as `"~350 EUR"` or `"7.63 EUR per day"`.
//! Everything here is pattern extraction with conservative defaults; no
//! function in this module fails, and no extracted number is negative.
//!
//! # Percentage forms
//!
//! | Form     | Example          | Result          |
//! |----------|------------------|-----------------|
//! | single   | `7.3%`           | 7.3             |
//! | additive | `7.3%+0.85%`     | 8.15            |
//! | range    | `20%-26.8%`      | 23.4 (average)  |
//!
//! Every percentage is clamped to `[0, 100]`.

use crate::domain::entities::{
    Allowances, Bonuses, Contributions, LegalDocument, LegalRequirements, MandatorySalaries,
    TerminationTerms,
};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::OnceLock;

/// Days counted per month when normalizing durations.
pub const DAYS_PER_MONTH: u32 = 30;

/// Days counted per week when normalizing durations.
pub const DAYS_PER_WEEK: u32 = 7;

/// Working days per month used to monthlyize per-day allowances.
pub const WORKING_DAYS_PER_MONTH: u32 = 22;

/// Tokens that make a mention of a benefit legally binding.
pub const MANDATORY_SIGNALS: [&str; 9] = [
    "mandatory",
    "required",
    "statutory",
    "by law",
    "compulsory",
    "obligatory",
    "legally",
    "must be paid",
    "entitled",
];

/// Tokens that cancel a mandatory signal.
pub const SOFT_NEGATIVES: [&str; 12] = [
    "customary",
    "optional",
    "discretionary",
    "voluntary",
    "not mandatory",
    "not required",
    "not statutory",
    "not compulsory",
    "no legal requirement",
    "common practice",
    "at the employer's discretion",
    "may be",
];

/// Descriptions of roll-up lines left out of contribution rates.
const AGGREGATE_MARKERS: [&str; 4] = [
    "total employment cost",
    "overall",
    "total employer cost",
    "total contributions",
];

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn duration_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"(?i)(\d+(?:\.\d+)?)\s*(days?|weeks?|months?)\b")
}

fn percent_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"(\d+(?:\.\d+)?)\s*%")
}

fn percent_range_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(
        &RE,
        r"(?i)(\d+(?:\.\d+)?)\s*%?\s*(?:-|–|to)\s*(\d+(?:\.\d+)?)\s*%",
    )
}

fn amount_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"\d[\d,]*(?:\.\d+)?")
}

fn amount_range_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(
        &RE,
        r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(?:-|–|to)\s*(\d[\d,]*(?:\.\d+)?)",
    )
}

fn approximate_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"(?i)(?:~|approx\.?|approximately|around|about)\s*(\d[\d,]*(?:\.\d+)?)")
}

fn per_day_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"(?i)per\s+(?:working\s+)?day|/\s*day|\bdaily\b")
}

fn number(text: &str) -> Option<Decimal> {
    Decimal::from_str(&text.replace(',', "")).ok()
}

fn clamp_percent(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED)
}

/// Unit of a parsed duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    /// Calendar days.
    Days,
    /// Weeks.
    Weeks,
    /// Months.
    Months,
}

/// Returns the first `N days|weeks|months` occurrence in `text`.
#[must_use]
pub fn parse_duration(text: &str) -> Option<(Decimal, DurationUnit)> {
    let caps = duration_re()?.captures(text)?;
    let value = number(caps.get(1)?.as_str())?;
    let unit = caps.get(2)?.as_str().to_lowercase();
    let unit = if unit.starts_with("day") {
        DurationUnit::Days
    } else if unit.starts_with("week") {
        DurationUnit::Weeks
    } else {
        DurationUnit::Months
    };
    Some((value, unit))
}

/// Parses the first duration in `text` as a whole number of days.
///
/// Months count as 30 days and weeks as 7.
#[must_use]
pub fn parse_duration_days(text: &str) -> Option<u32> {
    let (value, unit) = parse_duration(text)?;
    let factor = match unit {
        DurationUnit::Days => 1,
        DurationUnit::Weeks => DAYS_PER_WEEK,
        DurationUnit::Months => DAYS_PER_MONTH,
    };
    value
        .checked_mul(Decimal::from(factor))?
        .round()
        .to_u32()
}

/// Parses the first duration in `text` as months of salary.
///
/// Day and week counts are converted with 30-day months.
#[must_use]
pub fn parse_duration_months(text: &str) -> Option<Decimal> {
    let (value, unit) = parse_duration(text)?;
    let months = match unit {
        DurationUnit::Months => value,
        DurationUnit::Weeks => value.checked_mul(Decimal::from(DAYS_PER_WEEK))? / Decimal::from(DAYS_PER_MONTH),
        DurationUnit::Days => value / Decimal::from(DAYS_PER_MONTH),
    };
    Some(months.round_dp(4))
}

/// Parses a percentage in single, additive or range form.
///
/// Additive forms are summed only when at least two terms carry `%`.
#[must_use]
pub fn parse_percentage(text: &str) -> Option<Decimal> {
    if let Some(caps) = percent_range_re().and_then(|re| re.captures(text)) {
        let low = caps.get(1).and_then(|m| number(m.as_str()));
        let high = caps.get(2).and_then(|m| number(m.as_str()));
        if let (Some(low), Some(high)) = (low, high) {
            let sum = low.checked_add(high)?;
            return Some(clamp_percent(sum / Decimal::TWO));
        }
    }

    let terms: Vec<Decimal> = percent_re()?
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).and_then(|m| number(m.as_str())))
        .collect();

    match terms.as_slice() {
        [] => None,
        [first, ..] if !text.contains('+') || terms.len() < 2 => Some(clamp_percent(*first)),
        _ => terms
            .iter()
            .try_fold(Decimal::ZERO, |acc, term| acc.checked_add(*term))
            .map(clamp_percent),
    }
}

/// Reads a rate field that may be a JSON number or percentage text.
#[must_use]
pub fn parse_rate(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => number(&n.to_string()).map(clamp_percent),
        Value::String(s) => parse_percentage(s).or_else(|| number(s.trim()).map(clamp_percent)),
        _ => None,
    }
}

/// Returns true if `text` carries a mandatory signal and no soft negative.
#[must_use]
pub fn has_mandatory_signal(text: &str) -> bool {
    let lower = text.to_lowercase();
    MANDATORY_SIGNALS.iter().any(|signal| lower.contains(signal))
        && !SOFT_NEGATIVES.iter().any(|negative| lower.contains(negative))
}

/// Which extra salary a classifier call is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraSalary {
    /// The 13th-month salary.
    Thirteenth,
    /// The 14th-month salary.
    Fourteenth,
}

impl ExtraSalary {
    fn mentions(self, lower: &str) -> bool {
        let tokens: &[&str] = match self {
            Self::Thirteenth => &["13th", "thirteenth", "13º", "christmas bonus", "aguinaldo"],
            Self::Fourteenth => &["14th", "fourteenth", "14º", "summer bonus"],
        };
        tokens.iter().any(|token| lower.contains(token))
    }
}

/// Classifies whether `text` makes the given extra salary mandatory.
///
/// Requires an explicit mention of the salary, a mandatory signal, and no
/// soft negative, in any order.
#[must_use]
pub fn is_mandatory_extra_salary(text: &str, which: ExtraSalary) -> bool {
    which.mentions(&text.to_lowercase()) && has_mandatory_signal(text)
}

/// Parses a monthly allowance amount from free text.
///
/// Handles approximate (`~350`), ranged (`20-50`, averaged) and per-day
/// (`× 22`) forms. Numbers followed by `%` are not amounts.
#[must_use]
pub fn parse_allowance_amount(text: &str) -> Option<Decimal> {
    let base = approximate_amount(text)
        .or_else(|| ranged_amount(text))
        .or_else(|| plain_amount(text))?;

    if per_day_re().is_some_and(|re| re.is_match(text)) {
        base.checked_mul(Decimal::from(WORKING_DAYS_PER_MONTH))
    } else {
        Some(base)
    }
}

fn followed_by_percent(text: &str, end: usize) -> bool {
    text.get(end..)
        .is_some_and(|rest| rest.trim_start().starts_with('%'))
}

fn approximate_amount(text: &str) -> Option<Decimal> {
    let caps = approximate_re()?.captures(text)?;
    let m = caps.get(1)?;
    if followed_by_percent(text, m.end()) {
        return None;
    }
    number(m.as_str())
}

fn ranged_amount(text: &str) -> Option<Decimal> {
    let caps = amount_range_re()?.captures(text)?;
    let high_match = caps.get(2)?;
    if followed_by_percent(text, high_match.end()) {
        return None;
    }
    let low = number(caps.get(1)?.as_str())?;
    let high = number(high_match.as_str())?;
    Some(low.checked_add(high)? / Decimal::TWO)
}

fn plain_amount(text: &str) -> Option<Decimal> {
    amount_re()?
        .find_iter(text)
        .filter(|m| !followed_by_percent(text, m.end()))
        .find_map(|m| number(m.as_str()))
}

/// Returns the multiplier for an extra salary: `0.5` for "half", else `1`.
#[must_use]
pub fn extra_salary_multiplier(text: &str) -> Decimal {
    let lower = text.to_lowercase();
    if lower.contains("half") || lower.contains("50%") {
        Decimal::new(5, 1)
    } else {
        Decimal::ONE
    }
}

fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

/// Renders a scalar JSON value as text, for fields that mix strings and
/// numbers.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn common_benefits(data: &Value) -> Vec<String> {
    data.get("common_benefits")
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(|line| match line {
                    Value::Object(_) => {
                        let parts: Vec<&str> = ["name", "title", "description"]
                            .iter()
                            .filter_map(|field| str_field(line, field))
                            .collect();
                        (!parts.is_empty()).then(|| parts.join(": "))
                    }
                    other => text_of(other),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Extracts structured requirements from a legal document.
#[must_use]
pub fn extract_legal_requirements(document: &LegalDocument) -> LegalRequirements {
    extract_from_data(document.data())
}

/// Extracts structured requirements from the `data` section of a legal
/// document.
#[must_use]
pub fn extract_from_data(data: &Value) -> LegalRequirements {
    let benefits = common_benefits(data);
    LegalRequirements {
        termination_costs: termination_terms(data),
        mandatory_salaries: mandatory_salaries(data, &benefits),
        bonuses: bonuses(data, &benefits),
        allowances: allowances(data, &benefits),
        contributions: contributions(data),
    }
}

fn termination_terms(data: &Value) -> TerminationTerms {
    let termination = data.get("termination").unwrap_or(&Value::Null);
    let days = |field: &str| {
        termination
            .get(field)
            .and_then(text_of)
            .and_then(|text| parse_duration_days(&text))
            .unwrap_or(0)
    };

    TerminationTerms {
        notice_period_days: days("notice_period"),
        severance_months: termination
            .get("severance_pay")
            .and_then(text_of)
            .and_then(|text| parse_duration_months(&text))
            .unwrap_or(Decimal::ZERO),
        probation_period_days: days("probation_period"),
    }
}

fn mandatory_salaries(data: &Value, benefits: &[String]) -> MandatorySalaries {
    let payroll = data.get("payroll").unwrap_or(&Value::Null);
    let cycle = payroll.get("payroll_cycle").and_then(text_of);

    let find = |field: &str, label: &str, which: ExtraSalary| -> Option<String> {
        let dedicated = payroll
            .get(field)
            .and_then(text_of)
            .map(|text| format!("{label}: {text}"));
        dedicated
            .into_iter()
            .chain(cycle.clone())
            .chain(benefits.iter().cloned())
            .find(|text| is_mandatory_extra_salary(text, which))
    };

    let thirteenth = find("13th_salary", "13th salary", ExtraSalary::Thirteenth);
    let fourteenth = find("14th_salary", "14th salary", ExtraSalary::Fourteenth);

    MandatorySalaries {
        has_13th_salary: thirteenth.is_some(),
        has_14th_salary: fourteenth.is_some(),
        monthly_multiplier_13th: thirteenth.as_deref().map(extra_salary_multiplier),
        monthly_multiplier_14th: fourteenth.as_deref().map(extra_salary_multiplier),
    }
}

fn bonuses(data: &Value, benefits: &[String]) -> Bonuses {
    let dedicated = data
        .get("leave")
        .and_then(|leave| leave.get("vacation_bonus"))
        .and_then(|value| match value {
            Value::Number(_) => parse_rate(value),
            other => text_of(other).and_then(|text| parse_percentage(&text)),
        });

    let from_benefits = || {
        benefits
            .iter()
            .filter(|line| {
                let lower = line.to_lowercase();
                lower.contains("vacation bonus")
                    || lower.contains("holiday bonus")
                    || lower.contains("holiday allowance")
            })
            .find_map(|line| parse_percentage(line))
    };

    Bonuses {
        vacation_bonus_percentage: dedicated.or_else(from_benefits),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AllowanceKind {
    Meal,
    Transportation,
    RemoteWork,
}

fn allowance_kind(line: &str) -> Option<AllowanceKind> {
    let lower = line.to_lowercase();
    if ["meal", "food", "lunch"].iter().any(|t| lower.contains(t)) {
        Some(AllowanceKind::Meal)
    } else if ["transport", "commut"].iter().any(|t| lower.contains(t)) {
        Some(AllowanceKind::Transportation)
    } else if ["remote", "home office", "internet"].iter().any(|t| lower.contains(t)) {
        Some(AllowanceKind::RemoteWork)
    } else {
        None
    }
}

fn allowances(data: &Value, benefits: &[String]) -> Allowances {
    let mut allowances = Allowances::default();

    for line in benefits {
        let Some(kind) = allowance_kind(line) else {
            continue;
        };
        let (amount, mandatory) = match kind {
            AllowanceKind::Meal => (
                &mut allowances.meal_voucher_amount,
                &mut allowances.meal_voucher_mandatory,
            ),
            AllowanceKind::Transportation => (
                &mut allowances.transportation_amount,
                &mut allowances.transportation_mandatory,
            ),
            AllowanceKind::RemoteWork => (
                &mut allowances.remote_work_amount,
                &mut allowances.remote_work_mandatory,
            ),
        };
        if amount.is_some() {
            continue;
        }
        if let Some(parsed) = parse_allowance_amount(line) {
            *amount = Some(parsed);
            *mandatory = has_mandatory_signal(line);
        }
    }

    if let Some(remote) = data.get("remote_work") {
        let description = str_field(remote, "description").unwrap_or_default();
        let amount = remote
            .get("allowance")
            .and_then(text_of)
            .and_then(|text| parse_allowance_amount(&text));
        if let Some(amount) = amount {
            allowances.remote_work_amount = Some(amount);
            allowances.remote_work_mandatory = has_mandatory_signal(description);
        }
    }

    allowances
}

fn is_aggregate(description: &str) -> bool {
    let lower = description.to_lowercase();
    AGGREGATE_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn rate_table(entries: Option<&Value>) -> BTreeMap<String, Decimal> {
    let mut rates = BTreeMap::new();
    let Some(entries) = entries.and_then(Value::as_array) else {
        return rates;
    };

    for (index, entry) in entries.iter().enumerate() {
        let description = str_field(entry, "description")
            .or_else(|| str_field(entry, "name"))
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("contribution {}", index + 1));
        if is_aggregate(&description) {
            continue;
        }
        let Some(rate) = entry.get("rate").and_then(parse_rate) else {
            continue;
        };
        let slot = rates.entry(description).or_insert(Decimal::ZERO);
        *slot = clamp_percent(slot.checked_add(rate).unwrap_or(Decimal::ONE_HUNDRED));
    }
    rates
}

fn contributions(data: &Value) -> Contributions {
    let section = data.get("contribution").unwrap_or(&Value::Null);
    Contributions {
        employer_rates: rate_table(section.get("employer_contributions")),
        employee_rates: rate_table(section.get("employee_contributions")),
    }
}
