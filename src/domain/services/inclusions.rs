//! # Provider Inclusions Extractor
//!
//! Classifies a provider quote's cost line items into the fixed
//! [`BenefitKey`] taxonomy, without any external call.
//!
//! Each line item's free-text label is matched against an ordered list of
//! keyword groups. The first group that matches wins; an item is never
//! counted under two keys. Unmatched items are dropped, except for
//! providers that fold miscellaneous employer costs into one bucket, where
//! they count as social security.
//!
//! # Confidence
//!
//! ```text
//! confidence = base(provider) + 0.04 × categories_found + 0.1 × found_mandatory
//! ```
//!
//! capped at 0.9, and 0.3 when nothing matched at all.

use crate::domain::entities::{IncludedBenefit, NormalizedQuote, StandardizedBenefitData};
use crate::domain::value_objects::money::{decimal_from_json, round_money};
use crate::domain::value_objects::{BenefitKey, Frequency, ProviderKind, Timestamp};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::OnceLock;

/// Confidence added per category found.
pub const PER_CATEGORY_CONFIDENCE: f64 = 0.04;

/// Confidence added when a mandatory category was found.
pub const MANDATORY_BONUS: f64 = 0.1;

/// Upper bound on extraction confidence.
pub const MAX_CONFIDENCE: f64 = 0.9;

/// Confidence when no line item matched.
pub const EMPTY_CONFIDENCE: f64 = 0.3;

/// Keyword groups in match order.
const KEYWORD_PATTERNS: [(BenefitKey, &str); 8] = [
    (
        BenefitKey::ThirteenthSalary,
        r"(?i)\b13th\b|thirteenth|13\s*(?:º|°|o\b)|christmas bonus|aguinaldo|d[eé]cimo\s+terceiro|tredicesima",
    ),
    (
        BenefitKey::FourteenthSalary,
        r"(?i)\b14th\b|fourteenth|14\s*(?:º|°|o\b)|summer bonus|quattordicesima",
    ),
    (
        BenefitKey::VacationBonus,
        r"(?i)vacation|holiday\s+(?:bonus|pay|allowance)|f[eé]rias|leave allowance|urlaubsgeld",
    ),
    (
        BenefitKey::Transportation,
        r"(?i)transport|commut|travel allowance|vale[\s-]?transporte",
    ),
    (
        BenefitKey::RemoteWork,
        r"(?i)remote\s*work|home\s*office|work\s+from\s+home|\bwfh\b|internet|telework",
    ),
    (
        BenefitKey::MealVouchers,
        r"(?i)\bmeal|\bfood|lunch|ticket restaurant|vale[\s-]?refei",
    ),
    (
        BenefitKey::SocialSecurity,
        r"(?i)social\s+(?:security|insurance|contribution)|pension|unemployment|payroll tax|employer contribution|national insurance|\bfgts\b|\binss\b|accident",
    ),
    (
        BenefitKey::HealthInsurance,
        r"(?i)health|medical|dental",
    ),
];

struct KeywordGroup {
    key: BenefitKey,
    pattern: Regex,
}

fn keyword_groups() -> &'static [KeywordGroup] {
    static GROUPS: OnceLock<Vec<KeywordGroup>> = OnceLock::new();
    GROUPS.get_or_init(|| {
        KEYWORD_PATTERNS
            .iter()
            .filter_map(|(key, pattern)| {
                Regex::new(pattern)
                    .ok()
                    .map(|pattern| KeywordGroup { key: *key, pattern })
            })
            .collect()
    })
}

/// Classifies a line-item label into a benefit key.
///
/// Returns the first matching keyword group, or `None`.
#[must_use]
pub fn classify_label(label: &str) -> Option<BenefitKey> {
    keyword_groups()
        .iter()
        .find(|group| group.pattern.is_match(label))
        .map(|group| group.key)
}

/// Returns the base confidence for a provider's response shape.
#[must_use]
pub const fn base_confidence(provider: ProviderKind) -> f64 {
    match provider {
        ProviderKind::Deel => 0.50,
        ProviderKind::Remote => 0.55,
        ProviderKind::Rivermate => 0.50,
        ProviderKind::Oyster => 0.45,
        ProviderKind::Rippling => 0.45,
        ProviderKind::Skuad => 0.40,
        ProviderKind::Playroll => 0.45,
    }
}

/// One cost line item read from a provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    /// Free-text label.
    pub label: String,
    /// Amount at `frequency`.
    pub amount: Decimal,
    /// Payment frequency.
    pub frequency: Frequency,
}

/// Reads the provider-specific line item array from a raw response.
///
/// Items without a label or with a non-positive amount are skipped.
#[must_use]
pub fn line_items(provider: ProviderKind, response: &Value) -> Vec<LineItem> {
    let array = match provider {
        ProviderKind::Deel => response.get("costs"),
        ProviderKind::Remote => response.get("monthly_contributions_breakdown"),
        ProviderKind::Rivermate => response.get("taxItems"),
        ProviderKind::Oyster => response.get("contributions").and_then(|c| c.get("items")),
        ProviderKind::Rippling => response.get("employer_taxes"),
        ProviderKind::Skuad => response.get("breakdown"),
        ProviderKind::Playroll => response.get("employer_contributions"),
    };

    array
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_line_item).collect())
        .unwrap_or_default()
}

fn parse_line_item(item: &Value) -> Option<LineItem> {
    let label = ["name", "label", "description", "title"]
        .iter()
        .filter_map(|field| item.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())?
        .to_string();
    let amount = ["amount", "monthly_amount", "value"]
        .iter()
        .find_map(|field| item.get(*field).and_then(decimal_from_json))?;
    if amount <= Decimal::ZERO {
        return None;
    }
    let frequency = ["frequency", "period"]
        .iter()
        .find_map(|field| item.get(*field).and_then(Value::as_str))
        .map(Frequency::from_label)
        .unwrap_or_default();

    Some(LineItem {
        label,
        amount,
        frequency,
    })
}

/// Stateless extractor of provider inclusions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderInclusionsExtractor;

impl ProviderInclusionsExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extracts what `quote` already includes, stamped with the current time.
    #[must_use]
    pub fn extract(&self, provider: ProviderKind, quote: &NormalizedQuote) -> StandardizedBenefitData {
        self.extract_at(provider, quote, Timestamp::now())
    }

    /// Extracts what `quote` already includes, stamped with `extracted_at`.
    ///
    /// Pure: identical inputs give identical output.
    #[must_use]
    pub fn extract_at(
        &self,
        provider: ProviderKind,
        quote: &NormalizedQuote,
        extracted_at: Timestamp,
    ) -> StandardizedBenefitData {
        let mut included: BTreeMap<BenefitKey, IncludedBenefit> = BTreeMap::new();

        for item in line_items(provider, quote.original_response()) {
            let key = match classify_label(&item.label) {
                Some(key) => key,
                None if provider.folds_misc_employer_costs() => BenefitKey::SocialSecurity,
                None => continue,
            };

            match included.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(IncludedBenefit {
                        amount: item.amount,
                        frequency: item.frequency,
                        description: item.label,
                    });
                }
                Entry::Occupied(mut slot) => {
                    let existing = slot.get_mut();
                    let monthly = existing.monthly_amount() + item.frequency.to_monthly(item.amount);
                    existing.amount = monthly;
                    existing.frequency = Frequency::Monthly;
                }
            }
        }

        let total_monthly_benefits = round_money(
            included
                .values()
                .map(IncludedBenefit::monthly_amount)
                .sum(),
        );
        let extraction_confidence = confidence_for(provider, &included);

        StandardizedBenefitData {
            provider,
            base_salary: quote.base_cost(),
            currency: quote.currency().to_string(),
            country: quote.country().to_string(),
            monthly_total: quote.monthly_total(),
            included_benefits: included,
            total_monthly_benefits,
            extraction_confidence,
            extracted_at,
        }
    }
}

fn confidence_for(provider: ProviderKind, included: &BTreeMap<BenefitKey, IncludedBenefit>) -> f64 {
    if included.is_empty() {
        return EMPTY_CONFIDENCE;
    }
    let found_mandatory = included.keys().any(|key| key.is_mandatory_category());
    let mut confidence =
        base_confidence(provider) + PER_CATEGORY_CONFIDENCE * included.len() as f64;
    if found_mandatory {
        confidence += MANDATORY_BONUS;
    }
    confidence.min(MAX_CONFIDENCE)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::services::QuoteNormalizer;
    use serde_json::json;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    mod classification {
        use super::*;

        #[test]
        fn first_group_wins() {
            assert_eq!(classify_label("13th month salary"), Some(BenefitKey::ThirteenthSalary));
            assert_eq!(classify_label("Christmas bonus"), Some(BenefitKey::ThirteenthSalary));
            assert_eq!(classify_label("14th salary"), Some(BenefitKey::FourteenthSalary));
            assert_eq!(classify_label("Holiday pay"), Some(BenefitKey::VacationBonus));
            assert_eq!(classify_label("Commuting allowance"), Some(BenefitKey::Transportation));
            assert_eq!(classify_label("Home office stipend"), Some(BenefitKey::RemoteWork));
            assert_eq!(classify_label("Meal vouchers"), Some(BenefitKey::MealVouchers));
            assert_eq!(
                classify_label("Employer social security"),
                Some(BenefitKey::SocialSecurity)
            );
            assert_eq!(classify_label("Private health plan"), Some(BenefitKey::HealthInsurance));
        }

        #[test]
        fn no_multi_labeling() {
            // "vacation" comes before "transport" in match order.
            assert_eq!(
                classify_label("Vacation transport subsidy"),
                Some(BenefitKey::VacationBonus)
            );
        }

        #[test]
        fn unknown_label() {
            assert_eq!(classify_label("Equipment rental"), None);
        }
    }

    fn quote(provider: ProviderKind, raw: serde_json::Value) -> NormalizedQuote {
        QuoteNormalizer::new().normalize(provider, &raw)
    }

    #[test]
    fn deel_items_are_classified_and_monthlyized() {
        let q = quote(
            ProviderKind::Deel,
            json!({
                "salary": "1,200", "currency": "EUR", "country": "Portugal", "total_costs": "1,700",
                "costs": [
                    {"name": "13th month salary", "amount": "1,200", "frequency": "yearly"},
                    {"name": "Social Security", "amount": "285"},
                    {"name": "Equipment", "amount": "40"}
                ]
            }),
        );
        let data = ProviderInclusionsExtractor::new().extract(ProviderKind::Deel, &q);

        assert_eq!(data.included_benefits.len(), 2);
        assert_eq!(data.covered_monthly(BenefitKey::ThirteenthSalary), Decimal::from(100));
        assert_eq!(data.covered_monthly(BenefitKey::SocialSecurity), Decimal::from(285));
        assert_eq!(data.total_monthly_benefits, Decimal::from(385));
        // 0.50 + 2 * 0.04 + 0.1
        assert!(close(data.extraction_confidence, 0.68));
    }

    #[test]
    fn folding_providers_bucket_unmatched_items() {
        let q = quote(
            ProviderKind::Oyster,
            json!({
                "country": "Spain", "currency": "EUR", "salary": 3000, "total_cost": 4000,
                "contributions": {"total": 900, "items": [
                    {"name": "FOGASA", "amount": 6},
                    {"name": "Training levy", "amount": 3}
                ]}
            }),
        );
        let data = ProviderInclusionsExtractor::new().extract(ProviderKind::Oyster, &q);

        assert_eq!(data.found_keys(), vec![BenefitKey::SocialSecurity]);
        assert_eq!(data.covered_monthly(BenefitKey::SocialSecurity), Decimal::from(9));
        assert_eq!(data.included_benefits[&BenefitKey::SocialSecurity].description, "FOGASA");
    }

    #[test]
    fn non_folding_providers_drop_unmatched_items() {
        let q = quote(
            ProviderKind::Rivermate,
            json!({
                "country": "Spain", "currency": "EUR", "salary": 3000, "total_monthly_cost": 4000,
                "taxItems": [{"name": "FOGASA", "amount": 6}]
            }),
        );
        let data = ProviderInclusionsExtractor::new().extract(ProviderKind::Rivermate, &q);
        assert!(data.included_benefits.is_empty());
        assert!(close(data.extraction_confidence, EMPTY_CONFIDENCE));
    }

    #[test]
    fn confidence_is_capped() {
        let q = quote(
            ProviderKind::Remote,
            json!({
                "country": "Portugal", "currency": "EUR", "gross_monthly_salary": 1000, "total_monthly_cost": 1500,
                "monthly_contributions_breakdown": [
                    {"name": "13th salary", "amount": 83},
                    {"name": "14th salary", "amount": 83},
                    {"name": "Vacation bonus", "amount": 20},
                    {"name": "Transport", "amount": 20},
                    {"name": "Meal card", "amount": 100},
                    {"name": "Social security", "amount": 237},
                    {"name": "Health insurance", "amount": 30}
                ]
            }),
        );
        let data = ProviderInclusionsExtractor::new().extract(ProviderKind::Remote, &q);
        assert_eq!(data.included_benefits.len(), 7);
        assert!(close(data.extraction_confidence, MAX_CONFIDENCE));
    }

    #[test]
    fn same_key_amounts_are_summed() {
        let q = quote(
            ProviderKind::Playroll,
            json!({
                "country": "Italy", "currency": "EUR", "salary": 2400, "total_employment_cost": 3600,
                "employer_contributions": [
                    {"name": "INPS pension", "amount": 700},
                    {"name": "INAIL accident insurance", "amount": 1200, "frequency": "annual"}
                ]
            }),
        );
        let data = ProviderInclusionsExtractor::new().extract(ProviderKind::Playroll, &q);
        let benefit = &data.included_benefits[&BenefitKey::SocialSecurity];
        assert_eq!(benefit.monthly_amount(), Decimal::from(800));
        assert_eq!(benefit.description, "INPS pension");
    }

    #[test]
    fn extraction_is_idempotent() {
        let q = quote(
            ProviderKind::Skuad,
            json!({
                "country": "Brazil", "currency": "BRL", "gross_salary": "10,000", "total_cost": "15,000",
                "breakdown": [{"description": "FGTS", "amount": "800"}, {"description": "13th salary provision", "amount": "833.33"}]
            }),
        );
        let at = Timestamp::from_millis(1_700_000_000_000).unwrap();
        let extractor = ProviderInclusionsExtractor::new();
        assert_eq!(
            extractor.extract_at(ProviderKind::Skuad, &q, at),
            extractor.extract_at(ProviderKind::Skuad, &q, at)
        );
    }
}
