//! # Quote Normalizer
//!
//! Maps each provider's quote layout onto [`NormalizedQuote`].
//!
//! There is exactly one mapping per [`ProviderKind`]; the branch is chosen by
//! the provider kind the caller names, never by inspecting the payload.
//! Deel and Skuad report money as formatted strings (`"5,000.00"`), the
//! others as JSON numbers. Missing or unparsable values become zero.
//!
//! | Provider  | Salary                 | Total                    | Breakdown fields                                   |
//! |-----------|------------------------|--------------------------|----------------------------------------------------|
//! | deel      | `salary`               | `total_costs`            | `deel_fee`, `employer_costs`                       |
//! | remote    | `gross_monthly_salary` | `total_monthly_cost`     | `monthly_contributions`, `monthly_benefits`, `fee` |
//! | rivermate | `salary`               | `total_monthly_cost`     | `management_fee`, `employer_taxes_total`           |
//! | oyster    | `salary`               | `total_cost`             | `contributions.total`, `fee`                       |
//! | rippling  | `base_salary`          | `total_monthly_cost`     | `platform_fee`, `employer_taxes_total`             |
//! | skuad     | `gross_salary`         | `total_cost`             | `platform_fee`, `employer_contributions`           |
//! | playroll  | `salary`               | `total_employment_cost`  | `fee`, `employer_contributions_total`, `accruals`  |
//!
//! # Examples
//!
//! ```
//! use eor_quote_engine::domain::services::QuoteNormalizer;
//! use eor_quote_engine::domain::value_objects::ProviderKind;
//! use rust_decimal::Decimal;
//! use serde_json::json;
//!
//! let raw = json!({
//!     "salary": "EUR 5,000.00",
//!     "currency": "EUR",
//!     "country": "Portugal",
//!     "total_costs": "6,400.00",
//!     "deel_fee": "599"
//! });
//! let quote = QuoteNormalizer::new().normalize(ProviderKind::Deel, &raw);
//! assert_eq!(quote.monthly_total(), Decimal::from(6400));
//! assert_eq!(quote.breakdown()["platformFee"], Decimal::from(599));
//! ```

use crate::domain::entities::NormalizedQuote;
use crate::domain::errors::DomainResult;
use crate::domain::value_objects::ProviderKind;
use crate::domain::value_objects::money::{decimal_from_json, parse_money_str};
use rust_decimal::Decimal;
use serde_json::Value;

/// Breakdown category for the provider's own fee.
pub const PLATFORM_FEE: &str = "platformFee";
/// Breakdown category for a management fee.
pub const MANAGEMENT_FEE: &str = "managementFee";
/// Breakdown category for statutory employer contributions.
pub const EMPLOYER_CONTRIBUTIONS: &str = "employerContributions";
/// Breakdown category for provider-bundled benefits.
pub const BENEFITS: &str = "benefits";
/// Breakdown category for accrued provisions.
pub const ACCRUALS: &str = "accruals";

/// Stateless normalizer with one branch per provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteNormalizer;

impl QuoteNormalizer {
    /// Creates a normalizer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Normalizes a raw quote for a known provider.
    ///
    /// Never fails; the result may still be invalid (see
    /// [`NormalizedQuote::validate`]).
    #[must_use]
    pub fn normalize(&self, provider: ProviderKind, raw: &Value) -> NormalizedQuote {
        let quote = match provider {
            ProviderKind::Deel => Self::deel(raw),
            ProviderKind::Remote => Self::remote(raw),
            ProviderKind::Rivermate => Self::rivermate(raw),
            ProviderKind::Oyster => Self::oyster(raw),
            ProviderKind::Rippling => Self::rippling(raw),
            ProviderKind::Skuad => Self::skuad(raw),
            ProviderKind::Playroll => Self::playroll(raw),
        };
        quote.with_original_response(raw.clone())
    }

    /// Normalizes a raw quote for a provider given by name.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnsupportedProvider` if `provider` names no
    /// known provider.
    pub fn normalize_named(&self, provider: &str, raw: &Value) -> DomainResult<NormalizedQuote> {
        let kind: ProviderKind = provider.parse()?;
        Ok(self.normalize(kind, raw))
    }

    fn deel(raw: &Value) -> NormalizedQuote {
        NormalizedQuote::new(
            ProviderKind::Deel,
            string_money(raw, "salary"),
            text(raw, &["currency"]),
            text(raw, &["country"]),
            string_money(raw, "total_costs"),
        )
        .with_breakdown_entry(PLATFORM_FEE, string_money(raw, "deel_fee"))
        .with_breakdown_entry(EMPLOYER_CONTRIBUTIONS, string_money(raw, "employer_costs"))
    }

    fn remote(raw: &Value) -> NormalizedQuote {
        NormalizedQuote::new(
            ProviderKind::Remote,
            number(raw, "gross_monthly_salary"),
            currency_code(raw),
            country_name(raw),
            number(raw, "total_monthly_cost"),
        )
        .with_breakdown_entry(EMPLOYER_CONTRIBUTIONS, number(raw, "monthly_contributions"))
        .with_breakdown_entry(BENEFITS, number(raw, "monthly_benefits"))
        .with_breakdown_entry(MANAGEMENT_FEE, number(raw, "fee"))
    }

    fn rivermate(raw: &Value) -> NormalizedQuote {
        NormalizedQuote::new(
            ProviderKind::Rivermate,
            number(raw, "salary"),
            currency_code(raw),
            country_name(raw),
            number(raw, "total_monthly_cost"),
        )
        .with_breakdown_entry(MANAGEMENT_FEE, number(raw, "management_fee"))
        .with_breakdown_entry(EMPLOYER_CONTRIBUTIONS, number(raw, "employer_taxes_total"))
    }

    fn oyster(raw: &Value) -> NormalizedQuote {
        let contributions = raw
            .get("contributions")
            .map(|c| number(c, "total"))
            .unwrap_or(Decimal::ZERO);
        NormalizedQuote::new(
            ProviderKind::Oyster,
            number(raw, "salary"),
            currency_code(raw),
            country_name(raw),
            number(raw, "total_cost"),
        )
        .with_breakdown_entry(EMPLOYER_CONTRIBUTIONS, contributions)
        .with_breakdown_entry(PLATFORM_FEE, number(raw, "fee"))
    }

    fn rippling(raw: &Value) -> NormalizedQuote {
        NormalizedQuote::new(
            ProviderKind::Rippling,
            number(raw, "base_salary"),
            currency_code(raw),
            country_name(raw),
            number(raw, "total_monthly_cost"),
        )
        .with_breakdown_entry(PLATFORM_FEE, number(raw, "platform_fee"))
        .with_breakdown_entry(EMPLOYER_CONTRIBUTIONS, number(raw, "employer_taxes_total"))
    }

    fn skuad(raw: &Value) -> NormalizedQuote {
        NormalizedQuote::new(
            ProviderKind::Skuad,
            string_money(raw, "gross_salary"),
            text(raw, &["currency"]),
            text(raw, &["country"]),
            string_money(raw, "total_cost"),
        )
        .with_breakdown_entry(PLATFORM_FEE, string_money(raw, "platform_fee"))
        .with_breakdown_entry(
            EMPLOYER_CONTRIBUTIONS,
            string_money(raw, "employer_contributions"),
        )
    }

    fn playroll(raw: &Value) -> NormalizedQuote {
        NormalizedQuote::new(
            ProviderKind::Playroll,
            number(raw, "salary"),
            currency_code(raw),
            country_name(raw),
            number(raw, "total_employment_cost"),
        )
        .with_breakdown_entry(PLATFORM_FEE, number(raw, "fee"))
        .with_breakdown_entry(
            EMPLOYER_CONTRIBUTIONS,
            number(raw, "employer_contributions_total"),
        )
        .with_breakdown_entry(ACCRUALS, number(raw, "accruals"))
    }
}

/// Returns the first non-empty string among `fields`.
fn text(raw: &Value, fields: &[&str]) -> String {
    fields
        .iter()
        .filter_map(|field| raw.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Reads a string-formatted money field.
fn string_money(raw: &Value, field: &str) -> Decimal {
    match raw.get(field) {
        Some(Value::String(s)) => parse_money_str(s),
        Some(other) => decimal_from_json(other).unwrap_or(Decimal::ZERO),
        None => Decimal::ZERO,
    }
}

/// Reads a numeric money field.
fn number(raw: &Value, field: &str) -> Decimal {
    raw.get(field)
        .and_then(decimal_from_json)
        .unwrap_or(Decimal::ZERO)
}

/// Reads `currency` as a plain code or as `{ "code": .. }`.
fn currency_code(raw: &Value) -> String {
    match raw.get("currency") {
        Some(Value::Object(_)) => raw
            .get("currency")
            .map(|c| text(c, &["code"]))
            .unwrap_or_default(),
        _ => text(raw, &["currency"]),
    }
}

/// Reads `country` as a plain name or as `{ "name": .. }`.
fn country_name(raw: &Value) -> String {
    match raw.get("country") {
        Some(Value::Object(_)) => raw
            .get("country")
            .map(|c| text(c, &["name", "code"]))
            .unwrap_or_default(),
        _ => text(raw, &["country", "country_code"]),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use serde_json::json;

    fn normalizer() -> QuoteNormalizer {
        QuoteNormalizer::new()
    }

    #[test]
    fn deel_parses_string_money() {
        let raw = json!({
            "salary": "€ 5,000.50",
            "currency": "eur",
            "country": "Portugal",
            "total_costs": "6,401.25",
            "deel_fee": "599",
            "employer_costs": "n/a"
        });
        let quote = normalizer().normalize(ProviderKind::Deel, &raw);

        assert_eq!(quote.base_cost(), Decimal::new(500050, 2));
        assert_eq!(quote.monthly_total(), Decimal::new(640125, 2));
        assert_eq!(quote.currency(), "EUR");
        assert_eq!(quote.breakdown().len(), 1);
        assert_eq!(quote.original_response(), &raw);
        assert!(quote.is_valid());
    }

    #[test]
    fn remote_reads_nested_currency_and_country() {
        let raw = json!({
            "country": {"name": "Germany", "code": "DE"},
            "currency": {"code": "EUR"},
            "gross_monthly_salary": 4000,
            "total_monthly_cost": 5100.5,
            "monthly_contributions": 850,
            "fee": 599
        });
        let quote = normalizer().normalize(ProviderKind::Remote, &raw);

        assert_eq!(quote.country(), "Germany");
        assert_eq!(quote.currency(), "EUR");
        assert_eq!(quote.monthly_total(), Decimal::new(51005, 1));
        assert_eq!(
            quote.breakdown().get(EMPLOYER_CONTRIBUTIONS),
            Some(&Decimal::from(850))
        );
        assert_eq!(quote.breakdown().get(MANAGEMENT_FEE), Some(&Decimal::from(599)));
    }

    #[test]
    fn oyster_reads_contribution_total() {
        let raw = json!({
            "country": "Spain",
            "currency": "EUR",
            "salary": 3000,
            "total_cost": 4100,
            "contributions": {"total": 950, "items": []}
        });
        let quote = normalizer().normalize(ProviderKind::Oyster, &raw);
        assert_eq!(
            quote.breakdown().get(EMPLOYER_CONTRIBUTIONS),
            Some(&Decimal::from(950))
        );
    }

    #[test]
    fn skuad_tolerates_numeric_values() {
        let raw = json!({
            "country": "Brazil",
            "currency": "BRL",
            "gross_salary": 10000,
            "total_cost": "R$ 14,250.00"
        });
        let quote = normalizer().normalize(ProviderKind::Skuad, &raw);
        assert_eq!(quote.base_cost(), Decimal::from(10000));
        assert_eq!(quote.monthly_total(), Decimal::from(14250));
    }

    #[test]
    fn missing_country_yields_invalid_quote() {
        let raw = json!({"currency": "EUR", "salary": 1000, "total_monthly_cost": 1300});
        let quote = normalizer().normalize(ProviderKind::Rivermate, &raw);
        assert!(!quote.is_valid());
    }

    #[test]
    fn every_provider_has_a_branch() {
        let raw = json!({});
        for provider in ProviderKind::ALL {
            let quote = normalizer().normalize(provider, &raw);
            assert_eq!(quote.provider(), provider);
            assert_eq!(quote.monthly_total(), Decimal::ZERO);
        }
    }

    #[test]
    fn normalize_named_rejects_unknown_provider() {
        let err = normalizer()
            .normalize_named("globalization-partners", &json!({}))
            .unwrap_err();
        assert!(matches!(err, DomainError::UnsupportedProvider(_)));

        let quote = normalizer()
            .normalize_named("Playroll", &json!({"country": "Italy", "currency": "EUR", "total_employment_cost": 10}))
            .unwrap();
        assert_eq!(quote.provider(), ProviderKind::Playroll);
    }

    #[test]
    fn normalization_is_deterministic() {
        let raw = json!({"country": "Italy", "currency": "EUR", "salary": 2500, "total_employment_cost": 3600, "accruals": 210});
        let a = normalizer().normalize(ProviderKind::Playroll, &raw);
        let b = normalizer().normalize(ProviderKind::Playroll, &raw);
        assert_eq!(a, b);
    }
}
