//! # Money Helpers
//!
//! Decimal helpers shared by normalization, extraction, and calculation.
//!
//! All monetary amounts in the engine are [`Decimal`]s. Presentation values
//! are rounded half-up (midpoint away from zero) to two decimal places.
//!
//! # Examples
//!
//! ```
//! use eor_quote_engine::domain::value_objects::money::{parse_money_str, round_money};
//! use rust_decimal::Decimal;
//!
//! assert_eq!(parse_money_str("EUR 5,000.50"), Decimal::new(500050, 2));
//! assert_eq!(round_money(Decimal::new(83333, 3)), Decimal::new(8333, 2));
//! ```

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

/// Number of decimal places used for presented money values.
pub const MONEY_SCALE: u32 = 2;

/// Tolerance used when comparing rounded money values.
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Months in a year, as a decimal.
pub const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// One hundred, for percentage arithmetic.
pub const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounds a value half-up to two decimal places.
#[inline]
#[must_use]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns true if two money values are equal to two-decimal precision.
#[must_use]
pub fn money_eq(a: Decimal, b: Decimal) -> bool {
    (round_money(a) - round_money(b)).abs() < MONEY_TOLERANCE
}

/// Returns `value * pct / 100`.
#[inline]
#[must_use]
pub fn percent_of(value: Decimal, pct: Decimal) -> Decimal {
    value * pct / ONE_HUNDRED
}

/// Divides `total` evenly over `parts`, returning zero when `parts` is zero.
#[inline]
#[must_use]
pub fn spread_over(total: Decimal, parts: Decimal) -> Decimal {
    if parts.is_zero() {
        Decimal::ZERO
    } else {
        total / parts
    }
}

/// Parses a string-formatted monetary value.
///
/// Currency codes, currency symbols, whitespace and thousands separators
/// (`,` and `'`) are stripped. Anything that still fails to parse yields
/// zero; this never errors.
#[must_use]
pub fn parse_money_str(raw: &str) -> Decimal {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .unwrap_or(Decimal::ZERO)
}

/// Reads a decimal out of a JSON number or numeric string.
///
/// Returns `None` for other JSON types.
#[must_use]
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64))
        }
        Value::String(s) => Some(parse_money_str(s)),
        _ => None,
    }
}

/// Reads a decimal field from a JSON object, defaulting to zero.
#[must_use]
pub fn decimal_field(value: &Value, field: &str) -> Decimal {
    value
        .get(field)
        .and_then(decimal_from_json)
        .unwrap_or(Decimal::ZERO)
}

/// Converts a decimal to `f64` for scoring and logging.
#[must_use]
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_money_is_half_up() {
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_money(Decimal::new(12344, 3)), Decimal::new(1234, 2));
        assert_eq!(
            round_money(Decimal::from(1000) / Decimal::from(12)),
            Decimal::new(8333, 2)
        );
    }

    #[test]
    fn money_eq_uses_two_decimals() {
        assert!(money_eq(Decimal::new(100001, 3), Decimal::new(10000, 2)));
        assert!(!money_eq(Decimal::new(10001, 2), Decimal::new(10000, 2)));
    }

    #[test]
    fn parse_money_str_strips_formatting() {
        assert_eq!(parse_money_str("$1,234.56"), Decimal::new(123456, 2));
        assert_eq!(parse_money_str("CHF 12'000"), Decimal::from(12000));
        assert_eq!(parse_money_str("  750 "), Decimal::from(750));
    }

    #[test]
    fn parse_money_str_defaults_to_zero() {
        assert_eq!(parse_money_str("n/a"), Decimal::ZERO);
        assert_eq!(parse_money_str(""), Decimal::ZERO);
        assert_eq!(parse_money_str("1.2.3"), Decimal::ZERO);
    }

    #[test]
    fn decimal_from_json_handles_numbers_and_strings() {
        assert_eq!(decimal_from_json(&json!(1500)), Some(Decimal::from(1500)));
        assert_eq!(
            decimal_from_json(&json!(99.5)),
            Some(Decimal::new(995, 1))
        );
        assert_eq!(
            decimal_from_json(&json!("2,000")),
            Some(Decimal::from(2000))
        );
        assert_eq!(decimal_from_json(&json!(null)), None);
    }

    #[test]
    fn spread_over_zero_parts() {
        assert_eq!(spread_over(Decimal::from(10), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(
            spread_over(Decimal::from(12), Decimal::from(4)),
            Decimal::from(3)
        );
    }

    #[test]
    fn percent_of_works() {
        assert_eq!(
            percent_of(Decimal::from(1000), Decimal::new(73, 1)),
            Decimal::from(73)
        );
    }
}
