//! # Provider Comparison
//!
//! Ranks enhanced quotes from several providers by their final monthly
//! total, cheapest first.
//!
//! Totals are compared in a single currency. Quotes in another currency are
//! converted through the configured [`CurrencyProvider`]; a quote that can't
//! be converted is left out of the ranking and a note says why.

use crate::domain::entities::EnhancedQuote;
use crate::domain::value_objects::ProviderKind;
use crate::domain::value_objects::money::round_money;
use crate::infrastructure::currency::CurrencyProvider;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// One provider's position in the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedProvider {
    /// The provider.
    pub provider: ProviderKind,
    /// The rank (1 = cheapest).
    pub rank: usize,
    /// Final monthly total in the quote's own currency.
    pub final_total: Decimal,
    /// The quote's own currency.
    pub currency: String,
    /// Final monthly total in the comparison currency.
    pub comparison_total: Decimal,
}

impl RankedProvider {
    /// Returns true if this provider is the cheapest.
    #[must_use]
    pub fn is_cheapest(&self) -> bool {
        self.rank == 1
    }
}

impl fmt::Display for RankedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} {}",
            self.rank, self.provider, self.comparison_total, self.currency
        )
    }
}

/// Side-by-side comparison of enhanced quotes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderComparison {
    /// Currency every ranked total is expressed in.
    pub comparison_currency: String,
    /// Ranked providers, cheapest first.
    pub ranking: Vec<RankedProvider>,
    /// Cheapest provider.
    pub cheapest: Option<ProviderKind>,
    /// Most expensive provider.
    pub most_expensive: Option<ProviderKind>,
    /// Mean of the ranked totals.
    pub average_final_total: Option<Decimal>,
    /// Difference between the most expensive and cheapest totals.
    pub spread: Option<Decimal>,
    /// Why providers were left out, if any were.
    pub notes: Vec<String>,
}

impl ProviderComparison {
    /// Builds the comparison in `comparison_currency`.
    ///
    /// Same-currency quotes are compared as they are. Others go through
    /// `currency`; without one they are excluded.
    pub async fn build(
        quotes: &BTreeMap<ProviderKind, EnhancedQuote>,
        comparison_currency: &str,
        currency: Option<&dyn CurrencyProvider>,
    ) -> Self {
        let target = comparison_currency.trim().to_uppercase();

        let conversions = quotes.iter().map(|(provider, quote)| {
            let target = target.as_str();
            async move {
                let source = quote.base_currency().to_uppercase();
                let total = quote.final_total();
                if source == target {
                    return (*provider, source, total, Ok(total));
                }
                let converted = match currency {
                    None => Err(format!(
                        "{provider} excluded from comparison: quoted in {source}, no currency provider configured"
                    )),
                    Some(converter) => {
                        let result = converter.convert_currency(total, &source, target).await;
                        result.target_amount().ok_or_else(|| {
                            let reason = result.error.unwrap_or_else(|| "conversion skipped".to_string());
                            format!("{provider} excluded from comparison: {source}→{target} failed ({reason})")
                        })
                    }
                };
                (*provider, source, total, converted)
            }
        });

        let mut entries = Vec::with_capacity(quotes.len());
        let mut notes = Vec::new();
        for (provider, source, final_total, converted) in join_all(conversions).await {
            match converted {
                Ok(comparison_total) => entries.push((provider, source, final_total, comparison_total)),
                Err(note) => {
                    warn!(provider = %provider, "{note}");
                    notes.push(note);
                }
            }
        }

        entries.sort_by(|a, b| a.3.cmp(&b.3).then(a.0.cmp(&b.0)));
        let ranking: Vec<RankedProvider> = entries
            .into_iter()
            .enumerate()
            .map(|(i, (provider, currency, final_total, comparison_total))| RankedProvider {
                provider,
                rank: i + 1,
                final_total,
                currency,
                comparison_total,
            })
            .collect();

        let cheapest = ranking.first();
        let most_expensive = ranking.last();
        let average_final_total = (!ranking.is_empty()).then(|| {
            let sum: Decimal = ranking.iter().map(|r| r.comparison_total).sum();
            round_money(sum / Decimal::from(ranking.len()))
        });
        let spread = cheapest
            .zip(most_expensive)
            .map(|(low, high)| round_money(high.comparison_total - low.comparison_total));

        Self {
            comparison_currency: target,
            cheapest: cheapest.map(|r| r.provider),
            most_expensive: most_expensive.map(|r| r.provider),
            average_final_total,
            spread,
            ranking,
            notes,
        }
    }

    /// Returns the ranking entry for `provider`.
    #[must_use]
    pub fn position(&self, provider: ProviderKind) -> Option<&RankedProvider> {
        self.ranking.iter().find(|r| r.provider == provider)
    }
}
