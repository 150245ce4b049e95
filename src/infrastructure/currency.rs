//! # Currency Conversion
//!
//! One [`CurrencyProvider`] contract with three interchangeable HTTP
//! backends.
//!
//! Every backend shares the same front half:
//!
//! - same-currency pairs return rate 1 without a request
//! - negative amounts return the `target_amount = -1` skip sentinel
//! - rates are cached per `SOURCE_TARGET` pair for the backend's TTL
//! - concurrent requests for one pair share a single in-flight request
//!
//! Failures never cross the conversion boundary as `Err`; they come back
//! as `ConversionResult { success: false, error }`.

use crate::application::error::{EnhancementError, EnhancementResult};
use crate::config::{CurrencyBackend, CurrencySettings};
use crate::domain::value_objects::money::{decimal_from_json, round_money};
use crate::infrastructure::cache::TtlCache;
use crate::infrastructure::error::IntegrationError;
use crate::infrastructure::http_client::HttpClient;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Rate caches hold far fewer pairs than this in practice.
const RATE_CACHE_CAPACITY: usize = 256;

/// Currencies with a known display name and symbol.
const CURRENCIES: &[(&str, &str, &str)] = &[
    ("USD", "US Dollar", "$"),
    ("EUR", "Euro", "€"),
    ("GBP", "British Pound", "£"),
    ("BRL", "Brazilian Real", "R$"),
    ("CAD", "Canadian Dollar", "C$"),
    ("AUD", "Australian Dollar", "A$"),
    ("CHF", "Swiss Franc", "CHF"),
    ("JPY", "Japanese Yen", "¥"),
    ("INR", "Indian Rupee", "₹"),
    ("MXN", "Mexican Peso", "MX$"),
    ("PLN", "Polish Zloty", "zł"),
    ("SEK", "Swedish Krona", "kr"),
    ("NOK", "Norwegian Krone", "kr"),
    ("DKK", "Danish Krone", "kr"),
    ("ZAR", "South African Rand", "R"),
    ("AED", "UAE Dirham", "AED"),
    ("SGD", "Singapore Dollar", "S$"),
    ("CNY", "Chinese Yuan", "¥"),
    ("ARS", "Argentine Peso", "AR$"),
    ("COP", "Colombian Peso", "COL$"),
];

/// Errors raised while obtaining a rate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyConversionError {
    /// A currency code is not a three-letter code.
    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),

    /// The backend answered but reported a failure.
    #[error("rate unavailable for {pair}: {message}")]
    RateUnavailable {
        /// `SOURCE_TARGET` pair.
        pair: String,
        /// Backend message.
        message: String,
    },

    /// The backend returned a non-finite or non-positive rate.
    #[error("invalid rate for {pair}: {rate}")]
    InvalidRate {
        /// `SOURCE_TARGET` pair.
        pair: String,
        /// The offending value as received.
        rate: String,
    },

    /// The converted amount does not fit in a decimal.
    #[error("conversion overflow for {0}")]
    Overflow(String),

    /// Transport failure.
    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

impl CurrencyConversionError {
    fn rate_unavailable(pair: &str, message: impl Into<String>) -> Self {
        Self::RateUnavailable {
            pair: pair.to_string(),
            message: message.into(),
        }
    }

    fn invalid_rate(pair: &str, rate: impl fmt::Display) -> Self {
        Self::InvalidRate {
            pair: pair.to_string(),
            rate: rate.to_string(),
        }
    }
}

/// Display information for a currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyInfo {
    /// ISO 4217 code.
    pub code: String,
    /// Display name; the code itself for unknown currencies.
    pub name: String,
    /// Symbol; the code itself for unknown currencies.
    pub symbol: String,
}

impl CurrencyInfo {
    /// Looks up `code` in the static table.
    #[must_use]
    pub fn for_code(code: &str) -> Self {
        let code = code.trim().to_uppercase();
        match CURRENCIES.iter().find(|(c, _, _)| *c == code) {
            Some((_, name, symbol)) => Self {
                name: (*name).to_string(),
                symbol: (*symbol).to_string(),
                code,
            },
            None => Self {
                name: code.clone(),
                symbol: code.clone(),
                code,
            },
        }
    }
}

/// A successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionData {
    /// Rate applied, as a decimal string.
    pub exchange_rate: String,
    /// Source currency.
    pub source_currency: CurrencyInfo,
    /// Target currency.
    pub target_currency: CurrencyInfo,
    /// Amount converted.
    pub source_amount: Decimal,
    /// Converted amount, rounded to two decimals; `-1` means skip.
    pub target_amount: Decimal,
}

/// Outcome of a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Whether `data` is present.
    pub success: bool,
    /// Conversion details on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ConversionData>,
    /// Failure description otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionResult {
    /// Creates a successful result.
    #[must_use]
    pub fn ok(data: ConversionData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failed(error: &CurrencyConversionError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }

    /// Returns the converted amount, unless the conversion failed or was
    /// skipped.
    #[must_use]
    pub fn target_amount(&self) -> Option<Decimal> {
        self.data
            .as_ref()
            .map(|d| d.target_amount)
            .filter(|amount| *amount >= Decimal::ZERO)
    }

    /// Returns true for the negative-amount sentinel.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.data
            .as_ref()
            .is_some_and(|d| d.target_amount == Decimal::NEGATIVE_ONE)
    }
}

/// Converts amounts between currencies.
#[async_trait]
pub trait CurrencyProvider: Send + Sync + fmt::Debug {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Converts `amount` from `source` to `target`. Never fails with `Err`.
    async fn convert_currency(&self, amount: Decimal, source: &str, target: &str) -> ConversionResult;
}

type RateFuture = Shared<BoxFuture<'static, Result<Decimal, CurrencyConversionError>>>;

/// Per-backend rate cache with in-flight request sharing.
#[derive(Debug)]
pub struct RateCache {
    rates: TtlCache<Decimal>,
    in_flight: Mutex<HashMap<String, RateFuture>>,
}

impl RateCache {
    /// Creates an empty cache whose rates live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            rates: TtlCache::new(ttl, RATE_CACHE_CAPACITY),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cache key for a pair.
    #[must_use]
    pub fn pair_key(source: &str, target: &str) -> String {
        format!("{source}_{target}")
    }

    /// Returns the cached rate for `key`, or runs `fetch` once for all
    /// concurrent callers and caches its success.
    ///
    /// # Errors
    ///
    /// Returns whatever `fetch` failed with. Failures are not cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<Decimal, CurrencyConversionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Decimal, CurrencyConversionError>> + Send + 'static,
    {
        if let Some(rate) = self.rates.get(key) {
            debug!(pair = key, "rate cache hit");
            return Ok(rate);
        }

        let shared = {
            let mut in_flight = self.in_flight.lock();
            in_flight
                .entry(key.to_string())
                .or_insert_with(|| fetch().boxed().shared())
                .clone()
        };

        let result = shared.clone().await;

        {
            let mut in_flight = self.in_flight.lock();
            if in_flight.get(key).is_some_and(|f| f.ptr_eq(&shared)) {
                in_flight.remove(key);
            }
        }
        if let Ok(rate) = &result {
            self.rates.insert(key, *rate);
        }
        result
    }

    /// Returns the number of requests currently in flight.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Drops every cached rate.
    pub fn clear(&self) {
        self.rates.clear();
    }
}

fn normalize_code(code: &str) -> Result<String, CurrencyConversionError> {
    let code = code.trim().to_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(CurrencyConversionError::InvalidCurrency(code))
    }
}

fn positive_rate(pair: &str, value: Option<&Value>) -> Result<Decimal, CurrencyConversionError> {
    let Some(value) = value else {
        return Err(CurrencyConversionError::rate_unavailable(pair, "rate missing from response"));
    };
    match decimal_from_json(value) {
        Some(rate) if rate > Decimal::ZERO => Ok(rate),
        _ => Err(CurrencyConversionError::invalid_rate(pair, value)),
    }
}

/// Shared conversion front half. `fetch` is only invoked on a cache miss.
async fn convert_with<F, Fut>(
    backend: &'static str,
    cache: &RateCache,
    amount: Decimal,
    source: &str,
    target: &str,
    fetch: F,
) -> ConversionResult
where
    F: FnOnce(String, String) -> Fut,
    Fut: Future<Output = Result<Decimal, CurrencyConversionError>> + Send + 'static,
{
    let codes = normalize_code(source).and_then(|s| normalize_code(target).map(|t| (s, t)));
    let (source, target) = match codes {
        Ok(codes) => codes,
        Err(e) => return ConversionResult::failed(&e),
    };

    let data = |rate: &str, target_amount: Decimal| ConversionData {
        exchange_rate: rate.to_string(),
        source_currency: CurrencyInfo::for_code(&source),
        target_currency: CurrencyInfo::for_code(&target),
        source_amount: amount,
        target_amount,
    };

    if source == target {
        return ConversionResult::ok(data("1", amount));
    }
    if amount < Decimal::ZERO {
        return ConversionResult::ok(data("0", Decimal::NEGATIVE_ONE));
    }

    let key = RateCache::pair_key(&source, &target);
    let fetched = cache
        .get_or_fetch(&key, || fetch(source.clone(), target.clone()))
        .await
        .and_then(|rate| {
            amount
                .checked_mul(rate)
                .map(|converted| (rate, round_money(converted)))
                .ok_or_else(|| CurrencyConversionError::Overflow(key.clone()))
        });

    match fetched {
        Ok((rate, converted)) => ConversionResult::ok(data(&rate.normalize().to_string(), converted)),
        Err(e) => {
            warn!(backend, pair = %key, error = %e, "currency conversion failed");
            ConversionResult::failed(&e)
        }
    }
}

/// exchangerate-api.com backend.
#[derive(Debug)]
pub struct ExchangeRateApiProvider {
    client: HttpClient,
    base_url: String,
    api_key: String,
    cache: RateCache,
}

impl ExchangeRateApiProvider {
    /// Rate lifetime when none is configured.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

    /// Creates the backend.
    #[must_use]
    pub fn new(client: HttpClient, base_url: impl Into<String>, api_key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            cache: RateCache::new(ttl),
        }
    }

    /// Returns the rate cache.
    #[must_use]
    pub fn rate_cache(&self) -> &RateCache {
        &self.cache
    }
}

#[async_trait]
impl CurrencyProvider for ExchangeRateApiProvider {
    fn name(&self) -> &'static str {
        "exchange_rate_api"
    }

    async fn convert_currency(&self, amount: Decimal, source: &str, target: &str) -> ConversionResult {
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let api_key = self.api_key.clone();

        convert_with(self.name(), &self.cache, amount, source, target, move |source, target| async move {
            let pair = RateCache::pair_key(&source, &target);
            let url = format!("{base_url}/v6/{api_key}/pair/{source}/{target}");
            let body: Value = client.get(&url).await?;

            if body.get("result").and_then(Value::as_str) != Some("success") {
                let reason = body
                    .get("error-type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                return Err(CurrencyConversionError::rate_unavailable(&pair, reason));
            }
            positive_rate(&pair, body.get("conversion_rate"))
        })
        .await
    }
}

/// frankfurter.app backend.
#[derive(Debug)]
pub struct FrankfurterProvider {
    client: HttpClient,
    base_url: String,
    cache: RateCache,
}

impl FrankfurterProvider {
    /// Rate lifetime when none is configured.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

    /// Creates the backend.
    #[must_use]
    pub fn new(client: HttpClient, base_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: RateCache::new(ttl),
        }
    }

    /// Returns the rate cache.
    #[must_use]
    pub fn rate_cache(&self) -> &RateCache {
        &self.cache
    }
}

#[async_trait]
impl CurrencyProvider for FrankfurterProvider {
    fn name(&self) -> &'static str {
        "frankfurter"
    }

    async fn convert_currency(&self, amount: Decimal, source: &str, target: &str) -> ConversionResult {
        let client = self.client.clone();
        let url = format!("{}/latest", self.base_url);

        convert_with(self.name(), &self.cache, amount, source, target, move |source, target| async move {
            let pair = RateCache::pair_key(&source, &target);
            let params = [("from", source.as_str()), ("to", target.as_str())];
            let body: Value = client.get_with_params(&url, &params).await?;
            positive_rate(&pair, body.get("rates").and_then(|rates| rates.get(&target)))
        })
        .await
    }
}

/// openexchangerates.org backend. Rates are USD-based; other pairs are
/// cross rates.
#[derive(Debug)]
pub struct OpenExchangeRatesProvider {
    client: HttpClient,
    base_url: String,
    app_id: String,
    cache: RateCache,
}

impl OpenExchangeRatesProvider {
    /// Rate lifetime when none is configured.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

    /// Creates the backend.
    #[must_use]
    pub fn new(client: HttpClient, base_url: impl Into<String>, app_id: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            cache: RateCache::new(ttl),
        }
    }

    /// Returns the rate cache.
    #[must_use]
    pub fn rate_cache(&self) -> &RateCache {
        &self.cache
    }
}

#[async_trait]
impl CurrencyProvider for OpenExchangeRatesProvider {
    fn name(&self) -> &'static str {
        "open_exchange_rates"
    }

    async fn convert_currency(&self, amount: Decimal, source: &str, target: &str) -> ConversionResult {
        let client = self.client.clone();
        let url = format!("{}/api/latest.json", self.base_url);
        let app_id = self.app_id.clone();

        convert_with(self.name(), &self.cache, amount, source, target, move |source, target| async move {
            let pair = RateCache::pair_key(&source, &target);
            let symbols = format!("{source},{target}");
            let params = [("app_id", app_id.as_str()), ("symbols", symbols.as_str())];
            let body: Value = client.get_with_params(&url, &params).await?;

            let rates = body.get("rates");
            let usd_rate = |code: &str| {
                if code == "USD" {
                    Ok(Decimal::ONE)
                } else {
                    positive_rate(&pair, rates.and_then(|r| r.get(code)))
                }
            };
            let from_usd = usd_rate(&source)?;
            let to_usd = usd_rate(&target)?;
            to_usd
                .checked_div(from_usd)
                .filter(|rate| *rate > Decimal::ZERO)
                .ok_or_else(|| CurrencyConversionError::invalid_rate(&pair, format!("{to_usd}/{from_usd}")))
        })
        .await
    }
}

/// Builds the configured backend.
///
/// # Errors
///
/// Returns `EnhancementError::Configuration` if the backend needs a key and
/// none is set, and `EnhancementError::Integration` if the HTTP client
/// cannot be created.
pub fn build_currency_provider(settings: &CurrencySettings) -> EnhancementResult<Arc<dyn CurrencyProvider>> {
    let client = HttpClient::new(settings.timeout_ms)?;
    let base_url = settings.resolved_base_url();
    let ttl = settings.rate_ttl();

    let api_key = || {
        settings
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| EnhancementError::configuration("currency api key is not set"))
    };

    let provider: Arc<dyn CurrencyProvider> = match settings.backend {
        CurrencyBackend::ExchangeRateApi => Arc::new(ExchangeRateApiProvider::new(client, base_url, api_key()?, ttl)),
        CurrencyBackend::Frankfurter => Arc::new(FrankfurterProvider::new(client, base_url, ttl)),
        CurrencyBackend::OpenExchangeRates => {
            Arc::new(OpenExchangeRatesProvider::new(client, base_url, api_key()?, ttl))
        }
    };
    Ok(provider)
}
