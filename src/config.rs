//! # Configuration
//!
//! Engine settings, layered as: built-in defaults, then an optional TOML
//! file, then `EOR_ENGINE__*` environment variables (`__` separates
//! nesting levels, e.g. `EOR_ENGINE__CURRENCY__BACKEND=frankfurter`).
//!
//! A `.env` file in the working directory is loaded first when present.
//!
//! # Examples
//!
//! ```no_run
//! use eor_quote_engine::config::{EngineSettings, LoadOptions};
//!
//! let settings = EngineSettings::load(LoadOptions::default())?;
//! assert_eq!(settings.calculation.default_contract_months, 12);
//! # Ok::<(), eor_quote_engine::config::ConfigError>(())
//! ```

use crate::domain::services::TerminationFallback;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "EOR_ENGINE";

/// Separator between nesting levels in environment variable names.
pub const ENV_SEPARATOR: &str = "__";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("could not load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Settings were read but are inconsistent.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Cache lifetimes and size cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Lifetime of a cached enhanced quote, in seconds.
    pub result_ttl_secs: u64,
    /// Lifetime of a cached benefit extraction, in seconds.
    pub extraction_ttl_secs: u64,
    /// Lifetime of a cached legal baseline, in seconds.
    pub baseline_ttl_secs: u64,
    /// Maximum entries per cache.
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            result_ttl_secs: 30 * 60,
            extraction_ttl_secs: 60 * 60,
            baseline_ttl_secs: 30 * 60,
            max_entries: 100,
        }
    }
}

impl CacheSettings {
    /// Enhanced quote lifetime.
    #[must_use]
    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }

    /// Extraction lifetime.
    #[must_use]
    pub fn extraction_ttl(&self) -> Duration {
        Duration::from_secs(self.extraction_ttl_secs)
    }

    /// Baseline lifetime.
    #[must_use]
    pub fn baseline_ttl(&self) -> Duration {
        Duration::from_secs(self.baseline_ttl_secs)
    }
}

/// Reasoning service endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningSettings {
    /// Base URL. The engine runs deterministically when unset.
    pub base_url: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Attempts per call, 1 or 2.
    pub max_attempts: u32,
}

impl Default for ReasoningSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 10_000,
            max_attempts: 2,
        }
    }
}

/// Exchange-rate backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyBackend {
    /// exchangerate-api.com (needs an API key).
    ExchangeRateApi,
    /// frankfurter.app (no key).
    #[default]
    Frankfurter,
    /// openexchangerates.org (needs an app id).
    OpenExchangeRates,
}

impl CurrencyBackend {
    /// Public endpoint used when no base URL is configured.
    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::ExchangeRateApi => "https://v6.exchangerate-api.com",
            Self::Frankfurter => "https://api.frankfurter.app",
            Self::OpenExchangeRates => "https://openexchangerates.org",
        }
    }

    /// Rate cache lifetime used when none is configured.
    #[must_use]
    pub fn default_rate_ttl(self) -> Duration {
        match self {
            Self::Frankfurter => Duration::from_secs(5 * 60),
            Self::ExchangeRateApi | Self::OpenExchangeRates => Duration::from_secs(10 * 60),
        }
    }

    /// Returns true if the backend refuses requests without a key.
    #[must_use]
    pub fn requires_api_key(self) -> bool {
        !matches!(self, Self::Frankfurter)
    }
}

/// Currency conversion for cross-provider comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencySettings {
    /// Whether conversion is available at all.
    pub enabled: bool,
    /// Backend to use.
    pub backend: CurrencyBackend,
    /// Overrides the backend's public endpoint.
    pub base_url: Option<String>,
    /// API key or app id.
    pub api_key: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Overrides the backend's rate cache lifetime, in seconds.
    pub rate_ttl_secs: Option<u64>,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CurrencyBackend::default(),
            base_url: None,
            api_key: None,
            timeout_ms: 5_000,
            rate_ttl_secs: None,
        }
    }
}

impl CurrencySettings {
    /// Effective base URL, without a trailing slash.
    #[must_use]
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(self.backend.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Effective rate cache lifetime.
    #[must_use]
    pub fn rate_ttl(&self) -> Duration {
        self.rate_ttl_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.backend.default_rate_ttl())
    }
}

/// Location of the per-country legal documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalDataSettings {
    /// Directory holding one `<CODE>.json` per country.
    pub data_dir: PathBuf,
}

impl Default for LegalDataSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/legal"),
        }
    }
}

/// Calculation defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationSettings {
    /// Contract length assumed when the request leaves it unset.
    pub default_contract_months: u32,
}

impl Default for CalculationSettings {
    fn default() -> Self {
        Self {
            default_contract_months: 12,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Single-line human output.
    #[default]
    Compact,
    /// Multi-line human output.
    Pretty,
    /// Newline-delimited JSON.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Complete engine settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Cache settings.
    pub cache: CacheSettings,
    /// Reasoning service settings.
    pub reasoning: ReasoningSettings,
    /// Currency conversion settings.
    pub currency: CurrencySettings,
    /// Legal data settings.
    pub legal_data: LegalDataSettings,
    /// Severance substitute policy.
    pub termination_fallback: TerminationFallback,
    /// Calculation defaults.
    pub calculation: CalculationSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Where to load settings from.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Optional TOML file.
    pub config_path: Option<PathBuf>,
    /// Fail when `config_path` does not exist.
    pub require_file: bool,
    /// Skip reading `.env`.
    pub skip_dotenv: bool,
    /// Replaces the process environment as the variable source.
    pub env_overrides: Option<HashMap<String, String>>,
}

impl EngineSettings {
    /// Loads and validates settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be read or does not
    /// match the settings shape, and `ConfigError::Validation` if values
    /// are out of range.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        if !options.skip_dotenv {
            // A missing .env is normal.
            let _ = dotenvy::dotenv();
        }

        let mut builder = config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = options.config_path {
            builder = builder.add_source(config::File::from(path).required(options.require_file));
        }

        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(options.env_overrides);

        let settings: Self = builder.add_source(environment).build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::Validation(msg.to_string()));

        if self.cache.max_entries == 0 {
            return fail("cache.max_entries must be at least 1");
        }
        if !(1..=2).contains(&self.reasoning.max_attempts) {
            return fail("reasoning.max_attempts must be 1 or 2");
        }
        if self.reasoning.timeout_ms == 0 || self.currency.timeout_ms == 0 {
            return fail("timeouts must be positive");
        }
        if self.currency.enabled
            && self.currency.backend.requires_api_key()
            && self.currency.api_key.as_deref().is_none_or(str::is_empty)
        {
            return fail("currency.api_key is required for the selected backend");
        }
        if self.calculation.default_contract_months == 0 {
            return fail("calculation.default_contract_months must be at least 1");
        }
        if self.termination_fallback.severance_months < Decimal::ZERO {
            return fail("termination_fallback.severance_months must not be negative");
        }
        if !(0.0..=1.0).contains(&self.termination_fallback.confidence) {
            return fail("termination_fallback.confidence must be within [0, 1]");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn isolated(env: &[(&str, &str)]) -> LoadOptions {
        LoadOptions {
            skip_dotenv: true,
            env_overrides: Some(
                env.iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            ),
            ..LoadOptions::default()
        }
    }

    #[test]
    fn defaults_are_valid() {
        let settings = EngineSettings::load(isolated(&[])).unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.cache.result_ttl(), Duration::from_secs(1800));
        assert_eq!(settings.currency.rate_ttl(), Duration::from_secs(300));
        assert!(settings.termination_fallback.enabled);
    }

    #[test]
    fn file_then_env_layering() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[currency]\nbackend = \"open_exchange_rates\"\napi_key = \"file-key\"\n\n[cache]\nmax_entries = 10"
        )
        .unwrap();

        let mut options = isolated(&[("EOR_ENGINE__CACHE__MAX_ENTRIES", "25")]);
        options.config_path = Some(file.path().to_path_buf());
        options.require_file = true;

        let settings = EngineSettings::load(options).unwrap();
        assert_eq!(settings.currency.backend, CurrencyBackend::OpenExchangeRates);
        assert_eq!(settings.currency.api_key.as_deref(), Some("file-key"));
        assert_eq!(settings.cache.max_entries, 25);
        assert_eq!(settings.currency.resolved_base_url(), "https://openexchangerates.org");
    }

    #[test]
    fn missing_required_file_fails() {
        let mut options = isolated(&[]);
        options.config_path = Some(PathBuf::from("/nonexistent/eor-engine.toml"));
        options.require_file = true;
        assert!(matches!(EngineSettings::load(options), Err(ConfigError::Load(_))));
    }

    #[test]
    fn keyed_backend_without_key_is_rejected() {
        let options = isolated(&[("EOR_ENGINE__CURRENCY__BACKEND", "exchange_rate_api")]);
        assert!(matches!(EngineSettings::load(options), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn attempts_are_bounded() {
        let mut settings = EngineSettings::default();
        settings.reasoning.max_attempts = 3;
        assert!(settings.validate().is_err());
        settings.reasoning.max_attempts = 1;
        assert!(settings.validate().is_ok());
    }
}
