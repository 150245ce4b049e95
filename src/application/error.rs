//! # Application Errors
//!
//! Error types for the enhancement use cases.
//!
//! # Error Hierarchy
//!
//! ```text
//! EnhancementError
//! ├── Domain(DomainError)            - Normalization and invariant failures
//! ├── NoLegalProfile                 - Country has no legal document
//! ├── ReasoningService               - External reasoning failed after retries
//! ├── CurrencyConversion(String)     - Conversion needed but unavailable
//! ├── Integration(IntegrationError)  - Transport failures
//! ├── LegalData(String)              - Legal document could not be read
//! ├── Configuration(String)          - Invalid settings
//! └── Internal(String)               - Unexpected failures
//! ```
//!
//! # Examples
//!
//! ```
//! use eor_quote_engine::application::error::EnhancementError;
//!
//! let err = EnhancementError::no_legal_profile("XX");
//! assert!(err.is_fatal());
//!
//! let err = EnhancementError::reasoning_service(2, "upstream 503");
//! assert!(!err.is_fatal());
//! ```

use crate::domain::errors::DomainError;
use crate::infrastructure::error::IntegrationError;
use thiserror::Error;

/// Application layer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnhancementError {
    /// Domain error from normalization or validation.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// No legal document exists for the country.
    #[error("no legal profile for country {country_code}")]
    NoLegalProfile {
        /// Country code that was looked up.
        country_code: String,
    },

    /// The reasoning service failed after all attempts.
    #[error("reasoning service failed after {attempts} attempt(s): {message}")]
    ReasoningService {
        /// Number of attempts made.
        attempts: u32,
        /// Last error message.
        message: String,
    },

    /// Currency conversion failed where a value was required.
    #[error("currency conversion error: {0}")]
    CurrencyConversion(String),

    /// Transport-level failure from an integration.
    #[error("integration error: {0}")]
    Integration(#[from] IntegrationError),

    /// Legal data could not be loaded or parsed.
    #[error("legal data error: {0}")]
    LegalData(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EnhancementError {
    /// Creates a no legal profile error.
    #[must_use]
    pub fn no_legal_profile(country_code: impl Into<String>) -> Self {
        Self::NoLegalProfile {
            country_code: country_code.into(),
        }
    }

    /// Creates a reasoning service error.
    #[must_use]
    pub fn reasoning_service(attempts: u32, message: impl Into<String>) -> Self {
        Self::ReasoningService {
            attempts,
            message: message.into(),
        }
    }

    /// Creates a currency conversion error.
    #[must_use]
    pub fn currency_conversion(message: impl Into<String>) -> Self {
        Self::CurrencyConversion(message.into())
    }

    /// Creates a legal data error.
    #[must_use]
    pub fn legal_data(message: impl Into<String>) -> Self {
        Self::LegalData(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if another attempt at the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Integration(e) => e.is_retryable(),
            Self::ReasoningService { .. } => true,
            _ => false,
        }
    }

    /// Returns true if the error must reach the caller unchanged.
    ///
    /// Reasoning failures are not fatal: a deterministic fallback exists.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Domain(_) | Self::NoLegalProfile { .. } | Self::LegalData(_) | Self::Configuration(_)
        )
    }

    /// Returns true if this is a missing legal profile.
    #[must_use]
    pub fn is_no_legal_profile(&self) -> bool {
        matches!(self, Self::NoLegalProfile { .. })
    }
}

/// Result type for application operations.
pub type EnhancementResult<T> = Result<T, EnhancementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_legal_profile_is_fatal() {
        let err = EnhancementError::no_legal_profile("XX");
        assert!(err.is_fatal());
        assert!(err.is_no_legal_profile());
        assert!(err.to_string().contains("XX"));
    }

    #[test]
    fn reasoning_failure_is_recoverable() {
        let err = EnhancementError::reasoning_service(2, "503");
        assert!(!err.is_fatal());
        assert!(err.is_retryable());
        assert!(err.to_string().contains("2 attempt"));
    }

    #[test]
    fn domain_error_converts() {
        let err: EnhancementError = DomainError::unsupported_provider("acme").into();
        assert!(matches!(err, EnhancementError::Domain(DomainError::UnsupportedProvider(_))));
        assert!(err.is_fatal());
    }

    #[test]
    fn integration_retryability_passes_through() {
        let err: EnhancementError = IntegrationError::timeout("slow").into();
        assert!(err.is_retryable());

        let err: EnhancementError = IntegrationError::authentication("bad key").into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn currency_conversion_display() {
        let err = EnhancementError::currency_conversion("EUR->BRL unavailable");
        assert_eq!(err.to_string(), "currency conversion error: EUR->BRL unavailable");
    }
}
