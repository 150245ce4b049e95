//! # Domain Errors
//!
//! Error types raised by pure domain logic: normalization, legal document
//! interpretation, and enhanced-quote invariant checks.

use super::value_objects::ParseEnumError;
use thiserror::Error;

/// Error type for domain rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The provider kind has no normalization branch.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// A normalized quote failed validation.
    #[error("invalid normalized quote: {0}")]
    InvalidNormalizedQuote(String),

    /// An enhanced quote violated one of its invariants.
    #[error("invalid enhanced quote: {0}")]
    InvalidEnhancedQuote(String),

    /// A legal document could not be interpreted.
    #[error("invalid legal document: {0}")]
    InvalidLegalDocument(String),
}

impl DomainError {
    /// Creates an unsupported provider error.
    #[must_use]
    pub fn unsupported_provider(provider: impl Into<String>) -> Self {
        Self::UnsupportedProvider(provider.into())
    }

    /// Creates an invalid normalized quote error.
    #[must_use]
    pub fn invalid_normalized_quote(message: impl Into<String>) -> Self {
        Self::InvalidNormalizedQuote(message.into())
    }

    /// Creates an invalid enhanced quote error.
    #[must_use]
    pub fn invalid_enhanced_quote(message: impl Into<String>) -> Self {
        Self::InvalidEnhancedQuote(message.into())
    }

    /// Creates an invalid legal document error.
    #[must_use]
    pub fn invalid_legal_document(message: impl Into<String>) -> Self {
        Self::InvalidLegalDocument(message.into())
    }
}

impl From<ParseEnumError> for DomainError {
    fn from(err: ParseEnumError) -> Self {
        match err {
            ParseEnumError::InvalidValue("ProviderKind", value) => Self::UnsupportedProvider(value),
            other => Self::InvalidNormalizedQuote(other.to_string()),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ProviderKind;

    #[test]
    fn unsupported_provider_from_parse_error() {
        let parse_err = "acme-eor".parse::<ProviderKind>().unwrap_err();
        let err: DomainError = parse_err.into();
        assert_eq!(err, DomainError::UnsupportedProvider("acme-eor".to_string()));
        assert!(err.to_string().contains("acme-eor"));
    }

    #[test]
    fn display_messages() {
        assert!(
            DomainError::invalid_enhanced_quote("negative total")
                .to_string()
                .contains("negative total")
        );
        assert!(
            DomainError::invalid_normalized_quote("missing country")
                .to_string()
                .starts_with("invalid normalized quote")
        );
    }
}
