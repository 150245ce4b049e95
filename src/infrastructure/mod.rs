//! # Infrastructure
//!
//! Adapters to the outside world.
//!
//! - [`http_client`]: Shared reqwest wrapper
//! - [`legal_data`]: Per-country legal documents
//! - [`reasoning`]: External reasoning service
//! - [`currency`]: Exchange-rate backends
//! - [`cache`]: In-memory TTL caches

pub mod cache;
pub mod currency;
pub mod error;
pub mod http_client;
pub mod legal_data;
pub mod reasoning;

pub use cache::{CacheStats, EnhancementCache, EnhancementCacheStats, TtlCache};
pub use currency::{ConversionResult, CurrencyProvider, build_currency_provider};
pub use error::{IntegrationError, IntegrationResult};
pub use http_client::HttpClient;
pub use legal_data::{FileLegalDocumentSource, InMemoryLegalDocumentSource, LegalDataService, LegalDocumentSource};
pub use reasoning::{HttpReasoningService, ReasoningService};
