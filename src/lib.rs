//! # EOR Quote Engine
//!
//! Quote reconciliation and enhancement engine for Employer-of-Record (EOR)
//! provider quotes.
//!
//! Providers quote the monthly cost of employing someone abroad, but each
//! one bundles (or omits) statutory items differently. This crate takes the
//! heterogeneous provider responses and produces a single validated
//! [`EnhancedQuote`](domain::entities::EnhancedQuote) per provider:
//!
//! ```text
//! raw provider quote
//!   └─▶ QuoteNormalizer ─▶ NormalizedQuote
//!         ├─▶ LegalProfileService ─▶ LegalProfile        (parallel)
//!         └─▶ ProviderInclusionsExtractor ─▶ inclusions   (parallel)
//!               └─▶ delta computation (reasoning service | deterministic)
//!                     └─▶ merge ─▶ validate ─▶ cache ─▶ EnhancedQuote
//! ```
//!
//! # Layers
//!
//! - [`domain`]: value objects, entities, and pure domain services
//! - [`application`]: the [`EnhancementEngine`](application::services::EnhancementEngine)
//!   orchestrator and its strategies
//! - [`infrastructure`]: caches, legal data sources, currency backends, and
//!   the reasoning-service port
//! - [`config`] and [`telemetry`]: settings loading and tracing setup

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod telemetry;

pub use application::error::{EnhancementError, EnhancementResult};
pub use application::services::{EnhancementEngine, EngineConfig};
pub use domain::entities::{EnhancedQuote, EmploymentRequest, NormalizedQuote};
pub use domain::value_objects::{ProviderKind, QuoteType};
