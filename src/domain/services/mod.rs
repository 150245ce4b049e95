//! # Domain Services
//!
//! Pure, synchronous business logic that doesn't naturally belong to a
//! single entity.
//!
//! ## Services
//!
//! - [`normalizer::QuoteNormalizer`]: Provider quote shapes to one shape
//! - [`inclusions::ProviderInclusionsExtractor`]: What a quote already covers
//! - [`legal_parsing`]: Legal document prose to [`LegalRequirements`](crate::domain::entities::LegalRequirements)
//! - [`calculator::DeterministicCalculator`]: Closed-form baselines and deltas

pub mod calculator;
pub mod inclusions;
pub mod legal_parsing;
pub mod normalizer;

pub use calculator::{BaselineInput, DeterministicCalculator, TerminationFallback};
pub use inclusions::ProviderInclusionsExtractor;
pub use legal_parsing::extract_legal_requirements;
pub use normalizer::QuoteNormalizer;
