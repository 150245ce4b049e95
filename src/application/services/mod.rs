//! # Application Services
//!
//! Services that orchestrate domain logic and infrastructure.
//!
//! - [`EnhancementEngine`]: per-provider enhancement and multi-provider fan-out
//! - [`LegalProfileService`]: cached legal profiles per country and contract
//! - [`BaselineResolver`]: de-duplicated legal baselines over a [`BaselineChain`]
//! - [`DeltaChain`]: ordered delta strategies
//! - [`ProviderComparison`]: ranking of enhanced quotes
//! - [`RetryPolicy`]: bounded retries for reasoning-service calls

pub mod baseline;
pub mod comparison;
pub mod delta;
pub mod enhancement_engine;
pub mod legal_profile;
pub mod retry;

pub use baseline::{
    BaselineChain, BaselineContext, BaselineResolver, BaselineStrategy, DeterministicBaselineStrategy,
    ReasoningBaselineStrategy,
};
pub use comparison::{ProviderComparison, RankedProvider};
pub use delta::{
    DeltaChain, DeltaContext, DeltaOutcome, DeltaStrategy, DeterministicDeltaStrategy,
    ReasoningDeltaStrategy, merge_records,
};
pub use enhancement_engine::{
    AllProvidersResult, EngineCacheStats, EngineConfig, EnhancementEngine, EnhancementEngineBuilder,
};
pub use legal_profile::LegalProfileService;
pub use retry::RetryPolicy;
