//! # Application Layer
//!
//! Use cases built on the domain: the [`EnhancementEngine`](services::EnhancementEngine)
//! and the strategies it composes.

pub mod error;
pub mod services;

pub use error::{EnhancementError, EnhancementResult};
