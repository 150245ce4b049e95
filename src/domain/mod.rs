//! # Domain Layer
//!
//! Pure business logic with no I/O.
//!
//! - [`value_objects`]: Enums, money helpers, timestamps
//! - [`entities`]: Quotes, legal profiles, baselines, enhanced quotes
//! - [`services`]: Normalization, extraction, legal parsing, calculation
//! - [`errors`]: Domain error type

pub mod entities;
pub mod errors;
pub mod services;
pub mod value_objects;

pub use errors::{DomainError, DomainResult};
