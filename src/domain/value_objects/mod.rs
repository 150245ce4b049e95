//! # Value Objects
//!
//! Immutable types with validation and domain semantics.
//!
//! ## Domain Enums
//!
//! - [`ProviderKind`]: Supported EOR providers
//! - [`QuoteType`]: All-inclusive or statutory-only enhancement mode
//! - [`EmploymentType`]: Requested contract type
//! - [`BenefitKey`]: Provider line-item taxonomy
//! - [`EnhancementKind`]: Enhancement record kinds
//! - [`Frequency`]: Monthly or yearly payment
//!
//! ## Money and Time
//!
//! - [`money`]: Decimal rounding and parsing helpers
//! - [`Timestamp`]: UTC timestamp

pub mod enums;
pub mod money;
pub mod timestamp;

pub use enums::{
    BenefitKey, EmploymentType, EnhancementKind, Frequency, ParseEnumError, ProviderKind,
    QuoteType,
};
pub use timestamp::Timestamp;
