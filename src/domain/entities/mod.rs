//! # Domain Entities
//!
//! Entities flowing through the enhancement pipeline.
//!
//! ## Inputs
//!
//! - [`EmploymentRequest`]: The hire being quoted
//! - [`QuoteInput`]: Raw or already normalized provider quote
//!
//! ## Intermediate
//!
//! - [`NormalizedQuote`]: Provider-independent quote shape
//! - [`StandardizedBenefitData`]: What a provider quote already includes
//! - [`LegalRequirements`], [`LegalProfile`]: Per-country statutory rules
//! - [`LegalBaseline`]: Monthly legal costs for one salary
//!
//! ## Output
//!
//! - [`EnhancedQuote`]: Validated quote plus statutory enhancements

pub mod benefits;
pub mod employment_request;
pub mod enhanced_quote;
pub mod legal;
pub mod normalized_quote;

pub use benefits::{IncludedBenefit, StandardizedBenefitData};
pub use employment_request::{DEFAULT_CONTRACT_MONTHS, EmploymentRequest, LocalOfficeBenefits};
pub use enhanced_quote::{
    EnhancedQuote, EnhancedQuoteParts, EnhancementRecord, EnhancementSource,
    MonthlyCostBreakdown, OverlapAnalysis,
};
pub use legal::{
    Allowances, BaselineItem, BaselineSource, Bonuses, Contributions, LegalBaseline,
    LegalDocument, LegalProfile, LegalProfileKey, LegalRequirements, MandatorySalaries, TerminationTerms,
};
pub use normalized_quote::{NormalizedQuote, QuoteInput, RawProviderQuote};
