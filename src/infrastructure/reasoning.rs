//! # Reasoning Service
//!
//! Port and HTTP adapter for the external service that computes legal
//! baselines and per-provider enhancement deltas.
//!
//! The engine treats every reply as advisory. Amounts it cannot map onto an
//! [`EnhancementKind`](crate::domain::value_objects::EnhancementKind) are
//! dropped with a warning, and any failure falls through to the
//! deterministic calculator.

use crate::domain::entities::{LegalBaseline, LegalProfile, NormalizedQuote, StandardizedBenefitData};
use crate::domain::value_objects::{EmploymentType, ProviderKind, QuoteType};
use crate::infrastructure::error::IntegrationResult;
use crate::infrastructure::http_client::HttpClient;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Payload for a per-provider enhancement computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementRequest {
    /// Provider being enhanced.
    pub provider: ProviderKind,
    /// Normalized provider quote.
    pub base_quote: NormalizedQuote,
    /// Enhancement mode.
    pub quote_type: QuoteType,
    /// Contract length in months.
    pub contract_duration_months: u32,
    /// Benefits the quote already includes.
    pub extracted_benefits: StandardizedBenefitData,
    /// Country legal profile.
    pub legal_profile: LegalProfile,
    /// Baseline resolved ahead of time, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepass_baseline: Option<LegalBaseline>,
}

/// Payload for a provider-independent baseline computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineRequest {
    /// Canonical country code.
    pub country_code: String,
    /// Country display name.
    pub country_name: String,
    /// Monthly gross salary.
    pub base_salary: Decimal,
    /// Salary currency.
    pub currency: String,
    /// Contract length in months.
    pub contract_duration_months: u32,
    /// Employment type.
    pub employment_type: EmploymentType,
    /// Enhancement mode.
    pub quote_type: QuoteType,
    /// Country legal profile.
    pub legal_profile: LegalProfile,
}

/// One computed delta as returned by the service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningEnhancement {
    /// Monthly amount; also accepted as `amount`.
    #[serde(alias = "amount")]
    pub monthly_amount: Option<Decimal>,
    /// Explanation.
    pub explanation: String,
    /// Confidence in `[0, 1]`.
    pub confidence: Option<f64>,
    /// The provider already covers the item.
    pub already_included: bool,
}

/// Overlap analysis as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningAnalysis {
    /// Items the provider covers.
    pub provider_coverage: Vec<String>,
    /// Mandatory items the provider misses.
    pub missing_requirements: Vec<String>,
    /// Items at risk of double counting.
    pub double_counting_risks: Vec<String>,
}

/// Confidence scores as returned by the service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceScores {
    /// Overall confidence in `[0, 1]`.
    pub overall: Option<f64>,
}

/// Reply to [`ReasoningService::compute_enhancements`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningResponse {
    /// Deltas keyed by snake_case enhancement kind.
    pub enhancements: BTreeMap<String, ReasoningEnhancement>,
    /// Overlap analysis.
    pub analysis: ReasoningAnalysis,
    /// Confidence scores.
    pub confidence_scores: ConfidenceScores,
    /// Data-quality warnings.
    pub warnings: Vec<String>,
    /// Free-form recommendations.
    pub recommendations: Vec<String>,
}

/// One baseline item as returned by the service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningBaselineItem {
    /// Required monthly amount; also accepted as `amount`.
    #[serde(alias = "amount")]
    pub monthly_amount: Option<Decimal>,
    /// The law makes the item unavoidable.
    pub mandatory: bool,
    /// Explanation.
    pub explanation: String,
    /// Confidence in `[0, 1]`.
    pub confidence: Option<f64>,
}

/// Reply to [`ReasoningService::compute_baseline`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineResponse {
    /// Items keyed by snake_case enhancement kind; also accepted as `baseline`.
    #[serde(alias = "baseline")]
    pub items: BTreeMap<String, ReasoningBaselineItem>,
    /// Data-quality warnings.
    pub warnings: Vec<String>,
}

/// External reasoning service.
#[async_trait]
pub trait ReasoningService: Send + Sync + fmt::Debug {
    /// Computes per-provider enhancement deltas.
    async fn compute_enhancements(&self, request: &EnhancementRequest) -> IntegrationResult<ReasoningResponse>;

    /// Computes the provider-independent legal baseline.
    async fn compute_baseline(&self, request: &BaselineRequest) -> IntegrationResult<BaselineResponse>;
}

/// JSON-over-HTTP reasoning service.
#[derive(Debug, Clone)]
pub struct HttpReasoningService {
    client: HttpClient,
    base_url: String,
}

impl HttpReasoningService {
    /// Creates an adapter posting to `base_url`.
    #[must_use]
    pub fn new(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ReasoningService for HttpReasoningService {
    async fn compute_enhancements(&self, request: &EnhancementRequest) -> IntegrationResult<ReasoningResponse> {
        debug!(provider = %request.provider, "requesting enhancement deltas");
        self.client
            .post(&format!("{}/enhancements", self.base_url), request)
            .await
    }

    async fn compute_baseline(&self, request: &BaselineRequest) -> IntegrationResult<BaselineResponse> {
        debug!(country = %request.country_code, "requesting legal baseline");
        self.client
            .post(&format!("{}/baseline", self.base_url), request)
            .await
    }
}
