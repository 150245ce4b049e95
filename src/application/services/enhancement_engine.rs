//! # Enhancement Engine
//!
//! Orchestrates normalization, legal profiles, inclusion extraction, delta
//! computation and caching into one validated [`EnhancedQuote`] per
//! provider.
//!
//! ## Entry points
//!
//! - [`EnhancementEngine::enhance_quote`]: deterministic baseline, deltas
//!   from the reasoning service with deterministic fallback
//! - [`EnhancementEngine::enhance_quote_direct`]: baseline from a shared,
//!   de-duplicated pre-pass; deltas computed locally
//! - [`EnhancementEngine::enhance_all_providers`]: fail-soft fan-out of
//!   `enhance_quote_direct` plus a [`ProviderComparison`]
//!
//! The engine is an explicit service object. Build one at start-up with
//! [`EnhancementEngine::from_settings`] or [`EnhancementEngine::builder`]
//! and share it by reference.

use crate::application::error::{EnhancementError, EnhancementResult};
use crate::application::services::baseline::{
    BaselineChain, BaselineContext, BaselineResolver, DeterministicBaselineStrategy,
    ReasoningBaselineStrategy,
};
use crate::application::services::comparison::ProviderComparison;
use crate::application::services::delta::{
    DeltaChain, DeltaContext, DeltaOutcome, DeterministicDeltaStrategy, ReasoningDeltaStrategy,
    merge_records,
};
use crate::application::services::legal_profile::LegalProfileService;
use crate::application::services::retry::RetryPolicy;
use crate::config::EngineSettings;
use crate::domain::entities::{
    EmploymentRequest, EnhancedQuote, EnhancedQuoteParts, EnhancementRecord, EnhancementSource,
    LegalBaseline, LegalProfile, NormalizedQuote, QuoteInput, StandardizedBenefitData,
};
use crate::domain::errors::DomainError;
use crate::domain::services::{
    BaselineInput, DeterministicCalculator, ProviderInclusionsExtractor, QuoteNormalizer,
    TerminationFallback,
};
use crate::domain::value_objects::money::round_money;
use crate::domain::value_objects::{EnhancementKind, ProviderKind, QuoteType};
use crate::infrastructure::cache::{
    CacheStats, DEFAULT_EXTRACTION_TTL, DEFAULT_MAX_ENTRIES, DEFAULT_RESULT_TTL, EnhancementCache,
};
use crate::infrastructure::currency::{CurrencyProvider, build_currency_provider};
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::legal_data::{
    FileLegalDocumentSource, LegalDataService, LegalDocumentSource,
};
use crate::infrastructure::reasoning::{HttpReasoningService, ReasoningService};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Engine tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Contract length used when a request carries none.
    pub default_contract_months: u32,
    /// Lifetime of cached enhanced quotes.
    pub result_ttl: Duration,
    /// Lifetime of cached extractions.
    pub extraction_ttl: Duration,
    /// Lifetime of cached baselines.
    pub baseline_ttl: Duration,
    /// Size cap of each cache.
    pub max_cache_entries: usize,
    /// Attempts per reasoning-service call.
    pub reasoning_attempts: u32,
    /// Severance substitute for unreadable termination terms.
    pub termination_fallback: TerminationFallback,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_contract_months: crate::domain::entities::DEFAULT_CONTRACT_MONTHS,
            result_ttl: DEFAULT_RESULT_TTL,
            extraction_ttl: DEFAULT_EXTRACTION_TTL,
            baseline_ttl: DEFAULT_RESULT_TTL,
            max_cache_entries: DEFAULT_MAX_ENTRIES,
            reasoning_attempts: RetryPolicy::MAX_ATTEMPTS,
            termination_fallback: TerminationFallback::default(),
        }
    }
}

impl EngineConfig {
    /// Derives the engine tuning from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            default_contract_months: settings.calculation.default_contract_months,
            result_ttl: settings.cache.result_ttl(),
            extraction_ttl: settings.cache.extraction_ttl(),
            baseline_ttl: settings.cache.baseline_ttl(),
            max_cache_entries: settings.cache.max_entries,
            reasoning_attempts: settings.reasoning.max_attempts,
            termination_fallback: settings.termination_fallback.clone(),
        }
    }
}

/// Outcome of [`EnhancementEngine::enhance_all_providers`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllProvidersResult {
    /// Enhanced quotes that succeeded.
    pub enhancements: BTreeMap<ProviderKind, EnhancedQuote>,
    /// Ranking of the successful quotes.
    pub comparison: ProviderComparison,
    /// Wall-clock time of the whole call.
    pub processing_time_ms: u64,
    /// Failure message per provider key as given by the caller.
    pub errors: BTreeMap<String, String>,
}

impl AllProvidersResult {
    /// Returns true if no provider failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Counters for every cache the engine owns.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineCacheStats {
    /// Enhanced quotes.
    pub results: CacheStats,
    /// Benefit extractions.
    pub extractions: CacheStats,
    /// Legal baselines.
    pub baselines: CacheStats,
    /// Cached legal profiles.
    pub legal_profiles: usize,
    /// Cached legal document lookups, including misses.
    pub legal_documents: usize,
}

/// Builder for [`EnhancementEngine`].
#[derive(Debug)]
pub struct EnhancementEngineBuilder {
    config: EngineConfig,
    legal_source: Arc<dyn LegalDocumentSource>,
    reasoning: Option<Arc<dyn ReasoningService>>,
    currency: Option<Arc<dyn CurrencyProvider>>,
}

impl EnhancementEngineBuilder {
    /// Replaces the tuning.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables the reasoning service.
    #[must_use]
    pub fn reasoning(mut self, service: Arc<dyn ReasoningService>) -> Self {
        self.reasoning = Some(service);
        self
    }

    /// Enables currency conversion for comparisons.
    #[must_use]
    pub fn currency(mut self, provider: Arc<dyn CurrencyProvider>) -> Self {
        self.currency = Some(provider);
        self
    }

    /// Builds the engine with empty caches.
    #[must_use]
    pub fn build(self) -> EnhancementEngine {
        let config = self.config;
        let calculator = DeterministicCalculator::new(config.termination_fallback.clone());
        let retry = RetryPolicy::new(config.reasoning_attempts);
        let deterministic = DeterministicDeltaStrategy::new(calculator.clone());

        let mut baseline_chain = BaselineChain::new();
        let mut delta_chain = DeltaChain::new();
        if let Some(service) = &self.reasoning {
            baseline_chain = baseline_chain.then(Arc::new(ReasoningBaselineStrategy::new(
                Arc::clone(service),
                retry,
            )));
            delta_chain =
                delta_chain.then(Arc::new(ReasoningDeltaStrategy::new(Arc::clone(service), retry)));
        }
        let baseline_chain =
            baseline_chain.then(Arc::new(DeterministicBaselineStrategy::new(calculator.clone())));
        let delta_chain = delta_chain.then(Arc::new(deterministic.clone()));

        let legal_data = Arc::new(LegalDataService::new(self.legal_source));
        info!(
            baseline = ?baseline_chain.names(),
            deltas = ?delta_chain.names(),
            currency = self.currency.as_ref().map(|c| c.name()),
            "enhancement engine ready"
        );

        EnhancementEngine {
            normalizer: QuoteNormalizer::new(),
            extractor: ProviderInclusionsExtractor::new(),
            profiles: LegalProfileService::new(Arc::clone(&legal_data), calculator.clone()),
            cache: EnhancementCache::new(config.result_ttl, config.extraction_ttl, config.max_cache_entries),
            baselines: BaselineResolver::new(baseline_chain, config.baseline_ttl, config.max_cache_entries),
            deltas: delta_chain,
            legal_data,
            calculator,
            deterministic,
            currency: self.currency,
            config,
        }
    }
}

/// Quote reconciliation and enhancement engine.
pub struct EnhancementEngine {
    config: EngineConfig,
    normalizer: QuoteNormalizer,
    extractor: ProviderInclusionsExtractor,
    calculator: DeterministicCalculator,
    deterministic: DeterministicDeltaStrategy,
    legal_data: Arc<LegalDataService>,
    profiles: LegalProfileService,
    cache: EnhancementCache,
    baselines: BaselineResolver,
    deltas: DeltaChain,
    currency: Option<Arc<dyn CurrencyProvider>>,
}

impl fmt::Debug for EnhancementEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhancementEngine")
            .field("config", &self.config)
            .field("baseline_strategies", &self.baselines.chain().names())
            .field("delta_strategies", &self.deltas.names())
            .field("currency", &self.currency.as_ref().map(|c| c.name()))
            .finish_non_exhaustive()
    }
}

/// Which delta path produced a quote; part of the result cache key.
#[derive(Debug, Clone, Copy)]
enum Mode {
    Standard,
    Direct,
}

impl Mode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Direct => "direct",
        }
    }
}

/// A validated quote with its profile, ready for delta computation.
struct Prepared {
    quote: NormalizedQuote,
    profile: Arc<LegalProfile>,
    contract_months: u32,
    base_salary: Decimal,
    salary_currency: String,
    warnings: Vec<String>,
}

impl EnhancementEngine {
    /// Starts a builder reading legal documents from `legal_source`.
    #[must_use]
    pub fn builder(legal_source: Arc<dyn LegalDocumentSource>) -> EnhancementEngineBuilder {
        EnhancementEngineBuilder {
            config: EngineConfig::default(),
            legal_source,
            reasoning: None,
            currency: None,
        }
    }

    /// Builds an engine from loaded settings.
    ///
    /// Legal documents are read from `legal_data.data_dir`. The reasoning
    /// service is used only when `reasoning.base_url` is set; currency
    /// conversion only when `currency.enabled`.
    ///
    /// # Errors
    ///
    /// Returns `EnhancementError::Configuration` for invalid settings and
    /// `EnhancementError::Integration` if an HTTP client can't be built.
    pub fn from_settings(settings: &EngineSettings) -> EnhancementResult<Self> {
        settings
            .validate()
            .map_err(|e| EnhancementError::configuration(e.to_string()))?;

        let source = Arc::new(FileLegalDocumentSource::new(settings.legal_data.data_dir.clone()));
        let mut builder = Self::builder(source).config(EngineConfig::from_settings(settings));

        if let Some(base_url) = settings
            .reasoning
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
        {
            let client = HttpClient::new(settings.reasoning.timeout_ms)?;
            builder = builder.reasoning(Arc::new(HttpReasoningService::new(client, base_url)));
        }
        if settings.currency.enabled {
            builder = builder.currency(build_currency_provider(&settings.currency)?);
        }

        Ok(builder.build())
    }

    /// Returns the tuning.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Enhances one provider quote.
    ///
    /// The baseline comes from the deterministic calculator; deltas come
    /// from the reasoning service (two attempts) and fall back to the
    /// calculator.
    ///
    /// # Errors
    ///
    /// - `Domain(InvalidNormalizedQuote)` if the quote is unusable
    /// - `NoLegalProfile` if the country has no legal document
    /// - `Domain(InvalidEnhancedQuote)` if the result breaks an invariant
    pub async fn enhance_quote(
        &self,
        input: QuoteInput,
        request: &EmploymentRequest,
        quote_type: QuoteType,
    ) -> EnhancementResult<EnhancedQuote> {
        let key = Self::result_key(Mode::Standard, &input, request, quote_type)?;
        if let Some(hit) = self.cache.get(&key) {
            debug!(provider = %input.provider(), "enhanced quote cache hit");
            return Ok(hit);
        }

        let prepared = self.prepare(&input, request, quote_type).await?;
        let inclusions = self.extract(&prepared.quote);
        let baseline = self.deterministic_baseline(&prepared, quote_type);

        let context = DeltaContext {
            quote: &prepared.quote,
            inclusions: &inclusions,
            profile: &prepared.profile,
            baseline: &baseline,
            quote_type,
            contract_months: prepared.contract_months,
        };
        let outcome = self.deltas.compute(&context).await?;
        let fallback = self.deterministic.outcome(&baseline, &inclusions);

        let quote = self.finish(prepared, request, quote_type, &inclusions, outcome, fallback)?;
        self.cache.set(key, quote.clone());
        Ok(quote)
    }

    /// Enhances one provider quote using the shared baseline pre-pass.
    ///
    /// The baseline is resolved through the reasoning service with
    /// deterministic fallback, cached and de-duplicated across concurrent
    /// callers. It runs alongside inclusion extraction.
    ///
    /// # Errors
    ///
    /// Same as [`enhance_quote`](Self::enhance_quote).
    pub async fn enhance_quote_direct(
        &self,
        input: QuoteInput,
        request: &EmploymentRequest,
        quote_type: QuoteType,
    ) -> EnhancementResult<EnhancedQuote> {
        let key = Self::result_key(Mode::Direct, &input, request, quote_type)?;
        if let Some(hit) = self.cache.get(&key) {
            debug!(provider = %input.provider(), "enhanced quote cache hit");
            return Ok(hit);
        }

        let prepared = self.prepare(&input, request, quote_type).await?;
        let context = BaselineContext {
            profile: Arc::clone(&prepared.profile),
            base_salary: prepared.base_salary,
            currency: prepared.salary_currency.clone(),
            contract_months: prepared.contract_months,
            employment_type: request.employment_type,
            quote_type,
        };

        let (baseline, inclusions) = tokio::join!(self.baselines.resolve(context), async {
            self.extract(&prepared.quote)
        });
        let baseline = baseline?;

        let outcome = self.deterministic.outcome(&baseline, &inclusions);
        let fallback = self
            .deterministic
            .outcome(&self.deterministic_baseline(&prepared, quote_type), &inclusions);

        let quote = self.finish(prepared, request, quote_type, &inclusions, outcome, fallback)?;
        self.cache.set(key, quote.clone());
        Ok(quote)
    }

    /// Enhances every provider quote concurrently and compares the results.
    ///
    /// Keys of `provider_quotes` are provider names. A provider that fails
    /// (unknown name, unusable quote, missing legal data) is recorded in
    /// `errors` and does not affect the others. Totals are compared in the
    /// request currency.
    pub async fn enhance_all_providers(
        &self,
        provider_quotes: BTreeMap<String, Value>,
        request: &EmploymentRequest,
        quote_type: QuoteType,
    ) -> AllProvidersResult {
        let started = Instant::now();
        let requested = provider_quotes.len();
        let mut errors = BTreeMap::new();
        let mut tasks = Vec::with_capacity(requested);

        for (name, payload) in provider_quotes {
            match name.parse::<ProviderKind>() {
                Ok(provider) => tasks.push(async move {
                    let result = self
                        .enhance_quote_direct(QuoteInput::raw(provider, payload), request, quote_type)
                        .await;
                    (name, provider, result)
                }),
                Err(e) => {
                    let err = EnhancementError::from(DomainError::from(e));
                    warn!(provider = %name, error = %err, "skipping provider");
                    errors.insert(name, err.to_string());
                }
            }
        }

        let mut enhancements = BTreeMap::new();
        for (name, provider, result) in join_all(tasks).await {
            match result {
                Ok(quote) => {
                    enhancements.insert(provider, quote);
                }
                Err(e) => {
                    warn!(provider = %provider, error = %e, "provider enhancement failed");
                    errors.insert(name, e.to_string());
                }
            }
        }

        let comparison =
            ProviderComparison::build(&enhancements, &request.currency, self.currency.as_deref()).await;
        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            requested,
            succeeded = enhancements.len(),
            failed = errors.len(),
            cheapest = ?comparison.cheapest,
            processing_time_ms,
            "provider fan-out complete"
        );

        AllProvidersResult {
            enhancements,
            comparison,
            processing_time_ms,
            errors,
        }
    }

    /// Returns counters for every cache.
    #[must_use]
    pub fn cache_stats(&self) -> EngineCacheStats {
        let stats = self.cache.stats();
        EngineCacheStats {
            results: stats.results,
            extractions: stats.extractions,
            baselines: self.baselines.stats(),
            legal_profiles: self.profiles.cached_len(),
            legal_documents: self.legal_data.cached_len(),
        }
    }

    /// Empties every cache.
    pub fn clear_caches(&self) {
        self.cache.clear();
        self.baselines.clear();
        self.profiles.clear_cache();
        self.legal_data.clear_cache();
        info!("enhancement caches cleared");
    }

    fn result_key(
        mode: Mode,
        input: &QuoteInput,
        request: &EmploymentRequest,
        quote_type: QuoteType,
    ) -> EnhancementResult<String> {
        let input_json = serde_json::to_value(input)
            .map_err(|e| EnhancementError::internal(format!("quote input not serializable: {e}")))?;
        let keyed = json!({ "mode": mode.as_str(), "input": input_json });
        Ok(EnhancementCache::result_key(input.provider(), request, quote_type, &keyed))
    }

    async fn prepare(
        &self,
        input: &QuoteInput,
        request: &EmploymentRequest,
        quote_type: QuoteType,
    ) -> EnhancementResult<Prepared> {
        let quote = match input {
            QuoteInput::Raw(raw) => self.normalizer.normalize(raw.provider, &raw.payload),
            QuoteInput::Normalized(quote) => quote.clone(),
        };
        quote.validate()?;

        let contract_months = request.contract_months_or(self.config.default_contract_months);
        let profile = self
            .profiles
            .get_profile(request, contract_months, quote_type)
            .await?
            .ok_or_else(|| EnhancementError::no_legal_profile(request.country_code.trim()))?;

        let mut warnings = Vec::new();
        let (base_salary, salary_currency) = baseline_salary(&quote, request, &mut warnings);

        Ok(Prepared {
            quote,
            profile,
            contract_months,
            base_salary,
            salary_currency,
            warnings,
        })
    }

    fn extract(&self, quote: &NormalizedQuote) -> StandardizedBenefitData {
        let key = EnhancementCache::extraction_key(quote.provider(), quote.original_response());
        if let Some(hit) = self.cache.get_extraction(&key) {
            debug!(provider = %quote.provider(), "extraction cache hit");
            return hit;
        }
        let data = self.extractor.extract(quote.provider(), quote);
        self.cache.set_extraction(key, data.clone());
        data
    }

    fn deterministic_baseline(&self, prepared: &Prepared, quote_type: QuoteType) -> LegalBaseline {
        self.calculator.baseline(BaselineInput {
            requirements: &prepared.profile.requirements,
            base_salary: prepared.base_salary,
            currency: &prepared.salary_currency,
            contract_months: prepared.contract_months,
            quote_type,
        })
    }

    /// Merges, applies local office benefits and the statutory filter, then
    /// assembles and validates the quote.
    fn finish(
        &self,
        prepared: Prepared,
        request: &EmploymentRequest,
        quote_type: QuoteType,
        inclusions: &StandardizedBenefitData,
        outcome: DeltaOutcome,
        fallback: DeltaOutcome,
    ) -> EnhancementResult<EnhancedQuote> {
        let Prepared {
            quote, mut warnings, ..
        } = prepared;

        for warning in outcome.warnings.into_iter().chain(fallback.warnings) {
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }

        let mut records = merge_records(outcome.records, fallback.records);
        apply_local_office_benefits(&mut records, &mut warnings, request, &quote, quote_type);
        if quote_type.is_statutory_only() {
            records.retain(|kind, record| {
                !(kind.is_termination_provision() || (kind.is_allowance() && !record.is_mandatory))
            });
        }

        let overall_confidence = outcome
            .overall_confidence
            .unwrap_or_else(|| mean_confidence(&records, inclusions.extraction_confidence))
            .clamp(0.0, 1.0);

        let mut explanations: Vec<String> = records
            .values()
            .map(|r| format!("{}: {}", r.kind.label(), r.explanation))
            .collect();
        explanations.extend(outcome.recommendations);

        let overlap_analysis = outcome.overlap.or(fallback.overlap).unwrap_or_default();

        let enhanced = EnhancedQuote::assemble(EnhancedQuoteParts {
            provider: quote.provider(),
            base_quote: quote,
            quote_type,
            enhancements: records,
            overall_confidence,
            explanations,
            warnings,
            overlap_analysis,
        })?;

        info!(
            provider = %enhanced.provider(),
            quote_type = %quote_type,
            total_enhancement = %enhanced.total_enhancement(),
            final_total = %enhanced.final_total(),
            "quote enhanced"
        );
        Ok(enhanced)
    }
}

/// Picks the salary the baseline is computed on.
///
/// The request salary is used when it is in the quote currency. Otherwise
/// the quote's own base cost is preferred so that enhancements land in the
/// quote currency.
fn baseline_salary(
    quote: &NormalizedQuote,
    request: &EmploymentRequest,
    warnings: &mut Vec<String>,
) -> (Decimal, String) {
    let request_currency = request.currency.trim().to_uppercase();
    if request_currency == quote.currency() {
        return (request.base_salary, request_currency);
    }
    if quote.base_cost() > Decimal::ZERO {
        warnings.push(format!(
            "{} quoted in {} but salary given in {request_currency}; enhancements use the quoted base salary",
            quote.provider(),
            quote.currency()
        ));
        return (quote.base_cost(), quote.currency().to_string());
    }
    warnings.push(format!(
        "{} quoted in {} without a base salary; enhancements use the {request_currency} salary unconverted",
        quote.provider(),
        quote.currency()
    ));
    (request.base_salary, request_currency)
}

fn apply_local_office_benefits(
    records: &mut BTreeMap<EnhancementKind, EnhancementRecord>,
    warnings: &mut Vec<String>,
    request: &EmploymentRequest,
    quote: &NormalizedQuote,
    quote_type: QuoteType,
) {
    let Some(local) = &request.local_office_benefits else {
        return;
    };
    let total = local.monthly_total();
    if quote_type.is_statutory_only() || total <= Decimal::ZERO {
        return;
    }
    if !local.matches_currency(quote.currency()) {
        warn!(provider = %quote.provider(), "local office benefits skipped due to currency mismatch");
        warnings.push(format!(
            "local office benefits in {} skipped: quote is in {}",
            local.currency.trim().to_uppercase(),
            quote.currency()
        ));
        return;
    }

    let lines: Vec<String> = local
        .items()
        .iter()
        .map(|(label, amount)| format!("{label} {amount}"))
        .collect();
    let record = EnhancementRecord::missing(
        EnhancementKind::LocalOfficeBenefits,
        round_money(total),
        format!("local office benefits: {}", lines.join(", ")),
        1.0,
        EnhancementSource::LocalOffice,
    )
    .mandatory(false);
    records.insert(EnhancementKind::LocalOfficeBenefits, record);
}

#[allow(clippy::cast_precision_loss)]
fn mean_confidence(records: &BTreeMap<EnhancementKind, EnhancementRecord>, extraction: f64) -> f64 {
    let values: Vec<f64> = records
        .values()
        .map(|r| r.confidence)
        .chain(std::iter::once(extraction))
        .collect();
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entities::LocalOfficeBenefits;
    use crate::infrastructure::error::{IntegrationError, IntegrationResult};
    use crate::infrastructure::legal_data::InMemoryLegalDocumentSource;
    use crate::infrastructure::reasoning::{
        BaselineRequest, BaselineResponse, ConfidenceScores, EnhancementRequest, ReasoningEnhancement,
        ReasoningResponse,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn portugal() -> Value {
        json!({"results": [{"data": {
            "country_name": "Portugal",
            "termination": {
                "notice_period": "30 days",
                "severance_pay": "1 month of salary per year of service",
                "probation_period": "90 days"
            },
            "payroll": {"13th_salary": "Mandatory, paid in December"},
            "common_benefits": ["Transportation allowance of 50 EUR, optional"]
        }}]})
    }

    fn source() -> Arc<dyn LegalDocumentSource> {
        Arc::new(InMemoryLegalDocumentSource::new().with_document("PT", portugal()))
    }

    fn request() -> EmploymentRequest {
        EmploymentRequest::new("PT", dec("1000"), "EUR").with_contract_months(12)
    }

    fn deel() -> QuoteInput {
        QuoteInput::raw(
            ProviderKind::Deel,
            json!({
                "salary": "1000",
                "currency": "EUR",
                "country": "Portugal",
                "total_costs": "1400",
                "employer_costs": "300"
            }),
        )
    }

    #[derive(Debug, Default)]
    struct CountingReasoning {
        enhancement_calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ReasoningService for CountingReasoning {
        async fn compute_enhancements(&self, _: &EnhancementRequest) -> IntegrationResult<ReasoningResponse> {
            self.enhancement_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(IntegrationError::connection("reasoning unavailable"));
            }
            Ok(ReasoningResponse {
                enhancements: BTreeMap::from([(
                    "thirteenth_salary".to_string(),
                    ReasoningEnhancement {
                        monthly_amount: Some(dec("90")),
                        explanation: "13th salary not in quote".to_string(),
                        confidence: Some(0.9),
                        already_included: false,
                    },
                )]),
                confidence_scores: ConfidenceScores { overall: Some(0.85) },
                recommendations: vec!["confirm 13th salary schedule".to_string()],
                ..ReasoningResponse::default()
            })
        }

        async fn compute_baseline(&self, _: &BaselineRequest) -> IntegrationResult<BaselineResponse> {
            Err(IntegrationError::connection("reasoning unavailable"))
        }
    }

    #[tokio::test]
    async fn deterministic_enhancement_adds_thirteenth_salary() {
        let engine = EnhancementEngine::builder(source()).build();
        let quote = engine
            .enhance_quote(deel(), &request(), QuoteType::AllInclusive)
            .await
            .unwrap();

        let thirteenth = quote.enhancement(EnhancementKind::ThirteenthSalary).unwrap();
        assert_eq!(thirteenth.monthly_amount, dec("83.33"));
        assert!(thirteenth.is_mandatory);
        assert_eq!(
            quote.final_total(),
            round_money(quote.base_quote().monthly_total() + quote.total_enhancement())
        );
        assert!(quote.enhancement(EnhancementKind::TransportationAllowance).is_some());
    }

    #[tokio::test]
    async fn statutory_only_drops_termination_and_optional_allowances() {
        let engine = EnhancementEngine::builder(source()).build();
        let quote = engine
            .enhance_quote(deel(), &request(), QuoteType::StatutoryOnly)
            .await
            .unwrap();

        assert!(quote.enhancement(EnhancementKind::ThirteenthSalary).is_some());
        for kind in [
            EnhancementKind::SeveranceProvision,
            EnhancementKind::ProbationProvision,
            EnhancementKind::TerminationCosts,
            EnhancementKind::TransportationAllowance,
        ] {
            assert!(quote.enhancement(kind).is_none(), "{kind:?} should be dropped");
        }
    }

    #[tokio::test]
    async fn reasoning_deltas_win_when_positive() {
        let reasoning = Arc::new(CountingReasoning::default());
        let engine = EnhancementEngine::builder(source())
            .reasoning(reasoning.clone())
            .build();

        let quote = engine
            .enhance_quote(deel(), &request(), QuoteType::AllInclusive)
            .await
            .unwrap();

        let thirteenth = quote.enhancement(EnhancementKind::ThirteenthSalary).unwrap();
        assert_eq!(thirteenth.monthly_amount, dec("90"));
        assert_eq!(thirteenth.source, EnhancementSource::Reasoning);
        assert!((quote.overall_confidence() - 0.85).abs() < f64::EPSILON);
        assert!(quote.explanations().iter().any(|e| e.contains("13th salary schedule")));
        // Kinds the reasoning service left out still come from the calculator.
        let severance = quote.enhancement(EnhancementKind::SeveranceProvision).unwrap();
        assert_eq!(severance.source, EnhancementSource::Deterministic);
        assert_eq!(reasoning.enhancement_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_reasoning_is_retried_once_then_falls_back() {
        let reasoning = Arc::new(CountingReasoning {
            fail: true,
            ..CountingReasoning::default()
        });
        let engine = EnhancementEngine::builder(source())
            .reasoning(reasoning.clone())
            .build();

        let quote = engine
            .enhance_quote(deel(), &request(), QuoteType::AllInclusive)
            .await
            .unwrap();

        assert_eq!(reasoning.enhancement_calls.load(Ordering::SeqCst), 2);
        let thirteenth = quote.enhancement(EnhancementKind::ThirteenthSalary).unwrap();
        assert_eq!(thirteenth.source, EnhancementSource::Deterministic);
    }

    #[tokio::test]
    async fn unknown_country_is_no_legal_profile() {
        let engine = EnhancementEngine::builder(source()).build();
        let request = EmploymentRequest::new("ZZ", dec("1000"), "EUR");
        let err = engine
            .enhance_quote(deel(), &request, QuoteType::AllInclusive)
            .await
            .unwrap_err();
        assert!(err.is_no_legal_profile());
    }

    #[tokio::test]
    async fn invalid_quote_is_rejected_before_legal_lookup() {
        let engine = EnhancementEngine::builder(source()).build();
        let input = QuoteInput::raw(ProviderKind::Deel, json!({"currency": "EUR", "total_costs": "1400"}));
        let err = engine
            .enhance_quote(input, &request(), QuoteType::AllInclusive)
            .await
            .unwrap_err();
        assert!(matches!(err, EnhancementError::Domain(DomainError::InvalidNormalizedQuote(_))));
        assert_eq!(engine.cache_stats().legal_documents, 0);
    }

    #[tokio::test]
    async fn repeated_call_is_served_from_cache() {
        let engine = EnhancementEngine::builder(source()).build();
        let first = engine
            .enhance_quote(deel(), &request(), QuoteType::AllInclusive)
            .await
            .unwrap();
        let second = engine
            .enhance_quote(deel(), &request(), QuoteType::AllInclusive)
            .await
            .unwrap();

        assert_eq!(first, second);
        let stats = engine.cache_stats();
        assert_eq!(stats.results.hits, 1);
        assert_eq!(stats.results.entries, 1);

        engine.clear_caches();
        let stats = engine.cache_stats();
        assert_eq!(stats.results.entries, 0);
        assert_eq!(stats.legal_profiles, 0);
    }

    mod local_office {
        use super::*;

        fn benefits(currency: &str) -> LocalOfficeBenefits {
            LocalOfficeBenefits {
                currency: currency.to_string(),
                meal_voucher: Some(dec("120")),
                wifi: Some(dec("30")),
                ..LocalOfficeBenefits::default()
            }
        }

        #[tokio::test]
        async fn matching_currency_adds_record() {
            let engine = EnhancementEngine::builder(source()).build();
            let request = request().with_local_office_benefits(benefits("eur"));
            let quote = engine
                .enhance_quote(deel(), &request, QuoteType::AllInclusive)
                .await
                .unwrap();

            let record = quote.enhancement(EnhancementKind::LocalOfficeBenefits).unwrap();
            assert_eq!(record.monthly_amount, dec("150"));
            assert_eq!(record.source, EnhancementSource::LocalOffice);
        }

        #[tokio::test]
        async fn mismatched_currency_warns() {
            let engine = EnhancementEngine::builder(source()).build();
            let request = request().with_local_office_benefits(benefits("USD"));
            let quote = engine
                .enhance_quote(deel(), &request, QuoteType::AllInclusive)
                .await
                .unwrap();

            assert!(quote.enhancement(EnhancementKind::LocalOfficeBenefits).is_none());
            assert!(quote.warnings().iter().any(|w| w.contains("skipped")));
        }

        #[tokio::test]
        async fn statutory_only_ignores_them() {
            let engine = EnhancementEngine::builder(source()).build();
            let request = request().with_local_office_benefits(benefits("EUR"));
            let quote = engine
                .enhance_quote(deel(), &request, QuoteType::StatutoryOnly)
                .await
                .unwrap();

            assert!(quote.enhancement(EnhancementKind::LocalOfficeBenefits).is_none());
        }
    }

    mod direct {
        use super::*;

        #[tokio::test]
        async fn falls_back_to_deterministic_baseline() {
            let reasoning = Arc::new(CountingReasoning::default());
            let engine = EnhancementEngine::builder(source())
                .reasoning(reasoning.clone())
                .build();

            let quote = engine
                .enhance_quote_direct(deel(), &request(), QuoteType::AllInclusive)
                .await
                .unwrap();

            let thirteenth = quote.enhancement(EnhancementKind::ThirteenthSalary).unwrap();
            assert_eq!(thirteenth.monthly_amount, dec("83.33"));
            assert_eq!(reasoning.enhancement_calls.load(Ordering::SeqCst), 0);
            assert_eq!(engine.cache_stats().baselines.entries, 1);
        }

        #[tokio::test]
        async fn fan_out_records_unknown_providers() {
            let engine = EnhancementEngine::builder(source()).build();
            let quotes = BTreeMap::from([
                ("deel".to_string(), deel().provider_payload().clone()),
                ("acme".to_string(), json!({})),
            ]);

            let result = engine
                .enhance_all_providers(quotes, &request(), QuoteType::AllInclusive)
                .await;

            assert!(result.enhancements.contains_key(&ProviderKind::Deel));
            assert!(result.errors["acme"].contains("unsupported provider"));
            assert!(!result.is_complete());
            assert_eq!(result.comparison.cheapest, Some(ProviderKind::Deel));
        }
    }
}
