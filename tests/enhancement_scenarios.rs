//! End-to-end enhancement scenarios against the file-backed legal fixtures.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use eor_quote_engine::application::services::{EnhancementEngine, EngineConfig};
use eor_quote_engine::config::{EngineSettings, LoadOptions};
use eor_quote_engine::domain::entities::{EmploymentRequest, EnhancementSource, QuoteInput};
use eor_quote_engine::domain::value_objects::{EnhancementKind, ProviderKind, QuoteType};
use eor_quote_engine::infrastructure::reasoning::{
    BaselineRequest, BaselineResponse, EnhancementRequest, ReasoningBaselineItem, ReasoningResponse,
};
use eor_quote_engine::infrastructure::{
    FileLegalDocumentSource, IntegrationError, IntegrationResult, ReasoningService,
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/legal")
}

fn engine() -> EnhancementEngine {
    EnhancementEngine::builder(Arc::new(FileLegalDocumentSource::new(fixtures()))).build()
}

fn portugal_hire() -> EmploymentRequest {
    EmploymentRequest::new("PT", dec("1000"), "EUR")
        .with_country_name("Portugal")
        .with_contract_months(12)
}

fn deel_payload() -> Value {
    json!({
        "salary": "1,000.00",
        "currency": "EUR",
        "country": "Portugal",
        "total_costs": "1,400.00",
        "deel_fee": "99.00",
        "employer_costs": "237.50",
        "costs": [{"name": "Social Security", "amount": "237.50"}]
    })
}

fn remote_payload() -> Value {
    json!({
        "gross_monthly_salary": 1000,
        "currency": {"code": "EUR"},
        "country": {"name": "Portugal"},
        "total_monthly_cost": 1350,
        "monthly_contributions": 237.5,
        "monthly_contributions_breakdown": [{"name": "Social Security", "amount": 237.5}]
    })
}

fn oyster_payload() -> Value {
    json!({
        "salary": 1000,
        "currency": "EUR",
        "country": "Portugal",
        "total_cost": 1450,
        "contributions": {"total": 237.5, "items": [{"name": "Social Security", "amount": 237.5}]}
    })
}

#[tokio::test]
async fn thirteenth_salary_is_added_when_provider_omits_it() {
    let engine = engine();
    let quote = engine
        .enhance_quote(
            QuoteInput::raw(ProviderKind::Remote, remote_payload()),
            &portugal_hire(),
            QuoteType::AllInclusive,
        )
        .await
        .unwrap();

    let thirteenth = quote.enhancement(EnhancementKind::ThirteenthSalary).unwrap();
    assert_eq!(thirteenth.monthly_amount, dec("83.33"));
    assert!(!thirteenth.is_already_included);
    assert!(quote.total_enhancement() >= dec("83.33"));
    assert_eq!(quote.final_total(), dec("1350") + quote.total_enhancement());

    // Social security is already in the quote.
    let contributions = quote.enhancement(EnhancementKind::EmployerContributions).unwrap();
    assert!(contributions.is_already_included);
    assert_eq!(contributions.contribution(), Decimal::ZERO);
}

#[tokio::test]
async fn statutory_only_excludes_optional_transport_allowance() {
    let engine = engine();
    let input = QuoteInput::raw(ProviderKind::Remote, remote_payload());

    let all_inclusive = engine
        .enhance_quote(input.clone(), &portugal_hire(), QuoteType::AllInclusive)
        .await
        .unwrap();
    let statutory = engine
        .enhance_quote(input, &portugal_hire(), QuoteType::StatutoryOnly)
        .await
        .unwrap();

    let transport = all_inclusive
        .enhancement(EnhancementKind::TransportationAllowance)
        .unwrap();
    assert_eq!(transport.monthly_amount, dec("50"));
    assert!(!transport.is_mandatory);

    assert!(statutory.enhancement(EnhancementKind::TransportationAllowance).is_none());
    for kind in [
        EnhancementKind::SeveranceProvision,
        EnhancementKind::ProbationProvision,
        EnhancementKind::TerminationCosts,
    ] {
        assert!(statutory.enhancement(kind).is_none());
    }
    assert_eq!(
        statutory.enhancement(EnhancementKind::ThirteenthSalary).unwrap().monthly_amount,
        dec("83.33")
    );
    assert!(statutory.total_enhancement() < all_inclusive.total_enhancement());
}

#[tokio::test]
async fn malformed_provider_does_not_abort_the_fan_out() {
    let engine = engine();
    let mut broken = remote_payload();
    broken.as_object_mut().unwrap().remove("country");

    let quotes = BTreeMap::from([
        ("deel".to_string(), deel_payload()),
        ("remote".to_string(), broken),
        ("oyster".to_string(), oyster_payload()),
    ]);

    let result = engine
        .enhance_all_providers(quotes, &portugal_hire(), QuoteType::AllInclusive)
        .await;

    assert_eq!(result.enhancements.len(), 2);
    assert!(result.enhancements.contains_key(&ProviderKind::Deel));
    assert!(result.enhancements.contains_key(&ProviderKind::Oyster));
    assert!(result.errors["remote"].contains("no country"));

    let comparison = &result.comparison;
    assert_eq!(comparison.comparison_currency, "EUR");
    assert_eq!(comparison.ranking.len(), 2);
    assert_eq!(comparison.cheapest, Some(ProviderKind::Deel));
    assert_eq!(comparison.most_expensive, Some(ProviderKind::Oyster));
    assert!(comparison.position(ProviderKind::Remote).is_none());
}

#[tokio::test]
async fn unknown_country_fails_every_provider_softly() {
    let engine = engine();
    let request = EmploymentRequest::new("ZZ", dec("1000"), "EUR");
    let quotes = BTreeMap::from([("deel".to_string(), deel_payload())]);

    let result = engine
        .enhance_all_providers(quotes, &request, QuoteType::AllInclusive)
        .await;

    assert!(result.enhancements.is_empty());
    assert!(result.errors["deel"].contains("ZZ"));
    assert!(result.comparison.cheapest.is_none());
}

#[tokio::test]
async fn repeated_call_is_a_cache_hit_with_identical_output() {
    let engine = engine();
    let input = QuoteInput::raw(ProviderKind::Deel, deel_payload());

    let first = engine
        .enhance_quote(input.clone(), &portugal_hire(), QuoteType::AllInclusive)
        .await
        .unwrap();
    let second = engine
        .enhance_quote(input, &portugal_hire(), QuoteType::AllInclusive)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    let stats = engine.cache_stats();
    assert_eq!(stats.results.hits, 1);
    assert_eq!(stats.results.misses, 1);
}

#[tokio::test]
async fn brazil_vacation_bonus_and_germany_without_thirteenth() {
    let engine = engine();
    let brazil = EmploymentRequest::new("BR", dec("6000"), "BRL");
    let quote = engine
        .enhance_quote(
            QuoteInput::raw(
                ProviderKind::Rivermate,
                json!({"salary": 6000, "currency": "BRL", "country": "Brazil", "total_monthly_cost": 9000}),
            ),
            &brazil,
            QuoteType::AllInclusive,
        )
        .await
        .unwrap();
    assert_eq!(
        quote.enhancement(EnhancementKind::ThirteenthSalary).unwrap().monthly_amount,
        dec("500")
    );
    assert_eq!(
        quote.enhancement(EnhancementKind::VacationBonus).unwrap().monthly_amount,
        dec("165")
    );

    let germany = EmploymentRequest::new("de", dec("5000"), "EUR");
    let quote = engine
        .enhance_quote(
            QuoteInput::raw(
                ProviderKind::Playroll,
                json!({"salary": 5000, "currency": "EUR", "country": "Germany", "total_employment_cost": 6200}),
            ),
            &germany,
            QuoteType::StatutoryOnly,
        )
        .await
        .unwrap();
    assert!(quote.enhancement(EnhancementKind::ThirteenthSalary).is_none());
    assert_eq!(
        quote.final_total(),
        quote.base_quote().monthly_total() + quote.total_enhancement()
    );
}

/// Reasoning service whose baseline answer arrives after a delay.
#[derive(Debug, Default)]
struct SlowBaselineReasoning {
    baseline_calls: AtomicUsize,
    enhancement_calls: AtomicUsize,
}

#[async_trait]
impl ReasoningService for SlowBaselineReasoning {
    async fn compute_enhancements(&self, _: &EnhancementRequest) -> IntegrationResult<ReasoningResponse> {
        self.enhancement_calls.fetch_add(1, Ordering::SeqCst);
        Err(IntegrationError::connection("not used by the direct path"))
    }

    async fn compute_baseline(&self, _: &BaselineRequest) -> IntegrationResult<BaselineResponse> {
        self.baseline_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(BaselineResponse {
            items: BTreeMap::from([(
                "thirteenth_salary".to_string(),
                ReasoningBaselineItem {
                    monthly_amount: Some(dec("100")),
                    mandatory: true,
                    explanation: "13th salary, paid in December".to_string(),
                    confidence: Some(0.9),
                },
            )]),
            warnings: Vec::new(),
        })
    }
}

#[tokio::test]
async fn concurrent_direct_calls_share_one_baseline_request() {
    let reasoning = Arc::new(SlowBaselineReasoning::default());
    let engine = EnhancementEngine::builder(Arc::new(FileLegalDocumentSource::new(fixtures())))
        .reasoning(reasoning.clone())
        .build();
    let request = portugal_hire();

    let (deel, oyster) = tokio::join!(
        engine.enhance_quote_direct(
            QuoteInput::raw(ProviderKind::Deel, deel_payload()),
            &request,
            QuoteType::AllInclusive,
        ),
        engine.enhance_quote_direct(
            QuoteInput::raw(ProviderKind::Oyster, oyster_payload()),
            &request,
            QuoteType::AllInclusive,
        ),
    );
    let (deel, oyster) = (deel.unwrap(), oyster.unwrap());

    assert_eq!(reasoning.baseline_calls.load(Ordering::SeqCst), 1);
    assert_eq!(reasoning.enhancement_calls.load(Ordering::SeqCst), 0);
    for quote in [&deel, &oyster] {
        let thirteenth = quote.enhancement(EnhancementKind::ThirteenthSalary).unwrap();
        assert_eq!(thirteenth.monthly_amount, dec("100"));
        assert_eq!(thirteenth.source, EnhancementSource::Reasoning);
    }
}

#[tokio::test]
async fn engine_from_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(
        &path,
        format!(
            "[legal_data]\ndata_dir = {:?}\n\n[currency]\nenabled = false\n\n[cache]\nmax_entries = 10\n",
            fixtures().display().to_string()
        ),
    )
    .unwrap();

    let settings = EngineSettings::load(LoadOptions {
        config_path: Some(path),
        require_file: true,
        skip_dotenv: true,
        env_overrides: Some(HashMap::new()),
    })
    .unwrap();
    let engine = EnhancementEngine::from_settings(&settings).unwrap();

    assert_eq!(engine.config(), &EngineConfig::from_settings(&settings));
    assert_eq!(engine.config().max_cache_entries, 10);

    let quote = engine
        .enhance_quote(
            QuoteInput::raw(ProviderKind::Deel, deel_payload()),
            &portugal_hire(),
            QuoteType::AllInclusive,
        )
        .await
        .unwrap();
    assert_eq!(quote.provider(), ProviderKind::Deel);
}
