//! # Legal Profile Service
//!
//! Builds and caches [`LegalProfile`]s.
//!
//! A profile is keyed by `(country, employment type, contract months,
//! quote type)` and built once from the country's legal document. Profiles
//! are immutable; a cache entry lives until [`LegalProfileService::clear_cache`].

use crate::application::error::EnhancementResult;
use crate::domain::entities::{EmploymentRequest, LegalProfile, LegalProfileKey, LegalRequirements};
use crate::domain::services::{DeterministicCalculator, extract_legal_requirements};
use crate::domain::value_objects::{EnhancementKind, QuoteType};
use crate::infrastructure::cache::content_hash;
use crate::infrastructure::legal_data::{LegalDataService, canonical_country_code};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds legal profiles from legal documents.
#[derive(Debug)]
pub struct LegalProfileService {
    legal_data: Arc<LegalDataService>,
    calculator: DeterministicCalculator,
    profiles: DashMap<LegalProfileKey, Arc<LegalProfile>>,
}

impl LegalProfileService {
    /// Creates a service with an empty cache.
    #[must_use]
    pub fn new(legal_data: Arc<LegalDataService>, calculator: DeterministicCalculator) -> Self {
        Self {
            legal_data,
            calculator,
            profiles: DashMap::new(),
        }
    }

    /// Returns the profile for `request`, or `None` if the country has no
    /// legal document.
    ///
    /// # Errors
    ///
    /// Returns `EnhancementError::LegalData` if the document is malformed.
    pub async fn get_profile(
        &self,
        request: &EmploymentRequest,
        contract_months: u32,
        quote_type: QuoteType,
    ) -> EnhancementResult<Option<Arc<LegalProfile>>> {
        let key = LegalProfileKey {
            country_code: canonical_country_code(&request.country_code),
            employment_type: request.employment_type,
            contract_months: contract_months.max(1),
            quote_type,
        };

        if let Some(profile) = self.profiles.get(&key) {
            debug!(profile = %key, "legal profile cache hit");
            return Ok(Some(Arc::clone(profile.value())));
        }

        let Some(document) = self.legal_data.get_country_data(&key.country_code).await? else {
            return Ok(None);
        };

        let requirements = extract_legal_requirements(&document);
        let country_name = request
            .country_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| document.country_name().map(str::to_string))
            .unwrap_or_else(|| key.country_code.clone());

        let profile = Arc::new(LegalProfile {
            id: profile_id(&key, &requirements),
            summary: summarize(&requirements, quote_type),
            formulas: self.calculator.formulas(&requirements, key.contract_months, quote_type),
            country_code: key.country_code.clone(),
            country_name,
            quote_type,
            employment_type: key.employment_type,
            contract_months: key.contract_months,
            requirements,
        });

        info!(profile = %key, id = %profile.id, "legal profile built");
        let entry = self.profiles.entry(key).or_insert(profile);
        Ok(Some(Arc::clone(entry.value())))
    }

    /// Returns the number of cached profiles.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.profiles.len()
    }

    /// Drops every cached profile.
    pub fn clear_cache(&self) {
        self.profiles.clear();
    }
}

fn profile_id(key: &LegalProfileKey, requirements: &LegalRequirements) -> String {
    content_hash(&json!({
        "countryCode": key.country_code,
        "employmentType": key.employment_type.as_str(),
        "contractMonths": key.contract_months,
        "quoteType": key.quote_type.as_str(),
        "requirements": serde_json::to_value(requirements).unwrap_or_default(),
    }))
}

/// Renders the recognized requirements as readable lines.
fn summarize(requirements: &LegalRequirements, quote_type: QuoteType) -> String {
    let mut lines = Vec::new();
    let salaries = &requirements.mandatory_salaries;

    if salaries.has_13th_salary {
        lines.push(format!(
            "13th salary: mandatory ({} × monthly salary)",
            salaries.monthly_multiplier_13th.unwrap_or(Decimal::ONE)
        ));
    }
    if salaries.has_14th_salary {
        lines.push(format!(
            "14th salary: mandatory ({} × monthly salary)",
            salaries.monthly_multiplier_14th.unwrap_or(Decimal::ONE)
        ));
    }
    if let Some(pct) = requirements.bonuses.vacation_bonus_percentage {
        lines.push(format!("Vacation bonus: {pct}% of annual salary"));
    }

    let employer = requirements.contributions.total_employer_rate();
    if employer > Decimal::ZERO {
        lines.push(format!(
            "Employer contributions: {employer}% across {} item(s)",
            requirements.contributions.employer_rates.len()
        ));
    }
    let employee = requirements.contributions.total_employee_rate();
    if employee > Decimal::ZERO {
        lines.push(format!("Employee contributions: {employee}% (withheld from salary)"));
    }

    for kind in [
        EnhancementKind::MealVouchers,
        EnhancementKind::TransportationAllowance,
        EnhancementKind::RemoteWorkAllowance,
    ] {
        if let Some((amount, mandatory)) = requirements.allowances.for_kind(kind) {
            let status = if mandatory { "mandatory" } else { "optional" };
            lines.push(format!("{}: {amount}/month ({status})", kind.label()));
        }
    }

    let terms = &requirements.termination_costs;
    if terms.notice_period_days > 0 {
        lines.push(format!("Notice period: {} days", terms.notice_period_days));
    }
    if !quote_type.is_statutory_only() {
        if terms.severance_months > Decimal::ZERO {
            lines.push(format!("Severance: {} months of salary", terms.severance_months));
        }
        if terms.probation_period_days > 0 {
            lines.push(format!("Probation period: {} days", terms.probation_period_days));
        }
    }

    if lines.is_empty() {
        "No mandatory items recognized".to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::value_objects::EmploymentType;
    use crate::infrastructure::legal_data::InMemoryLegalDocumentSource;
    use serde_json::Value;

    fn portugal() -> Value {
        json!({"results": [{"data": {
            "country_name": "Portugal",
            "payroll": {"13th_salary": "Mandatory 13th salary paid in December, required by law"},
            "termination": {
                "notice_period": "30 days minimum",
                "severance_pay": "12 days per year of service",
                "probation_period": "90 days"
            }
        }}]})
    }

    fn service() -> LegalProfileService {
        let source = InMemoryLegalDocumentSource::new().with_document("PT", portugal());
        LegalProfileService::new(
            Arc::new(LegalDataService::new(Arc::new(source))),
            DeterministicCalculator::default(),
        )
    }

    fn request() -> EmploymentRequest {
        EmploymentRequest::new("pt", Decimal::new(1000, 0), "EUR")
    }

    #[tokio::test]
    async fn builds_and_caches_profile() {
        let service = service();
        let profile = service
            .get_profile(&request(), 12, QuoteType::AllInclusive)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(profile.country_code, "PT");
        assert_eq!(profile.country_name, "Portugal");
        assert!(profile.requirements.mandatory_salaries.has_13th_salary);
        assert!(profile.summary.contains("13th salary"));
        assert!(profile.formulas.contains("thirteenth_salary_monthly"));
        assert_eq!(profile.id.len(), 64);

        let again = service
            .get_profile(&request(), 12, QuoteType::AllInclusive)
            .await
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&profile, &again));
        assert_eq!(service.cached_len(), 1);
    }

    #[tokio::test]
    async fn key_separates_quote_type_and_contract() {
        let service = service();
        let all = service.get_profile(&request(), 12, QuoteType::AllInclusive).await.unwrap().unwrap();
        let stat = service.get_profile(&request(), 12, QuoteType::StatutoryOnly).await.unwrap().unwrap();
        let short = service.get_profile(&request(), 6, QuoteType::AllInclusive).await.unwrap().unwrap();

        assert_ne!(all.id, stat.id);
        assert_ne!(all.id, short.id);
        assert!(!stat.summary.contains("Probation"));
        assert!(!stat.formulas.contains("severance"));
        assert_eq!(service.cached_len(), 3);
    }

    #[tokio::test]
    async fn request_country_name_wins() {
        let service = service();
        let request = request()
            .with_country_name("República Portuguesa")
            .with_employment_type(EmploymentType::PartTime);
        let profile = service.get_profile(&request, 12, QuoteType::AllInclusive).await.unwrap().unwrap();
        assert_eq!(profile.country_name, "República Portuguesa");
        assert_eq!(profile.employment_type, EmploymentType::PartTime);
    }

    #[tokio::test]
    async fn unknown_country_has_no_profile() {
        let service = service();
        let request = EmploymentRequest::new("XX", Decimal::new(1000, 0), "EUR");
        assert!(service.get_profile(&request, 12, QuoteType::AllInclusive).await.unwrap().is_none());
    }

    #[test]
    fn empty_requirements_summary() {
        let summary = summarize(&LegalRequirements::default(), QuoteType::AllInclusive);
        assert_eq!(summary, "No mandatory items recognized");
    }
}
