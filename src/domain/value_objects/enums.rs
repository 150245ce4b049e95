//! # Domain Enums
//!
//! Enumeration types for domain concepts.
//!
//! - [`ProviderKind`] - Supported EOR providers
//! - [`QuoteType`] - Enhancement mode (all-inclusive or statutory-only)
//! - [`EmploymentType`] - Contract type requested by the caller
//! - [`Frequency`] - Payment frequency of a cost item
//! - [`BenefitKey`] - Fixed taxonomy for provider line items
//! - [`EnhancementKind`] - Kinds of statutory enhancement records
//!
//! All enums implement `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`,
//! `Display`, `FromStr`, and Serde traits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::money::MONTHS_PER_YEAR;

/// Employer-of-Record providers with a known quote shape.
///
/// # Examples
///
/// ```
/// use eor_quote_engine::domain::value_objects::enums::ProviderKind;
///
/// let kind: ProviderKind = "Deel".parse().unwrap();
/// assert_eq!(kind, ProviderKind::Deel);
/// assert!("acme".parse::<ProviderKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Deel (string-formatted money fields).
    Deel,
    /// Remote.
    Remote,
    /// Rivermate.
    Rivermate,
    /// Oyster.
    Oyster,
    /// Rippling.
    Rippling,
    /// Skuad (string-formatted money fields).
    Skuad,
    /// Playroll.
    Playroll,
}

impl ProviderKind {
    /// All supported providers.
    pub const ALL: [Self; 7] = [
        Self::Deel,
        Self::Remote,
        Self::Rivermate,
        Self::Oyster,
        Self::Rippling,
        Self::Skuad,
        Self::Playroll,
    ];

    /// Returns the lowercase provider identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deel => "deel",
            Self::Remote => "remote",
            Self::Rivermate => "rivermate",
            Self::Oyster => "oyster",
            Self::Rippling => "rippling",
            Self::Skuad => "skuad",
            Self::Playroll => "playroll",
        }
    }

    /// Returns true if this provider folds miscellaneous employer costs into
    /// a single statutory bucket.
    #[inline]
    #[must_use]
    pub const fn folds_misc_employer_costs(self) -> bool {
        matches!(self, Self::Oyster | Self::Rippling | Self::Playroll)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "deel" => Ok(Self::Deel),
            "remote" | "remotecom" => Ok(Self::Remote),
            "rivermate" => Ok(Self::Rivermate),
            "oyster" | "oysterhr" => Ok(Self::Oyster),
            "rippling" => Ok(Self::Rippling),
            "skuad" => Ok(Self::Skuad),
            "playroll" => Ok(Self::Playroll),
            _ => Err(ParseEnumError::InvalidValue("ProviderKind", s.to_string())),
        }
    }
}

/// Enhancement mode.
///
/// `AllInclusive` layers every legally defined cost (including optional
/// allowances and termination provisions) on top of the base quote.
/// `StatutoryOnly` reports only legally unavoidable monthly costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteType {
    /// Every legally defined cost.
    #[default]
    AllInclusive,
    /// Only legally unavoidable monthly costs.
    StatutoryOnly,
}

impl QuoteType {
    /// Returns the kebab-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllInclusive => "all-inclusive",
            Self::StatutoryOnly => "statutory-only",
        }
    }

    /// Returns true for statutory-only mode.
    #[inline]
    #[must_use]
    pub const fn is_statutory_only(self) -> bool {
        matches!(self, Self::StatutoryOnly)
    }
}

impl fmt::Display for QuoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "all-inclusive" | "allinclusive" => Ok(Self::AllInclusive),
            "statutory-only" | "statutoryonly" | "statutory" => Ok(Self::StatutoryOnly),
            _ => Err(ParseEnumError::InvalidValue("QuoteType", s.to_string())),
        }
    }
}

/// Contract type requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentType {
    /// Permanent full-time employment.
    #[default]
    FullTime,
    /// Permanent part-time employment.
    PartTime,
    /// Fixed-term contract.
    FixedTerm,
}

impl EmploymentType {
    /// Returns the kebab-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FullTime => "full-time",
            Self::PartTime => "part-time",
            Self::FixedTerm => "fixed-term",
        }
    }
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmploymentType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "full-time" | "fulltime" => Ok(Self::FullTime),
            "part-time" | "parttime" => Ok(Self::PartTime),
            "fixed-term" | "fixedterm" | "contract" => Ok(Self::FixedTerm),
            _ => Err(ParseEnumError::InvalidValue("EmploymentType", s.to_string())),
        }
    }
}

/// Payment frequency of a cost item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Paid every month.
    #[default]
    Monthly,
    /// Paid once a year.
    Yearly,
}

impl Frequency {
    /// Converts an amount at this frequency to its monthly equivalent.
    ///
    /// # Examples
    ///
    /// ```
    /// use eor_quote_engine::domain::value_objects::enums::Frequency;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Frequency::Yearly.to_monthly(Decimal::from(1200)), Decimal::from(100));
    /// ```
    #[must_use]
    pub fn to_monthly(self, amount: Decimal) -> Decimal {
        match self {
            Self::Monthly => amount,
            Self::Yearly => amount / MONTHS_PER_YEAR,
        }
    }

    /// Parses a loosely formatted frequency label, defaulting to monthly.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if lower.contains("year") || lower.contains("annual") {
            Self::Yearly
        } else {
            Self::Monthly
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
        }
    }
}

/// Fixed taxonomy that provider line items are classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BenefitKey {
    /// 13th-month salary.
    ThirteenthSalary,
    /// 14th-month salary.
    FourteenthSalary,
    /// Vacation or holiday bonus.
    VacationBonus,
    /// Transportation allowance.
    Transportation,
    /// Remote-work allowance.
    RemoteWork,
    /// Meal vouchers.
    MealVouchers,
    /// Social security and other employer contributions.
    SocialSecurity,
    /// Health insurance.
    HealthInsurance,
}

impl BenefitKey {
    /// Returns the camelCase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThirteenthSalary => "thirteenthSalary",
            Self::FourteenthSalary => "fourteenthSalary",
            Self::VacationBonus => "vacationBonus",
            Self::Transportation => "transportation",
            Self::RemoteWork => "remoteWork",
            Self::MealVouchers => "mealVouchers",
            Self::SocialSecurity => "socialSecurity",
            Self::HealthInsurance => "healthInsurance",
        }
    }

    /// Returns true if finding this category counts as finding a mandatory
    /// item for confidence scoring.
    #[inline]
    #[must_use]
    pub const fn is_mandatory_category(self) -> bool {
        matches!(
            self,
            Self::ThirteenthSalary | Self::FourteenthSalary | Self::SocialSecurity
        )
    }
}

impl fmt::Display for BenefitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BenefitKey {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-'], "").as_str() {
            "thirteenthsalary" => Ok(Self::ThirteenthSalary),
            "fourteenthsalary" => Ok(Self::FourteenthSalary),
            "vacationbonus" => Ok(Self::VacationBonus),
            "transportation" => Ok(Self::Transportation),
            "remotework" => Ok(Self::RemoteWork),
            "mealvouchers" => Ok(Self::MealVouchers),
            "socialsecurity" => Ok(Self::SocialSecurity),
            "healthinsurance" => Ok(Self::HealthInsurance),
            _ => Err(ParseEnumError::InvalidValue("BenefitKey", s.to_string())),
        }
    }
}

/// Kinds of enhancement records attached to an enhanced quote.
///
/// Serialized in camelCase (`thirteenthSalary`, `severanceProvision`, ...).
/// The reasoning service speaks snake_case; see
/// [`EnhancementKind::from_reasoning_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnhancementKind {
    /// 13th-month salary provision.
    ThirteenthSalary,
    /// 14th-month salary provision.
    FourteenthSalary,
    /// Vacation bonus provision.
    VacationBonus,
    /// Transportation allowance.
    TransportationAllowance,
    /// Remote-work allowance.
    RemoteWorkAllowance,
    /// Meal vouchers.
    MealVouchers,
    /// Employer social contributions.
    EmployerContributions,
    /// Severance liability spread over the contract.
    SeveranceProvision,
    /// Probation-period liability spread over the contract.
    ProbationProvision,
    /// Other termination costs (notice period and similar).
    TerminationCosts,
    /// Caller-supplied local office benefits.
    LocalOfficeBenefits,
}

impl EnhancementKind {
    /// All enhancement kinds, in presentation order.
    pub const ALL: [Self; 11] = [
        Self::ThirteenthSalary,
        Self::FourteenthSalary,
        Self::VacationBonus,
        Self::TransportationAllowance,
        Self::RemoteWorkAllowance,
        Self::MealVouchers,
        Self::EmployerContributions,
        Self::SeveranceProvision,
        Self::ProbationProvision,
        Self::TerminationCosts,
        Self::LocalOfficeBenefits,
    ];

    /// Returns the camelCase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThirteenthSalary => "thirteenthSalary",
            Self::FourteenthSalary => "fourteenthSalary",
            Self::VacationBonus => "vacationBonus",
            Self::TransportationAllowance => "transportationAllowance",
            Self::RemoteWorkAllowance => "remoteWorkAllowance",
            Self::MealVouchers => "mealVouchers",
            Self::EmployerContributions => "employerContributions",
            Self::SeveranceProvision => "severanceProvision",
            Self::ProbationProvision => "probationProvision",
            Self::TerminationCosts => "terminationCosts",
            Self::LocalOfficeBenefits => "localOfficeBenefits",
        }
    }

    /// Returns the snake_case key used by the reasoning service.
    #[must_use]
    pub const fn reasoning_key(self) -> &'static str {
        match self {
            Self::ThirteenthSalary => "thirteenth_salary",
            Self::FourteenthSalary => "fourteenth_salary",
            Self::VacationBonus => "vacation_bonus",
            Self::TransportationAllowance => "transportation_allowance",
            Self::RemoteWorkAllowance => "remote_work_allowance",
            Self::MealVouchers => "meal_vouchers",
            Self::EmployerContributions => "employer_contributions",
            Self::SeveranceProvision => "severance_provision",
            Self::ProbationProvision => "probation_provision",
            Self::TerminationCosts => "termination_costs",
            Self::LocalOfficeBenefits => "local_office_benefits",
        }
    }

    /// Resolves a reasoning-service key (snake_case or camelCase).
    ///
    /// A few short aliases the service is known to emit are accepted too.
    #[must_use]
    pub fn from_reasoning_key(key: &str) -> Option<Self> {
        let normalized = key.trim().to_lowercase().replace(['_', '-', ' '], "");
        match normalized.as_str() {
            "thirteenthsalary" | "13thsalary" => Some(Self::ThirteenthSalary),
            "fourteenthsalary" | "14thsalary" => Some(Self::FourteenthSalary),
            "vacationbonus" | "holidaybonus" => Some(Self::VacationBonus),
            "transportationallowance" | "transportation" => Some(Self::TransportationAllowance),
            "remoteworkallowance" | "remotework" => Some(Self::RemoteWorkAllowance),
            "mealvouchers" | "mealvoucher" => Some(Self::MealVouchers),
            "employercontributions" | "socialsecurity" => Some(Self::EmployerContributions),
            "severanceprovision" | "severance" => Some(Self::SeveranceProvision),
            "probationprovision" | "probation" => Some(Self::ProbationProvision),
            "terminationcosts" | "noticeperiod" => Some(Self::TerminationCosts),
            "localofficebenefits" => Some(Self::LocalOfficeBenefits),
            _ => None,
        }
    }

    /// Returns true for contract-termination contingencies.
    ///
    /// These never appear in statutory-only quotes.
    #[inline]
    #[must_use]
    pub const fn is_termination_provision(self) -> bool {
        matches!(
            self,
            Self::SeveranceProvision | Self::ProbationProvision | Self::TerminationCosts
        )
    }

    /// Returns true for allowance-type kinds.
    #[inline]
    #[must_use]
    pub const fn is_allowance(self) -> bool {
        matches!(
            self,
            Self::TransportationAllowance
                | Self::RemoteWorkAllowance
                | Self::MealVouchers
                | Self::LocalOfficeBenefits
        )
    }

    /// Returns the provider benefit category that covers this kind, if any.
    #[must_use]
    pub const fn covered_by(self) -> Option<BenefitKey> {
        match self {
            Self::ThirteenthSalary => Some(BenefitKey::ThirteenthSalary),
            Self::FourteenthSalary => Some(BenefitKey::FourteenthSalary),
            Self::VacationBonus => Some(BenefitKey::VacationBonus),
            Self::TransportationAllowance => Some(BenefitKey::Transportation),
            Self::RemoteWorkAllowance => Some(BenefitKey::RemoteWork),
            Self::MealVouchers => Some(BenefitKey::MealVouchers),
            Self::EmployerContributions => Some(BenefitKey::SocialSecurity),
            Self::SeveranceProvision
            | Self::ProbationProvision
            | Self::TerminationCosts
            | Self::LocalOfficeBenefits => None,
        }
    }

    /// Returns a human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ThirteenthSalary => "13th salary",
            Self::FourteenthSalary => "14th salary",
            Self::VacationBonus => "Vacation bonus",
            Self::TransportationAllowance => "Transportation allowance",
            Self::RemoteWorkAllowance => "Remote work allowance",
            Self::MealVouchers => "Meal vouchers",
            Self::EmployerContributions => "Employer contributions",
            Self::SeveranceProvision => "Severance provision",
            Self::ProbationProvision => "Probation provision",
            Self::TerminationCosts => "Termination costs",
            Self::LocalOfficeBenefits => "Local office benefits",
        }
    }
}

impl fmt::Display for EnhancementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnhancementKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_reasoning_key(s)
            .ok_or_else(|| ParseEnumError::InvalidValue("EnhancementKind", s.to_string()))
    }
}

/// Error type for parsing enum values from strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEnumError {
    /// The provided string value is not valid for the enum.
    InvalidValue(&'static str, String),
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(enum_name, value) => {
                write!(f, "invalid {} value: '{}'", enum_name, value)
            }
        }
    }
}

impl std::error::Error for ParseEnumError {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod provider_kind {
        use super::*;

        #[test]
        fn from_str_is_lenient() {
            assert_eq!("DEEL".parse::<ProviderKind>().unwrap(), ProviderKind::Deel);
            assert_eq!(
                "Oyster-HR".parse::<ProviderKind>().unwrap(),
                ProviderKind::Oyster
            );
            assert_eq!(
                " remote.com ".replace('.', "").parse::<ProviderKind>().unwrap(),
                ProviderKind::Remote
            );
        }

        #[test]
        fn from_str_rejects_unknown() {
            let err = "globalization-partners".parse::<ProviderKind>().unwrap_err();
            assert!(err.to_string().contains("ProviderKind"));
        }

        #[test]
        fn folds_misc_costs() {
            assert!(ProviderKind::Rippling.folds_misc_employer_costs());
            assert!(!ProviderKind::Deel.folds_misc_employer_costs());
        }

        #[test]
        fn serde_roundtrip() {
            let json = serde_json::to_string(&ProviderKind::Rivermate).unwrap();
            assert_eq!(json, "\"rivermate\"");
            let back: ProviderKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, ProviderKind::Rivermate);
        }
    }

    mod quote_type {
        use super::*;

        #[test]
        fn serde_is_kebab_case() {
            let json = serde_json::to_string(&QuoteType::StatutoryOnly).unwrap();
            assert_eq!(json, "\"statutory-only\"");
        }

        #[test]
        fn from_str_accepts_variants() {
            assert_eq!(
                "statutory_only".parse::<QuoteType>().unwrap(),
                QuoteType::StatutoryOnly
            );
            assert_eq!(
                "All-Inclusive".parse::<QuoteType>().unwrap(),
                QuoteType::AllInclusive
            );
        }
    }

    mod frequency {
        use super::*;

        #[test]
        fn to_monthly() {
            assert_eq!(
                Frequency::Monthly.to_monthly(Decimal::from(50)),
                Decimal::from(50)
            );
            assert_eq!(
                Frequency::Yearly.to_monthly(Decimal::from(600)),
                Decimal::from(50)
            );
        }

        #[test]
        fn from_label() {
            assert_eq!(Frequency::from_label("Annually"), Frequency::Yearly);
            assert_eq!(Frequency::from_label("per year"), Frequency::Yearly);
            assert_eq!(Frequency::from_label("month"), Frequency::Monthly);
            assert_eq!(Frequency::from_label(""), Frequency::Monthly);
        }
    }

    mod enhancement_kind {
        use super::*;

        #[test]
        fn reasoning_keys_roundtrip() {
            for kind in EnhancementKind::ALL {
                assert_eq!(
                    EnhancementKind::from_reasoning_key(kind.reasoning_key()),
                    Some(kind)
                );
                assert_eq!(EnhancementKind::from_reasoning_key(kind.as_str()), Some(kind));
            }
        }

        #[test]
        fn termination_provisions() {
            assert!(EnhancementKind::SeveranceProvision.is_termination_provision());
            assert!(EnhancementKind::ProbationProvision.is_termination_provision());
            assert!(EnhancementKind::TerminationCosts.is_termination_provision());
            assert!(!EnhancementKind::ThirteenthSalary.is_termination_provision());
        }

        #[test]
        fn serde_is_camel_case() {
            let json = serde_json::to_string(&EnhancementKind::SeveranceProvision).unwrap();
            assert_eq!(json, "\"severanceProvision\"");
        }

        #[test]
        fn coverage_mapping() {
            assert_eq!(
                EnhancementKind::EmployerContributions.covered_by(),
                Some(BenefitKey::SocialSecurity)
            );
            assert_eq!(EnhancementKind::SeveranceProvision.covered_by(), None);
        }
    }

    #[test]
    fn parse_enum_error_display() {
        let err = ParseEnumError::InvalidValue("QuoteType", "cheap".to_string());
        assert_eq!(err.to_string(), "invalid QuoteType value: 'cheap'");
    }
}
