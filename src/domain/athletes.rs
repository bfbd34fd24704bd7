//! Athlete domain types
//!
//! Athletes supported by the sports secretariat: registration, medical data,
//! scholarships and competition results.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    collect_where, decode, require, require_text, ActionContext, ActionMethod, ActionRoute,
    Address, Audit, ContactInfo, DomainError, Resource, SubResourceAction,
};

/// Age at which an athlete no longer needs a guardian
pub const ADULT_AGE: u32 = 18;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AthleteStatus {
    Active,
    Injured,
    Suspended,
    Inactive,
}

impl Default for AthleteStatus {
    fn default() -> Self {
        Self::Active
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    Female,
    Male,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Guardian {
    pub name: String,
    pub relationship: String,
    #[serde(default)]
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MedicalInfo {
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub last_exam: Option<NaiveDate>,
    #[serde(default)]
    pub cleared_for_competition: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scholarship {
    pub monthly_amount: Decimal,
    pub since: NaiveDate,
    #[serde(default)]
    pub until: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitionResult {
    pub id: String,
    pub competition: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub placement: Option<u16>,
    #[serde(default)]
    pub mark: Option<String>,
}

/// Athlete entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Athlete {
    pub id: String,
    pub name: String,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub document_number: String,
    pub modality: String,
    pub status: AthleteStatus,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub guardian: Option<Guardian>,
    #[serde(default)]
    pub medical: MedicalInfo,
    #[serde(default)]
    pub scholarship: Option<Scholarship>,
    #[serde(default)]
    pub results: Vec<CompetitionResult>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAthleteRequest {
    pub name: String,
    pub birth_date: NaiveDate,
    pub sex: Sex,
    pub document_number: String,
    pub modality: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub guardian: Option<Guardian>,
    #[serde(default)]
    pub medical: MedicalInfo,
    #[serde(default)]
    pub scholarship: Option<Scholarship>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAthleteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AthleteStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian: Option<Guardian>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scholarship: Option<Scholarship>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AthleteFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AthleteStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCompetitionResult {
    pub competition: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub placement: Option<u16>,
    #[serde(default)]
    pub mark: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AthleteAction {
    RecordResult(NewCompetitionResult),
    UpdateMedical(MedicalInfo),
}

impl SubResourceAction for AthleteAction {
    fn route(&self) -> ActionRoute {
        match self {
            Self::RecordResult(_) => ActionRoute::post("results"),
            Self::UpdateMedical(_) => ActionRoute::put("medical"),
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::RecordResult(result) => serde_json::to_value(result),
            Self::UpdateMedical(medical) => serde_json::to_value(medical),
        }
    }

    fn from_route(route: &ActionRoute, body: Value) -> Result<Self, DomainError> {
        match (route.method, route.segment.as_str(), route.sub_id.as_deref()) {
            (ActionMethod::Post, "results", None) => Ok(Self::RecordResult(decode(body)?)),
            (ActionMethod::Put, "medical", None) => Ok(Self::UpdateMedical(decode(body)?)),
            _ => Err(DomainError::unknown_action(route)),
        }
    }
}

impl Athlete {
    /// Age in whole years on `on`
    pub fn age_on(&self, on: NaiveDate) -> u32 {
        let mut years = on.year() - self.birth_date.year();
        if (on.month(), on.day()) < (self.birth_date.month(), self.birth_date.day()) {
            years -= 1;
        }
        years.max(0) as u32
    }

    pub fn medal_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.placement, Some(1..=3)))
            .count()
    }
}

impl Resource for Athlete {
    const KIND: &'static str = "athletes";
    const PATH: &'static str = "/sports/athletes";
    const ENVELOPE_KEY: &'static str = "athlete";

    type Create = CreateAthleteRequest;
    type Update = UpdateAthleteRequest;
    type Filters = AthleteFilters;
    type Action = AthleteAction;

    fn id(&self) -> &str {
        &self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn from_create(id: String, audit: Audit, req: Self::Create) -> Result<Self, DomainError> {
        let athlete = Self {
            id,
            name: req.name,
            birth_date: req.birth_date,
            sex: req.sex,
            document_number: req.document_number,
            modality: req.modality,
            status: AthleteStatus::default(),
            team: req.team,
            address: req.address,
            contact: req.contact,
            guardian: req.guardian,
            medical: req.medical,
            scholarship: req.scholarship,
            results: Vec::new(),
            audit,
        };
        athlete.validate()?;
        Ok(athlete)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text(&self.name, "name")?;
        require_text(&self.modality, "modality")?;
        require_text(&self.document_number, "document number")?;
        let today = self.audit.updated_at.date_naive();
        require(self.birth_date <= today, "birth date is in the future")?;
        if self.age_on(today) < ADULT_AGE {
            require(self.guardian.is_some(), "minor athletes need a guardian")?;
        }
        if let Some(scholarship) = &self.scholarship {
            require(
                scholarship.monthly_amount > Decimal::ZERO,
                "scholarship amount must be positive",
            )?;
        }
        Ok(())
    }

    fn apply(&mut self, action: Self::Action, ctx: &ActionContext) -> Result<(), DomainError> {
        match action {
            AthleteAction::RecordResult(result) => {
                require_text(&result.competition, "competition")?;
                require(
                    result.date <= ctx.now.date_naive(),
                    "results cannot be recorded for future competitions",
                )?;
                require(result.placement != Some(0), "placement starts at 1")?;
                self.results.push(CompetitionResult {
                    id: ctx.new_id(),
                    competition: result.competition,
                    date: result.date,
                    category: result.category,
                    placement: result.placement,
                    mark: result.mark,
                });
                self.results.sort_by(|a, b| b.date.cmp(&a.date));
            }
            AthleteAction::UpdateMedical(medical) => {
                self.medical = medical;
            }
        }
        Ok(())
    }

    fn matches(&self, filters: &Self::Filters) -> bool {
        filters
            .modality
            .as_deref()
            .map_or(true, |m| self.modality.eq_ignore_ascii_case(m))
            && filters.status.map_or(true, |s| self.status == s)
            && filters
                .team
                .as_deref()
                .map_or(true, |t| self.team.as_deref() == Some(t))
    }
}

// Selectors

pub fn by_modality<'a>(
    athletes: impl IntoIterator<Item = &'a Athlete>,
    modality: &str,
) -> Vec<Athlete> {
    collect_where(athletes, |a| a.modality.eq_ignore_ascii_case(modality))
}

pub fn by_status<'a>(
    athletes: impl IntoIterator<Item = &'a Athlete>,
    status: AthleteStatus,
) -> Vec<Athlete> {
    collect_where(athletes, |a| a.status == status)
}

pub fn active<'a>(athletes: impl IntoIterator<Item = &'a Athlete>) -> Vec<Athlete> {
    by_status(athletes, AthleteStatus::Active)
}

pub fn minors<'a>(athletes: impl IntoIterator<Item = &'a Athlete>, on: NaiveDate) -> Vec<Athlete> {
    collect_where(athletes, |a| a.age_on(on) < ADULT_AGE)
}

/// Monthly cost of scholarships in force on `on`
pub fn scholarship_total<'a>(
    athletes: impl IntoIterator<Item = &'a Athlete>,
    on: NaiveDate,
) -> Decimal {
    athletes
        .into_iter()
        .filter_map(|a| a.scholarship.as_ref())
        .filter(|s| s.since <= on && s.until.map_or(true, |until| on <= until))
        .map(|s| s.monthly_amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn athlete(birth_date: NaiveDate) -> Athlete {
        Athlete {
            id: "a1".to_string(),
            name: "Rafaela".to_string(),
            birth_date,
            sex: Sex::Female,
            document_number: "12345678909".to_string(),
            modality: "Judô".to_string(),
            status: AthleteStatus::Active,
            team: None,
            address: Address::default(),
            contact: ContactInfo::default(),
            guardian: None,
            medical: MedicalInfo::default(),
            scholarship: Some(Scholarship {
                monthly_amount: Decimal::new(500, 0),
                since: date(2023, 1, 1),
                until: Some(date(2023, 12, 31)),
            }),
            results: Vec::new(),
            audit: Audit::new(None),
        }
    }

    #[test]
    fn age_counts_whole_years() {
        let a = athlete(date(2006, 8, 15));
        assert_eq!(a.age_on(date(2024, 8, 14)), 17);
        assert_eq!(a.age_on(date(2024, 8, 15)), 18);
    }

    #[test]
    fn minors_need_a_guardian() {
        let mut a = athlete(Utc::now().date_naive() - chrono::Duration::days(365 * 10));
        assert!(matches!(a.validate(), Err(DomainError::Validation(_))));
        a.guardian = Some(Guardian {
            name: "Marta".to_string(),
            relationship: "mother".to_string(),
            contact: ContactInfo::default(),
        });
        assert!(a.validate().is_ok());
    }

    #[test]
    fn results_are_kept_newest_first() {
        let ctx = ActionContext::new(None);
        let mut a = athlete(date(1995, 1, 1));
        for (day, placement) in [(10, 2), (20, 1)] {
            a.apply(
                AthleteAction::RecordResult(NewCompetitionResult {
                    competition: "Jogos Regionais".to_string(),
                    date: date(2023, 5, day),
                    category: None,
                    placement: Some(placement),
                    mark: None,
                }),
                &ctx,
            )
            .unwrap();
        }
        assert_eq!(a.results[0].date, date(2023, 5, 20));
        assert_eq!(a.medal_count(), 2);
    }

    #[test]
    fn scholarship_total_respects_validity() {
        let athletes = vec![athlete(date(1995, 1, 1))];
        assert_eq!(
            scholarship_total(&athletes, date(2023, 6, 1)),
            Decimal::new(500, 0)
        );
        assert_eq!(scholarship_total(&athletes, date(2024, 6, 1)), Decimal::ZERO);
    }
}
