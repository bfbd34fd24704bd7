//! Social assistance family domain types
//!
//! Families registered with the social assistance secretariat, their members,
//! granted benefits and home visits.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    collect_where, decode, guard_status_edit, require, require_text, ActionContext, ActionMethod, ActionRoute,
    Address, Audit, ContactInfo, DomainError, Resource, SubResourceAction,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VulnerabilityLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FamilyStatus {
    Pending,
    Active,
    Inactive,
}

impl Default for FamilyStatus {
    fn default() -> Self {
        Self::Pending
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferencePerson {
    pub name: String,
    pub document_number: String,
    pub birth_date: NaiveDate,
    /// Social identification number (NIS)
    #[serde(default)]
    pub nis: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyMember {
    pub id: String,
    pub name: String,
    pub relationship: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub monthly_income: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Benefit {
    pub id: String,
    pub program: String,
    pub monthly_amount: Decimal,
    pub granted_on: NaiveDate,
    #[serde(default)]
    pub revoked_on: Option<NaiveDate>,
}

impl Benefit {
    pub fn is_active(&self) -> bool {
        self.revoked_on.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HomeVisit {
    pub id: String,
    pub visited_at: DateTime<Utc>,
    pub social_worker: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Family entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Family {
    pub id: String,
    pub reference_person: ReferencePerson,
    pub address: Address,
    #[serde(default)]
    pub contact: ContactInfo,
    pub vulnerability: VulnerabilityLevel,
    pub status: FamilyStatus,
    /// Income of the reference person
    #[serde(default)]
    pub reference_income: Decimal,
    #[serde(default)]
    pub members: Vec<FamilyMember>,
    #[serde(default)]
    pub benefits: Vec<Benefit>,
    #[serde(default)]
    pub visits: Vec<HomeVisit>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFamilyRequest {
    pub reference_person: ReferencePerson,
    pub address: Address,
    #[serde(default)]
    pub contact: ContactInfo,
    pub vulnerability: VulnerabilityLevel,
    #[serde(default)]
    pub reference_income: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFamilyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_person: Option<ReferencePerson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerability: Option<VulnerabilityLevel>,
    /// An update may deactivate a family or reactivate an inactive one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FamilyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_income: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerability: Option<VulnerabilityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FamilyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewFamilyMember {
    pub name: String,
    pub relationship: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub monthly_income: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenefitGrant {
    pub program: String,
    pub monthly_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitReport {
    pub social_worker: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FamilyAction {
    AddMember(NewFamilyMember),
    GrantBenefit(BenefitGrant),
    RevokeBenefit { benefit_id: String },
    RecordVisit(VisitReport),
}

impl SubResourceAction for FamilyAction {
    fn route(&self) -> ActionRoute {
        match self {
            Self::AddMember(_) => ActionRoute::post("members"),
            Self::GrantBenefit(_) => ActionRoute::post("benefits"),
            Self::RevokeBenefit { benefit_id } => ActionRoute::delete_item("benefits", benefit_id),
            Self::RecordVisit(_) => ActionRoute::post("visits"),
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::AddMember(member) => serde_json::to_value(member),
            Self::GrantBenefit(grant) => serde_json::to_value(grant),
            Self::RevokeBenefit { .. } => Ok(Value::Null),
            Self::RecordVisit(report) => serde_json::to_value(report),
        }
    }

    fn from_route(route: &ActionRoute, body: Value) -> Result<Self, DomainError> {
        match (route.method, route.segment.as_str(), route.sub_id.as_deref()) {
            (ActionMethod::Post, "members", None) => Ok(Self::AddMember(decode(body)?)),
            (ActionMethod::Post, "benefits", None) => Ok(Self::GrantBenefit(decode(body)?)),
            (ActionMethod::Delete, "benefits", Some(id)) => Ok(Self::RevokeBenefit {
                benefit_id: id.to_string(),
            }),
            (ActionMethod::Post, "visits", None) => Ok(Self::RecordVisit(decode(body)?)),
            _ => Err(DomainError::unknown_action(route)),
        }
    }
}

impl Family {
    /// Number of people in the household, reference person included
    pub fn size(&self) -> usize {
        self.members.len() + 1
    }

    pub fn total_income(&self) -> Decimal {
        self.reference_income + self.members.iter().map(|m| m.monthly_income).sum::<Decimal>()
    }

    pub fn per_capita_income(&self) -> Decimal {
        self.total_income() / Decimal::from(self.size() as u64)
    }

    pub fn monthly_benefits(&self) -> Decimal {
        self.benefits
            .iter()
            .filter(|b| b.is_active())
            .map(|b| b.monthly_amount)
            .sum()
    }

    pub fn last_visit(&self) -> Option<DateTime<Utc>> {
        self.visits.iter().map(|v| v.visited_at).max()
    }
}

impl Resource for Family {
    const KIND: &'static str = "families";
    const PATH: &'static str = "/social-assistance/families";
    const ENVELOPE_KEY: &'static str = "family";

    type Create = CreateFamilyRequest;
    type Update = UpdateFamilyRequest;
    type Filters = FamilyFilters;
    type Action = FamilyAction;

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
        let family = Self {
            id,
            reference_person: req.reference_person,
            address: req.address,
            contact: req.contact,
            vulnerability: req.vulnerability,
            status: FamilyStatus::default(),
            reference_income: req.reference_income,
            members: Vec::new(),
            benefits: Vec::new(),
            visits: Vec::new(),
            audit,
        };
        family.validate()?;
        Ok(family)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text(&self.reference_person.name, "reference person name")?;
        require_text(
            &self.reference_person.document_number,
            "reference person document",
        )?;
        require(
            self.reference_income >= Decimal::ZERO
                && self.members.iter().all(|m| m.monthly_income >= Decimal::ZERO),
            "income must not be negative",
        )
    }

    fn reconcile(&mut self, previous: &Self) -> Result<(), DomainError> {
        // Activation comes with the first benefit grant
        guard_status_edit(previous.status, self.status, |from, to| match to {
            FamilyStatus::Inactive => true,
            FamilyStatus::Active => from == FamilyStatus::Inactive,
            FamilyStatus::Pending => false,
        })
    }

    fn apply(&mut self, action: Self::Action, ctx: &ActionContext) -> Result<(), DomainError> {
        match action {
            FamilyAction::AddMember(member) => {
                require_text(&member.name, "member name")?;
                require_text(&member.relationship, "relationship")?;
                require(
                    member.monthly_income >= Decimal::ZERO,
                    "income must not be negative",
                )?;
                self.members.push(FamilyMember {
                    id: ctx.new_id(),
                    name: member.name,
                    relationship: member.relationship,
                    birth_date: member.birth_date,
                    monthly_income: member.monthly_income,
                });
            }
            FamilyAction::GrantBenefit(grant) => {
                if self.status == FamilyStatus::Inactive {
                    return Err(DomainError::InvalidTransition(
                        "inactive families cannot receive benefits".to_string(),
                    ));
                }
                require_text(&grant.program, "program")?;
                require(
                    grant.monthly_amount > Decimal::ZERO,
                    "benefit amount must be positive",
                )?;
                if self
                    .benefits
                    .iter()
                    .any(|b| b.is_active() && b.program.eq_ignore_ascii_case(&grant.program))
                {
                    return Err(DomainError::Conflict(format!(
                        "family already receives {}",
                        grant.program
                    )));
                }
                self.benefits.push(Benefit {
                    id: ctx.new_id(),
                    program: grant.program,
                    monthly_amount: grant.monthly_amount,
                    granted_on: ctx.now.date_naive(),
                    revoked_on: None,
                });
                self.status = FamilyStatus::Active;
            }
            FamilyAction::RevokeBenefit { benefit_id } => {
                let benefit = self
                    .benefits
                    .iter_mut()
                    .find(|b| b.id == benefit_id)
                    .ok_or_else(|| DomainError::NotFound(format!("benefit {}", benefit_id)))?;
                if !benefit.is_active() {
                    return Err(DomainError::InvalidTransition(
                        "benefit was already revoked".to_string(),
                    ));
                }
                benefit.revoked_on = Some(ctx.now.date_naive());
            }
            FamilyAction::RecordVisit(report) => {
                require_text(&report.social_worker, "social worker")?;
                self.visits.push(HomeVisit {
                    id: ctx.new_id(),
                    visited_at: ctx.now,
                    social_worker: report.social_worker,
                    notes: report.notes,
                });
            }
        }
        Ok(())
    }

    fn matches(&self, filters: &Self::Filters) -> bool {
        filters.vulnerability.map_or(true, |v| self.vulnerability == v)
            && filters.status.map_or(true, |s| self.status == s)
            && filters
                .neighborhood
                .as_deref()
                .map_or(true, |n| self.address.neighborhood.eq_ignore_ascii_case(n))
    }
}

// Selectors

pub fn by_vulnerability<'a>(
    families: impl IntoIterator<Item = &'a Family>,
    level: VulnerabilityLevel,
) -> Vec<Family> {
    collect_where(families, |f| f.vulnerability == level)
}

/// Families at `level` or worse
pub fn at_least<'a>(
    families: impl IntoIterator<Item = &'a Family>,
    level: VulnerabilityLevel,
) -> Vec<Family> {
    collect_where(families, |f| f.vulnerability >= level)
}

pub fn active<'a>(families: impl IntoIterator<Item = &'a Family>) -> Vec<Family> {
    collect_where(families, |f| f.status == FamilyStatus::Active)
}

/// Families whose per-capita income is at or below `line`
pub fn below_income_line<'a>(
    families: impl IntoIterator<Item = &'a Family>,
    line: Decimal,
) -> Vec<Family> {
    collect_where(families, |f| f.per_capita_income() <= line)
}

/// Families never visited or last visited before `since`
pub fn needing_visit<'a>(
    families: impl IntoIterator<Item = &'a Family>,
    since: DateTime<Utc>,
) -> Vec<Family> {
    collect_where(families, |f| f.last_visit().map_or(true, |v| v < since))
}

pub fn total_monthly_benefits<'a>(families: impl IntoIterator<Item = &'a Family>) -> Decimal {
    families.into_iter().map(Family::monthly_benefits).sum()
}
