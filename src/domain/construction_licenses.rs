//! Construction license domain types
//!
//! Building permits requested by citizens and companies. A license moves
//! `SUBMITTED -> UNDER_REVIEW -> APPROVED | REJECTED`; approved licenses carry
//! an expiry date and may be inspected.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    collect_where, decode, require, require_text, ActionContext, ActionMethod, ActionRoute,
    Address, Audit, ContactInfo, Document, DomainError, Resource, SubResourceAction,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseType {
    NewConstruction,
    Renovation,
    Expansion,
    Demolition,
    Regularization,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Expired,
    Cancelled,
}

impl Default for LicenseStatus {
    fn default() -> Self {
        Self::Submitted
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Applicant {
    pub name: String,
    pub document_number: String,
    #[serde(default)]
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub address: Address,
    /// Municipal real-estate registration
    pub registration: String,
    #[serde(default)]
    pub zoning_area_id: Option<String>,
    pub lot_area_m2: Decimal,
    pub built_area_m2: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicalLead {
    pub name: String,
    /// Professional council registration (CREA / CAU)
    pub registration: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LicenseFees {
    pub amount: Decimal,
    #[serde(default)]
    pub paid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Inspection {
    pub id: String,
    pub scheduled_for: DateTime<Utc>,
    pub inspector: String,
    pub status: InspectionStatus,
    #[serde(default)]
    pub findings: Option<String>,
    #[serde(default)]
    pub approved: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub decided_at: DateTime<Utc>,
    #[serde(default)]
    pub decided_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Construction license entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructionLicense {
    pub id: String,
    pub protocol_number: String,
    pub license_type: LicenseType,
    pub status: LicenseStatus,
    pub applicant: Applicant,
    pub property: Property,
    #[serde(default)]
    pub technical_lead: Option<TechnicalLead>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fees: LicenseFees,
    #[serde(default)]
    pub inspections: Vec<Inspection>,
    #[serde(default)]
    pub decision: Option<Decision>,
    #[serde(default)]
    pub issued_on: Option<NaiveDate>,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConstructionLicenseRequest {
    pub protocol_number: String,
    pub license_type: LicenseType,
    pub applicant: Applicant,
    pub property: Property,
    #[serde(default)]
    pub technical_lead: Option<TechnicalLead>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fees: LicenseFees,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateConstructionLicenseRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_type: Option<LicenseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant: Option<Applicant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<Property>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_lead: Option<TechnicalLead>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<LicenseFees>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LicenseFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_type: Option<LicenseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LicenseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoning_area_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Approval {
    pub valid_until: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rejection {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionRequest {
    pub scheduled_for: DateTime<Utc>,
    pub inspector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionReport {
    pub approved: bool,
    #[serde(default)]
    pub findings: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstructionLicenseAction {
    StartReview,
    Approve(Approval),
    Reject(Rejection),
    ScheduleInspection(InspectionRequest),
    CompleteInspection {
        inspection_id: String,
        report: InspectionReport,
    },
}

impl SubResourceAction for ConstructionLicenseAction {
    fn route(&self) -> ActionRoute {
        match self {
            Self::StartReview => ActionRoute::post("review"),
            Self::Approve(_) => ActionRoute::post("approve"),
            Self::Reject(_) => ActionRoute::post("reject"),
            Self::ScheduleInspection(_) => ActionRoute::post("inspections"),
            Self::CompleteInspection { inspection_id, .. } => {
                ActionRoute::put_item("inspections", inspection_id)
            }
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::StartReview => Ok(Value::Null),
            Self::Approve(approval) => serde_json::to_value(approval),
            Self::Reject(rejection) => serde_json::to_value(rejection),
            Self::ScheduleInspection(req) => serde_json::to_value(req),
            Self::CompleteInspection { report, .. } => serde_json::to_value(report),
        }
    }

    fn from_route(route: &ActionRoute, body: Value) -> Result<Self, DomainError> {
        match (route.method, route.segment.as_str(), route.sub_id.as_deref()) {
            (ActionMethod::Post, "review", None) => Ok(Self::StartReview),
            (ActionMethod::Post, "approve", None) => Ok(Self::Approve(decode(body)?)),
            (ActionMethod::Post, "reject", None) => Ok(Self::Reject(decode(body)?)),
            (ActionMethod::Post, "inspections", None) => {
                Ok(Self::ScheduleInspection(decode(body)?))
            }
            (ActionMethod::Put, "inspections", Some(id)) => Ok(Self::CompleteInspection {
                inspection_id: id.to_string(),
                report: decode(body)?,
            }),
            _ => Err(DomainError::unknown_action(route)),
        }
    }
}

impl ConstructionLicense {
    pub fn is_pending(&self) -> bool {
        matches!(
            self.status,
            LicenseStatus::Submitted | LicenseStatus::UnderReview
        )
    }

    fn decide(&mut self, ctx: &ActionContext, notes: Option<String>) {
        self.decision = Some(Decision {
            decided_at: ctx.now,
            decided_by: ctx.actor.clone(),
            notes,
        });
    }
}

impl Resource for ConstructionLicense {
    const KIND: &'static str = "construction_licenses";
    const PATH: &'static str = "/urban-planning/construction-licenses";
    const ENVELOPE_KEY: &'static str = "license";

    type Create = CreateConstructionLicenseRequest;
    type Update = UpdateConstructionLicenseRequest;
    type Filters = LicenseFilters;
    type Action = ConstructionLicenseAction;

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
        let license = Self {
            id,
            protocol_number: req.protocol_number,
            license_type: req.license_type,
            status: LicenseStatus::default(),
            applicant: req.applicant,
            property: req.property,
            technical_lead: req.technical_lead,
            description: req.description,
            fees: req.fees,
            inspections: Vec::new(),
            decision: None,
            issued_on: None,
            expires_on: None,
            documents: Vec::new(),
            audit,
        };
        license.validate()?;
        Ok(license)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text(&self.protocol_number, "protocol number")?;
        require_text(&self.applicant.name, "applicant name")?;
        require_text(&self.property.registration, "property registration")?;
        require(
            self.property.lot_area_m2 > Decimal::ZERO,
            "lot area must be positive",
        )?;
        require(
            self.property.built_area_m2 >= Decimal::ZERO,
            "built area must not be negative",
        )?;
        require(self.fees.amount >= Decimal::ZERO, "fees must not be negative")?;
        if self.license_type != LicenseType::Demolition
            && self.license_type != LicenseType::Regularization
        {
            require(
                self.technical_lead.is_some(),
                "a technical lead is required for this license type",
            )?;
        }
        Ok(())
    }

    fn apply(&mut self, action: Self::Action, ctx: &ActionContext) -> Result<(), DomainError> {
        match action {
            ConstructionLicenseAction::StartReview => {
                if self.status != LicenseStatus::Submitted {
                    return Err(DomainError::InvalidTransition(format!(
                        "review can only start on submitted licenses, license is {:?}",
                        self.status
                    )));
                }
                self.status = LicenseStatus::UnderReview;
            }
            ConstructionLicenseAction::Approve(approval) => {
                if !self.is_pending() {
                    return Err(DomainError::InvalidTransition(format!(
                        "license is already {:?}",
                        self.status
                    )));
                }
                require(self.fees.paid, "license fees must be paid before approval")?;
                let today = ctx.now.date_naive();
                require(
                    approval.valid_until > today,
                    "approval must be valid beyond today",
                )?;
                self.status = LicenseStatus::Approved;
                self.issued_on = Some(today);
                self.expires_on = Some(approval.valid_until);
                self.decide(ctx, approval.notes);
            }
            ConstructionLicenseAction::Reject(rejection) => {
                if !self.is_pending() {
                    return Err(DomainError::InvalidTransition(format!(
                        "license is already {:?}",
                        self.status
                    )));
                }
                require_text(&rejection.reason, "rejection reason")?;
                self.status = LicenseStatus::Rejected;
                self.decide(ctx, Some(rejection.reason));
            }
            ConstructionLicenseAction::ScheduleInspection(req) => {
                if matches!(
                    self.status,
                    LicenseStatus::Rejected | LicenseStatus::Cancelled | LicenseStatus::Expired
                ) {
                    return Err(DomainError::InvalidTransition(format!(
                        "cannot inspect a {:?} license",
                        self.status
                    )));
                }
                require_text(&req.inspector, "inspector")?;
                require(
                    req.scheduled_for > ctx.now,
                    "inspections must be scheduled in the future",
                )?;
                self.inspections.push(Inspection {
                    id: ctx.new_id(),
                    scheduled_for: req.scheduled_for,
                    inspector: req.inspector,
                    status: InspectionStatus::Scheduled,
                    findings: None,
                    approved: None,
                });
            }
            ConstructionLicenseAction::CompleteInspection {
                inspection_id,
                report,
            } => {
                let inspection = self
                    .inspections
                    .iter_mut()
                    .find(|i| i.id == inspection_id)
                    .ok_or_else(|| DomainError::NotFound(format!("inspection {}", inspection_id)))?;
                if inspection.status != InspectionStatus::Scheduled {
                    return Err(DomainError::InvalidTransition(format!(
                        "inspection is {:?}",
                        inspection.status
                    )));
                }
                inspection.status = InspectionStatus::Completed;
                inspection.approved = Some(report.approved);
                inspection.findings = report.findings;
            }
        }
        Ok(())
    }

    fn matches(&self, filters: &Self::Filters) -> bool {
        filters.license_type.map_or(true, |t| self.license_type == t)
            && filters.status.map_or(true, |s| self.status == s)
            && filters
                .zoning_area_id
                .as_deref()
                .map_or(true, |z| self.property.zoning_area_id.as_deref() == Some(z))
    }

    fn documents_mut(&mut self) -> Option<&mut Vec<Document>> {
        Some(&mut self.documents)
    }
}

// Selectors

pub fn by_status<'a>(
    licenses: impl IntoIterator<Item = &'a ConstructionLicense>,
    status: LicenseStatus,
) -> Vec<ConstructionLicense> {
    collect_where(licenses, |l| l.status == status)
}

pub fn by_type<'a>(
    licenses: impl IntoIterator<Item = &'a ConstructionLicense>,
    license_type: LicenseType,
) -> Vec<ConstructionLicense> {
    collect_where(licenses, |l| l.license_type == license_type)
}

pub fn pending<'a>(
    licenses: impl IntoIterator<Item = &'a ConstructionLicense>,
) -> Vec<ConstructionLicense> {
    collect_where(licenses, ConstructionLicense::is_pending)
}

/// Approved licenses expiring on or before `date`
pub fn expiring_by<'a>(
    licenses: impl IntoIterator<Item = &'a ConstructionLicense>,
    date: NaiveDate,
) -> Vec<ConstructionLicense> {
    collect_where(licenses, |l| {
        l.status == LicenseStatus::Approved && l.expires_on.is_some_and(|e| e <= date)
    })
}

pub fn total_fees<'a>(licenses: impl IntoIterator<Item = &'a ConstructionLicense>) -> Decimal {
    licenses.into_iter().map(|l| l.fees.amount).sum()
}

pub fn outstanding_fees<'a>(
    licenses: impl IntoIterator<Item = &'a ConstructionLicense>,
) -> Decimal {
    licenses
        .into_iter()
        .filter(|l| !l.fees.paid)
        .map(|l| l.fees.amount)
        .sum()
}

pub fn total_built_area<'a>(
    licenses: impl IntoIterator<Item = &'a ConstructionLicense>,
) -> Decimal {
    licenses
        .into_iter()
        .filter(|l| l.status == LicenseStatus::Approved)
        .map(|l| l.property.built_area_m2)
        .sum()
}
