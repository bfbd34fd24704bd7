//! Cultural workshop domain types
//!
//! Courses run by the culture secretariat. Enrollment is capped by
//! `max_participants`; a workshop flips between `OPEN` and `FULL` as seats are
//! taken and released.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::artists::ArtCategory;
use super::{
    collect_where, decode, guard_status_edit, require, require_text, ActionContext, ActionMethod, ActionRoute,
    Audit, ContactInfo, DomainError, Resource, SubResourceAction,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkshopStatus {
    Open,
    Full,
    InProgress,
    Completed,
    Cancelled,
}

impl Default for WorkshopStatus {
    fn default() -> Self {
        Self::Open
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instructor {
    pub name: String,
    #[serde(default)]
    pub artist_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkshopSchedule {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
    pub starts_at: NaiveTime,
    pub ends_at: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    pub id: String,
    pub student_name: String,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub contact: ContactInfo,
    pub enrolled_at: DateTime<Utc>,
}

/// Cultural workshop entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CulturalWorkshop {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: ArtCategory,
    pub status: WorkshopStatus,
    pub instructor: Instructor,
    pub schedule: WorkshopSchedule,
    /// Cultural space hosting the workshop
    #[serde(default)]
    pub space_id: Option<String>,
    pub max_participants: u32,
    #[serde(default)]
    pub min_age: Option<u8>,
    #[serde(default)]
    pub materials_budget: Decimal,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCulturalWorkshopRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: ArtCategory,
    pub instructor: Instructor,
    pub schedule: WorkshopSchedule,
    #[serde(default)]
    pub space_id: Option<String>,
    pub max_participants: u32,
    #[serde(default)]
    pub min_age: Option<u8>,
    #[serde(default)]
    pub materials_budget: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCulturalWorkshopRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ArtCategory>,
    /// OPEN and FULL follow the capacity; the other stages may be set here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkshopStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor: Option<Instructor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<WorkshopSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials_budget: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkshopFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ArtCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkshopStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrollmentRequest {
    pub student_name: String,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CulturalWorkshopAction {
    Enroll(EnrollmentRequest),
    CancelEnrollment { enrollment_id: String },
}

impl SubResourceAction for CulturalWorkshopAction {
    fn route(&self) -> ActionRoute {
        match self {
            Self::Enroll(_) => ActionRoute::post("enrollments"),
            Self::CancelEnrollment { enrollment_id } => {
                ActionRoute::delete_item("enrollments", enrollment_id)
            }
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Enroll(req) => serde_json::to_value(req),
            Self::CancelEnrollment { .. } => Ok(Value::Null),
        }
    }

    fn from_route(route: &ActionRoute, body: Value) -> Result<Self, DomainError> {
        match (route.method, route.segment.as_str(), route.sub_id.as_deref()) {
            (ActionMethod::Post, "enrollments", None) => Ok(Self::Enroll(decode(body)?)),
            (ActionMethod::Delete, "enrollments", Some(id)) => Ok(Self::CancelEnrollment {
                enrollment_id: id.to_string(),
            }),
            _ => Err(DomainError::unknown_action(route)),
        }
    }
}

impl CulturalWorkshop {
    pub fn available_slots(&self) -> u32 {
        self.max_participants
            .saturating_sub(self.enrollments.len() as u32)
    }

    fn refresh_capacity_status(&mut self) {
        match self.status {
            WorkshopStatus::Open if self.available_slots() == 0 => {
                self.status = WorkshopStatus::Full;
            }
            WorkshopStatus::Full if self.available_slots() > 0 => {
                self.status = WorkshopStatus::Open;
            }
            _ => {}
        }
    }
}

impl Resource for CulturalWorkshop {
    const KIND: &'static str = "cultural_workshops";
    const PATH: &'static str = "/culture/workshops";
    const ENVELOPE_KEY: &'static str = "workshop";

    type Create = CreateCulturalWorkshopRequest;
    type Update = UpdateCulturalWorkshopRequest;
    type Filters = WorkshopFilters;
    type Action = CulturalWorkshopAction;

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
        let workshop = Self {
            id,
            title: req.title,
            description: req.description,
            category: req.category,
            status: WorkshopStatus::default(),
            instructor: req.instructor,
            schedule: req.schedule,
            space_id: req.space_id,
            max_participants: req.max_participants,
            min_age: req.min_age,
            materials_budget: req.materials_budget,
            enrollments: Vec::new(),
            audit,
        };
        workshop.validate()?;
        Ok(workshop)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text(&self.title, "title")?;
        require_text(&self.instructor.name, "instructor name")?;
        require(self.max_participants > 0, "max_participants must be positive")?;
        require(
            self.enrollments.len() <= self.max_participants as usize,
            "max_participants is below the current enrollment count",
        )?;
        require(
            self.schedule.start_date <= self.schedule.end_date,
            "workshop must not end before it starts",
        )?;
        require(
            self.schedule.starts_at < self.schedule.ends_at,
            "sessions must end after they start",
        )?;
        require(
            self.materials_budget >= Decimal::ZERO,
            "materials budget must not be negative",
        )
    }

    fn reconcile(&mut self, previous: &Self) -> Result<(), DomainError> {
        guard_status_edit(previous.status, self.status, |from, to| match to {
            WorkshopStatus::Open => from == WorkshopStatus::Full,
            WorkshopStatus::Full => false,
            WorkshopStatus::InProgress => {
                matches!(from, WorkshopStatus::Open | WorkshopStatus::Full)
            }
            WorkshopStatus::Completed => from == WorkshopStatus::InProgress,
            WorkshopStatus::Cancelled => from != WorkshopStatus::Completed,
        })?;
        // OPEN and FULL follow the capacity
        if self.status == WorkshopStatus::Full {
            self.status = WorkshopStatus::Open;
        }
        self.refresh_capacity_status();
        Ok(())
    }

    fn apply(&mut self, action: Self::Action, ctx: &ActionContext) -> Result<(), DomainError> {
        match action {
            CulturalWorkshopAction::Enroll(req) => {
                match self.status {
                    WorkshopStatus::Open => {}
                    WorkshopStatus::Full => {
                        return Err(DomainError::Conflict("workshop is full".to_string()));
                    }
                    other => {
                        return Err(DomainError::InvalidTransition(format!(
                            "workshop is {:?} and not taking enrollments",
                            other
                        )));
                    }
                }
                require_text(&req.student_name, "student name")?;
                if let (Some(min_age), Some(age)) = (self.min_age, req.age) {
                    require(age >= min_age, "student is below the minimum age")?;
                }
                if self.available_slots() == 0 {
                    return Err(DomainError::Conflict("workshop is full".to_string()));
                }
                self.enrollments.push(Enrollment {
                    id: ctx.new_id(),
                    student_name: req.student_name,
                    age: req.age,
                    contact: req.contact,
                    enrolled_at: ctx.now,
                });
            }
            CulturalWorkshopAction::CancelEnrollment { enrollment_id } => {
                let before = self.enrollments.len();
                self.enrollments.retain(|e| e.id != enrollment_id);
                if self.enrollments.len() == before {
                    return Err(DomainError::NotFound(format!("enrollment {}", enrollment_id)));
                }
            }
        }
        self.refresh_capacity_status();
        Ok(())
    }

    fn matches(&self, filters: &Self::Filters) -> bool {
        filters.category.map_or(true, |c| self.category == c)
            && filters.status.map_or(true, |s| self.status == s)
    }
}

// Selectors

pub fn by_category<'a>(
    workshops: impl IntoIterator<Item = &'a CulturalWorkshop>,
    category: ArtCategory,
) -> Vec<CulturalWorkshop> {
    collect_where(workshops, |w| w.category == category)
}

pub fn open_for_enrollment<'a>(
    workshops: impl IntoIterator<Item = &'a CulturalWorkshop>,
) -> Vec<CulturalWorkshop> {
    collect_where(workshops, |w| {
        w.status == WorkshopStatus::Open && w.available_slots() > 0
    })
}

pub fn total_available_slots<'a>(
    workshops: impl IntoIterator<Item = &'a CulturalWorkshop>,
) -> u64 {
    workshops
        .into_iter()
        .filter(|w| w.status == WorkshopStatus::Open)
        .map(|w| u64::from(w.available_slots()))
        .sum()
}

pub fn total_enrollments<'a>(workshops: impl IntoIterator<Item = &'a CulturalWorkshop>) -> usize {
    workshops.into_iter().map(|w| w.enrollments.len()).sum()
}
