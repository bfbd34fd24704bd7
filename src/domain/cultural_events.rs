//! Cultural event domain types
//!
//! Events promoted by the culture secretariat, with their participants,
//! attendance figures and publication lifecycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    collect_where, decode, guard_status_edit, require, require_text, ActionContext, ActionMethod, ActionRoute,
    Address, Audit, Budget, ContactInfo, Document, DomainError, Resource, SubResourceAction,
};

/// Event type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Show,
    Exhibition,
    Festival,
    Workshop,
    Theater,
    Cinema,
    Fair,
    Other,
}

/// Event status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Planned,
    Published,
    Ongoing,
    Completed,
    Cancelled,
}

impl Default for EventStatus {
    fn default() -> Self {
        Self::Planned
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantRole {
    Artist,
    Staff,
    Volunteer,
    Guest,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Venue {
    /// Cultural space hosting the event, when it is a municipal one
    #[serde(default)]
    pub space_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub address: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticketing {
    pub free: bool,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub tickets_available: Option<u32>,
}

impl Default for Ticketing {
    fn default() -> Self {
        Self {
            free: true,
            price: None,
            tickets_available: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organizer {
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub role: ParticipantRole,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attendance {
    #[serde(default)]
    pub expected: Option<u32>,
    pub actual: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Cultural event entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CulturalEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub event_type: EventType,
    pub status: EventStatus,
    pub venue: Venue,
    pub schedule: Schedule,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub ticketing: Ticketing,
    #[serde(default)]
    pub budget: Budget,
    pub organizer: Organizer,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub attendance: Option<Attendance>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(flatten)]
    pub audit: Audit,
}

/// Request DTO for creating an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCulturalEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub event_type: EventType,
    pub venue: Venue,
    pub schedule: Schedule,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub ticketing: Ticketing,
    #[serde(default)]
    pub budget: Budget,
    pub organizer: Organizer,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Request DTO for updating an event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCulturalEventRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    /// Publishing and cancelling go through their actions; an update may only move a
    /// published event along to ongoing or completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<Venue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticketing: Option<Ticketing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<Organizer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Query parameters for listing events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewParticipant {
    pub name: String,
    pub role: ParticipantRole,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendanceRecord {
    #[serde(default)]
    pub expected: Option<u32>,
    pub actual: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cancellation {
    pub reason: String,
}

/// Sub-resource actions on an event
#[derive(Debug, Clone, PartialEq)]
pub enum CulturalEventAction {
    AddParticipant(NewParticipant),
    RemoveParticipant { participant_id: String },
    RecordAttendance(AttendanceRecord),
    Publish,
    Cancel(Cancellation),
}

impl SubResourceAction for CulturalEventAction {
    fn route(&self) -> ActionRoute {
        match self {
            Self::AddParticipant(_) => ActionRoute::post("participants"),
            Self::RemoveParticipant { participant_id } => {
                ActionRoute::delete_item("participants", participant_id)
            }
            Self::RecordAttendance(_) => ActionRoute::put("attendance"),
            Self::Publish => ActionRoute::post("publish"),
            Self::Cancel(_) => ActionRoute::post("cancel"),
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::AddParticipant(p) => serde_json::to_value(p),
            Self::RecordAttendance(a) => serde_json::to_value(a),
            Self::Cancel(c) => serde_json::to_value(c),
            Self::RemoveParticipant { .. } | Self::Publish => Ok(Value::Null),
        }
    }

    fn from_route(route: &ActionRoute, body: Value) -> Result<Self, DomainError> {
        match (route.method, route.segment.as_str(), route.sub_id.as_deref()) {
            (ActionMethod::Post, "participants", None) => Ok(Self::AddParticipant(decode(body)?)),
            (ActionMethod::Delete, "participants", Some(id)) => Ok(Self::RemoveParticipant {
                participant_id: id.to_string(),
            }),
            (ActionMethod::Put, "attendance", None) => Ok(Self::RecordAttendance(decode(body)?)),
            (ActionMethod::Post, "publish", None) => Ok(Self::Publish),
            (ActionMethod::Post, "cancel", None) => Ok(Self::Cancel(decode(body)?)),
            _ => Err(DomainError::unknown_action(route)),
        }
    }
}

impl CulturalEvent {
    fn is_closed(&self) -> bool {
        matches!(self.status, EventStatus::Completed | EventStatus::Cancelled)
    }
}

impl Resource for CulturalEvent {
    const KIND: &'static str = "cultural_events";
    const PATH: &'static str = "/culture/events";
    const ENVELOPE_KEY: &'static str = "event";

    type Create = CreateCulturalEventRequest;
    type Update = UpdateCulturalEventRequest;
    type Filters = EventFilters;
    type Action = CulturalEventAction;

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
        let event = Self {
            id,
            title: req.title,
            description: req.description,
            event_type: req.event_type,
            status: EventStatus::default(),
            venue: req.venue,
            schedule: req.schedule,
            capacity: req.capacity,
            ticketing: req.ticketing,
            budget: req.budget,
            organizer: req.organizer,
            participants: Vec::new(),
            attendance: None,
            cancellation_reason: None,
            tags: req.tags,
            documents: Vec::new(),
            audit,
        };
        event.validate()?;
        Ok(event)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text(&self.title, "title")?;
        require_text(&self.venue.name, "venue name")?;
        require(
            self.schedule.ends_at >= self.schedule.starts_at,
            "event must not end before it starts",
        )?;
        require(self.capacity != Some(0), "capacity must be positive")?;
        require(self.budget.is_valid(), "budget amounts must not be negative")?;
        if !self.ticketing.free {
            require(
                self.ticketing.price.is_some_and(|p| p > Decimal::ZERO),
                "paid events need a positive ticket price",
            )?;
        }
        Ok(())
    }

    fn reconcile(&mut self, previous: &Self) -> Result<(), DomainError> {
        // Publishing and cancelling only happen through their actions
        guard_status_edit(previous.status, self.status, |from, to| {
            matches!(
                (from, to),
                (EventStatus::Published, EventStatus::Ongoing)
                    | (EventStatus::Published, EventStatus::Completed)
                    | (EventStatus::Ongoing, EventStatus::Completed)
            )
        })
    }

    fn apply(&mut self, action: Self::Action, ctx: &ActionContext) -> Result<(), DomainError> {
        match action {
            CulturalEventAction::AddParticipant(new) => {
                if self.is_closed() {
                    return Err(DomainError::InvalidTransition(format!(
                        "cannot add participants to a {:?} event",
                        self.status
                    )));
                }
                require_text(&new.name, "participant name")?;
                self.participants.push(Participant {
                    id: ctx.new_id(),
                    name: new.name,
                    role: new.role,
                    confirmed: new.confirmed,
                });
            }
            CulturalEventAction::RemoveParticipant { participant_id } => {
                let before = self.participants.len();
                self.participants.retain(|p| p.id != participant_id);
                if self.participants.len() == before {
                    return Err(DomainError::NotFound(format!(
                        "participant {}",
                        participant_id
                    )));
                }
            }
            CulturalEventAction::RecordAttendance(record) => {
                if matches!(self.status, EventStatus::Planned | EventStatus::Cancelled) {
                    return Err(DomainError::InvalidTransition(format!(
                        "cannot record attendance for a {:?} event",
                        self.status
                    )));
                }
                if let Some(capacity) = self.capacity {
                    require(
                        record.actual <= capacity,
                        "attendance exceeds the event capacity",
                    )?;
                }
                self.attendance = Some(Attendance {
                    expected: record.expected,
                    actual: record.actual,
                    recorded_at: ctx.now,
                });
            }
            CulturalEventAction::Publish => {
                if self.status != EventStatus::Planned {
                    return Err(DomainError::InvalidTransition(format!(
                        "only planned events can be published, event is {:?}",
                        self.status
                    )));
                }
                self.status = EventStatus::Published;
            }
            CulturalEventAction::Cancel(cancellation) => {
                if self.is_closed() {
                    return Err(DomainError::InvalidTransition(format!(
                        "event is already {:?}",
                        self.status
                    )));
                }
                require_text(&cancellation.reason, "cancellation reason")?;
                self.status = EventStatus::Cancelled;
                self.cancellation_reason = Some(cancellation.reason);
            }
        }
        Ok(())
    }

    fn matches(&self, filters: &Self::Filters) -> bool {
        filters.event_type.map_or(true, |t| self.event_type == t)
            && filters.status.map_or(true, |s| self.status == s)
            && filters.from.map_or(true, |from| self.schedule.starts_at >= from)
            && filters.to.map_or(true, |to| self.schedule.starts_at <= to)
    }
}

// Selectors

pub fn by_type<'a>(
    events: impl IntoIterator<Item = &'a CulturalEvent>,
    event_type: EventType,
) -> Vec<CulturalEvent> {
    collect_where(events, |e| e.event_type == event_type)
}

pub fn by_status<'a>(
    events: impl IntoIterator<Item = &'a CulturalEvent>,
    status: EventStatus,
) -> Vec<CulturalEvent> {
    collect_where(events, |e| e.status == status)
}

/// Planned or published events starting after `now`, soonest first
pub fn upcoming<'a>(
    events: impl IntoIterator<Item = &'a CulturalEvent>,
    now: DateTime<Utc>,
) -> Vec<CulturalEvent> {
    let mut upcoming = collect_where(events, |e| {
        matches!(e.status, EventStatus::Planned | EventStatus::Published)
            && e.schedule.starts_at > now
    });
    upcoming.sort_by_key(|e| e.schedule.starts_at);
    upcoming
}

pub fn in_range<'a>(
    events: impl IntoIterator<Item = &'a CulturalEvent>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<CulturalEvent> {
    collect_where(events, |e| {
        e.schedule.starts_at >= from && e.schedule.starts_at <= to
    })
}

/// Planned budget of every event that was not cancelled
pub fn total_budget<'a>(events: impl IntoIterator<Item = &'a CulturalEvent>) -> Decimal {
    events
        .into_iter()
        .filter(|e| e.status != EventStatus::Cancelled)
        .map(|e| e.budget.planned)
        .sum()
}

pub fn total_attendance<'a>(events: impl IntoIterator<Item = &'a CulturalEvent>) -> u64 {
    events
        .into_iter()
        .filter_map(|e| e.attendance.as_ref())
        .map(|a| u64::from(a.actual))
        .sum()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::merge_update;
    use chrono::{Duration, TimeZone};

    pub(crate) fn sample_event(id: &str, event_type: EventType, status: EventStatus) -> CulturalEvent {
        let starts_at = Utc.with_ymd_and_hms(2024, 6, 1, 19, 0, 0).unwrap();
        CulturalEvent {
            id: id.to_string(),
            title: format!("Event {}", id),
            description: None,
            event_type,
            status,
            venue: Venue {
                space_id: None,
                name: "Teatro Municipal".to_string(),
                address: Address::default(),
            },
            schedule: Schedule {
                starts_at,
                ends_at: starts_at + Duration::hours(3),
            },
            capacity: Some(200),
            ticketing: Ticketing::default(),
            budget: Budget {
                planned: Decimal::new(1_000, 0),
                executed: Decimal::ZERO,
                funding_source: None,
            },
            organizer: Organizer {
                name: "Secretaria de Cultura".to_string(),
                contact: ContactInfo::default(),
            },
            participants: Vec::new(),
            attendance: None,
            cancellation_reason: None,
            tags: Vec::new(),
            documents: Vec::new(),
            audit: Audit::new(None),
        }
    }

    #[test]
    fn publish_only_from_planned() {
        let ctx = ActionContext::new(None);
        let mut event = sample_event("1", EventType::Show, EventStatus::Planned);
        event.apply(CulturalEventAction::Publish, &ctx).unwrap();
        assert_eq!(event.status, EventStatus::Published);

        let err = event.apply(CulturalEventAction::Publish, &ctx).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn update_cannot_publish_or_cancel() {
        let cancelled = sample_event("1", EventType::Show, EventStatus::Cancelled);
        let publish = UpdateCulturalEventRequest {
            status: Some(EventStatus::Published),
            ..Default::default()
        };
        let err = merge_update(&cancelled, &publish).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));

        let planned = sample_event("2", EventType::Show, EventStatus::Planned);
        assert!(merge_update(&planned, &publish).is_err());
    }

    #[test]
    fn update_moves_published_event_along() {
        let published = sample_event("1", EventType::Show, EventStatus::Published);
        let ongoing = UpdateCulturalEventRequest {
            status: Some(EventStatus::Ongoing),
            title: Some("Sarau".to_string()),
            ..Default::default()
        };
        let merged = merge_update(&published, &ongoing).unwrap();
        assert_eq!(merged.status, EventStatus::Ongoing);
        assert_eq!(merged.title, "Sarau");
    }

    #[test]
    fn cancelled_event_rejects_participants() {
        let ctx = ActionContext::new(None);
        let mut event = sample_event("1", EventType::Show, EventStatus::Planned);
        event
            .apply(
                CulturalEventAction::Cancel(Cancellation {
                    reason: "rain".to_string(),
                }),
                &ctx,
            )
            .unwrap();
        assert_eq!(event.cancellation_reason.as_deref(), Some("rain"));

        let err = event
            .apply(
                CulturalEventAction::AddParticipant(NewParticipant {
                    name: "Ana".to_string(),
                    role: ParticipantRole::Artist,
                    confirmed: true,
                }),
                &ctx,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn attendance_cannot_exceed_capacity() {
        let ctx = ActionContext::new(None);
        let mut event = sample_event("1", EventType::Show, EventStatus::Published);
        let err = event
            .apply(
                CulturalEventAction::RecordAttendance(AttendanceRecord {
                    expected: None,
                    actual: 201,
                }),
                &ctx,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(event.attendance.is_none());
    }

    #[test]
    fn remove_unknown_participant_is_not_found() {
        let ctx = ActionContext::new(None);
        let mut event = sample_event("1", EventType::Show, EventStatus::Planned);
        let err = event
            .apply(
                CulturalEventAction::RemoveParticipant {
                    participant_id: "missing".to_string(),
                },
                &ctx,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn actions_rebuild_from_their_route() {
        let action = CulturalEventAction::RemoveParticipant {
            participant_id: "p1".to_string(),
        };
        let rebuilt =
            CulturalEventAction::from_route(&action.route(), action.payload().unwrap()).unwrap();
        assert_eq!(rebuilt, action);

        let action = CulturalEventAction::Cancel(Cancellation {
            reason: "storm".to_string(),
        });
        let rebuilt =
            CulturalEventAction::from_route(&action.route(), action.payload().unwrap()).unwrap();
        assert_eq!(rebuilt, action);
    }

    #[test]
    fn selectors_filter_without_mutating() {
        let events = vec![
            sample_event("1", EventType::Show, EventStatus::Published),
            sample_event("2", EventType::Fair, EventStatus::Cancelled),
        ];
        let shows = by_type(&events, EventType::Show);
        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].id, "1");
        assert_eq!(by_type(&events, EventType::Show), shows);
        assert_eq!(total_budget(&events), Decimal::new(1_000, 0));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn upcoming_sorts_by_start() {
        let mut late = sample_event("late", EventType::Show, EventStatus::Published);
        late.schedule.starts_at += Duration::days(2);
        late.schedule.ends_at += Duration::days(2);
        let early = sample_event("early", EventType::Show, EventStatus::Planned);
        let past = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let ids: Vec<String> = upcoming(&[late, early], past)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["early", "late"]);
    }
}
