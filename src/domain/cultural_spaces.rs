//! Cultural space domain types
//!
//! Theaters, libraries, museums and other venues, with their booking calendar.
//! Bookings that are still requested or confirmed block the interval for any
//! new request.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    collect_where, decode, overlaps, require, require_text, ActionContext, ActionMethod,
    ActionRoute, Address, Audit, ContactInfo, DomainError, Resource, SubResourceAction,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpaceType {
    Theater,
    Library,
    Museum,
    CulturalCenter,
    Auditorium,
    Gallery,
    OpenAir,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpaceStatus {
    Available,
    UnderMaintenance,
    Closed,
}

impl Default for SpaceStatus {
    fn default() -> Self {
        Self::Available
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Requested,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpeningHours {
    pub weekday: Weekday,
    pub opens: NaiveTime,
    pub closes: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub title: String,
    pub requester: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: BookingStatus,
    #[serde(default)]
    pub event_id: Option<String>,
}

impl Booking {
    fn blocks(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
        self.status != BookingStatus::Cancelled
            && overlaps(self.starts_at, self.ends_at, starts_at, ends_at)
    }
}

/// Cultural space entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CulturalSpace {
    pub id: String,
    pub name: String,
    pub space_type: SpaceType,
    pub status: SpaceStatus,
    pub address: Address,
    pub capacity: u32,
    #[serde(default)]
    pub accessible: bool,
    #[serde(default)]
    pub facilities: Vec<String>,
    #[serde(default)]
    pub opening_hours: Vec<OpeningHours>,
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub bookings: Vec<Booking>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCulturalSpaceRequest {
    pub name: String,
    pub space_type: SpaceType,
    pub address: Address,
    pub capacity: u32,
    #[serde(default)]
    pub accessible: bool,
    #[serde(default)]
    pub facilities: Vec<String>,
    #[serde(default)]
    pub opening_hours: Vec<OpeningHours>,
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(default)]
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCulturalSpaceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_type: Option<SpaceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SpaceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facilities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<Vec<OpeningHours>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpaceFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_type: Option<SpaceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SpaceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_capacity: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingRequest {
    pub title: String,
    pub requester: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub event_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CulturalSpaceAction {
    RequestBooking(BookingRequest),
    ConfirmBooking { booking_id: String },
    CancelBooking { booking_id: String },
}

impl SubResourceAction for CulturalSpaceAction {
    fn route(&self) -> ActionRoute {
        match self {
            Self::RequestBooking(_) => ActionRoute::post("bookings"),
            Self::ConfirmBooking { booking_id } => ActionRoute::put_item("bookings", booking_id),
            Self::CancelBooking { booking_id } => ActionRoute::delete_item("bookings", booking_id),
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::RequestBooking(req) => serde_json::to_value(req),
            Self::ConfirmBooking { .. } | Self::CancelBooking { .. } => Ok(Value::Null),
        }
    }

    fn from_route(route: &ActionRoute, body: Value) -> Result<Self, DomainError> {
        match (route.method, route.segment.as_str(), route.sub_id.as_deref()) {
            (ActionMethod::Post, "bookings", None) => Ok(Self::RequestBooking(decode(body)?)),
            (ActionMethod::Put, "bookings", Some(id)) => Ok(Self::ConfirmBooking {
                booking_id: id.to_string(),
            }),
            (ActionMethod::Delete, "bookings", Some(id)) => Ok(Self::CancelBooking {
                booking_id: id.to_string(),
            }),
            _ => Err(DomainError::unknown_action(route)),
        }
    }
}

impl CulturalSpace {
    /// Whether no live booking intersects `[starts_at, ends_at)`
    pub fn is_free(&self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> bool {
        !self.bookings.iter().any(|b| b.blocks(starts_at, ends_at))
    }

    fn booking_mut(&mut self, booking_id: &str) -> Result<&mut Booking, DomainError> {
        self.bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| DomainError::NotFound(format!("booking {}", booking_id)))
    }
}

impl Resource for CulturalSpace {
    const KIND: &'static str = "cultural_spaces";
    const PATH: &'static str = "/culture/spaces";
    const ENVELOPE_KEY: &'static str = "space";

    type Create = CreateCulturalSpaceRequest;
    type Update = UpdateCulturalSpaceRequest;
    type Filters = SpaceFilters;
    type Action = CulturalSpaceAction;

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
        let space = Self {
            id,
            name: req.name,
            space_type: req.space_type,
            status: SpaceStatus::default(),
            address: req.address,
            capacity: req.capacity,
            accessible: req.accessible,
            facilities: req.facilities,
            opening_hours: req.opening_hours,
            manager: req.manager,
            contact: req.contact,
            bookings: Vec::new(),
            audit,
        };
        space.validate()?;
        Ok(space)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text(&self.name, "name")?;
        require(self.capacity > 0, "capacity must be positive")?;
        require(
            self.opening_hours.iter().all(|h| h.opens < h.closes),
            "opening hours must open before they close",
        )
    }

    fn apply(&mut self, action: Self::Action, ctx: &ActionContext) -> Result<(), DomainError> {
        match action {
            CulturalSpaceAction::RequestBooking(req) => {
                if self.status != SpaceStatus::Available {
                    return Err(DomainError::InvalidTransition(format!(
                        "space is {:?} and cannot be booked",
                        self.status
                    )));
                }
                require_text(&req.title, "booking title")?;
                require(req.starts_at < req.ends_at, "booking must end after it starts")?;
                if !self.is_free(req.starts_at, req.ends_at) {
                    return Err(DomainError::Conflict(
                        "space is already booked for that interval".to_string(),
                    ));
                }
                self.bookings.push(Booking {
                    id: ctx.new_id(),
                    title: req.title,
                    requester: req.requester,
                    starts_at: req.starts_at,
                    ends_at: req.ends_at,
                    status: BookingStatus::Requested,
                    event_id: req.event_id,
                });
            }
            CulturalSpaceAction::ConfirmBooking { booking_id } => {
                let booking = self.booking_mut(&booking_id)?;
                if booking.status != BookingStatus::Requested {
                    return Err(DomainError::InvalidTransition(format!(
                        "booking is {:?}",
                        booking.status
                    )));
                }
                booking.status = BookingStatus::Confirmed;
            }
            CulturalSpaceAction::CancelBooking { booking_id } => {
                let booking = self.booking_mut(&booking_id)?;
                booking.status = BookingStatus::Cancelled;
            }
        }
        Ok(())
    }

    fn matches(&self, filters: &Self::Filters) -> bool {
        filters.space_type.map_or(true, |t| self.space_type == t)
            && filters.status.map_or(true, |s| self.status == s)
            && filters.min_capacity.map_or(true, |c| self.capacity >= c)
    }
}

// Selectors

pub fn by_type<'a>(
    spaces: impl IntoIterator<Item = &'a CulturalSpace>,
    space_type: SpaceType,
) -> Vec<CulturalSpace> {
    collect_where(spaces, |s| s.space_type == space_type)
}

pub fn available<'a>(spaces: impl IntoIterator<Item = &'a CulturalSpace>) -> Vec<CulturalSpace> {
    collect_where(spaces, |s| s.status == SpaceStatus::Available)
}

/// Available spaces with room for `audience` and no booking in the interval
pub fn free_between<'a>(
    spaces: impl IntoIterator<Item = &'a CulturalSpace>,
    audience: u32,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Vec<CulturalSpace> {
    collect_where(spaces, |s| {
        s.status == SpaceStatus::Available
            && s.capacity >= audience
            && s.is_free(starts_at, ends_at)
    })
}

pub fn total_capacity<'a>(spaces: impl IntoIterator<Item = &'a CulturalSpace>) -> u64 {
    spaces.into_iter().map(|s| u64::from(s.capacity)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn space() -> CulturalSpace {
        CulturalSpace {
            id: "s1".to_string(),
            name: "Casa de Cultura".to_string(),
            space_type: SpaceType::CulturalCenter,
            status: SpaceStatus::Available,
            address: Address::default(),
            capacity: 120,
            accessible: true,
            facilities: vec!["stage".to_string()],
            opening_hours: Vec::new(),
            manager: None,
            contact: ContactInfo::default(),
            bookings: Vec::new(),
            audit: Audit::new(None),
        }
    }

    fn booking(start_hour: u32, end_hour: u32) -> CulturalSpaceAction {
        let t = |h| Utc.with_ymd_and_hms(2024, 7, 10, h, 0, 0).unwrap();
        CulturalSpaceAction::RequestBooking(BookingRequest {
            title: "Recital".to_string(),
            requester: "Escola Municipal".to_string(),
            starts_at: t(start_hour),
            ends_at: t(end_hour),
            event_id: None,
        })
    }

    #[test]
    fn overlapping_booking_conflicts() {
        let ctx = ActionContext::new(None);
        let mut s = space();
        s.apply(booking(10, 12), &ctx).unwrap();
        let err = s.apply(booking(11, 13), &ctx).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        s.apply(booking(12, 14), &ctx).unwrap();
        assert_eq!(s.bookings.len(), 2);
    }

    #[test]
    fn cancelled_booking_frees_the_slot() {
        let ctx = ActionContext::new(None);
        let mut s = space();
        s.apply(booking(10, 12), &ctx).unwrap();
        let booking_id = s.bookings[0].id.clone();
        s.apply(CulturalSpaceAction::CancelBooking { booking_id }, &ctx)
            .unwrap();
        s.apply(booking(10, 12), &ctx).unwrap();
        assert_eq!(s.bookings.len(), 2);
    }

    #[test]
    fn confirm_requires_requested_booking() {
        let ctx = ActionContext::new(None);
        let mut s = space();
        s.apply(booking(10, 12), &ctx).unwrap();
        let booking_id = s.bookings[0].id.clone();
        s.apply(
            CulturalSpaceAction::ConfirmBooking {
                booking_id: booking_id.clone(),
            },
            &ctx,
        )
        .unwrap();
        let err = s
            .apply(CulturalSpaceAction::ConfirmBooking { booking_id }, &ctx)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn maintenance_blocks_bookings() {
        let ctx = ActionContext::new(None);
        let mut s = space();
        s.status = SpaceStatus::UnderMaintenance;
        assert!(s.apply(booking(10, 12), &ctx).is_err());
        assert!(available(&[s]).is_empty());
    }
}
