//! Zoning area domain types
//!
//! Land-use zones defined by municipal legislation and their urban
//! parameters (height, occupancy, permeability).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    collect_where, decode, guard_status_edit, require, require_text, ActionContext, ActionMethod, ActionRoute,
    Audit, DomainError, Resource, SubResourceAction,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneType {
    Residential,
    Commercial,
    Industrial,
    Mixed,
    Institutional,
    Rural,
    Environmental,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoningStatus {
    Proposed,
    Active,
    Suspended,
    Revoked,
}

impl Default for ZoningStatus {
    fn default() -> Self {
        Self::Proposed
    }
}

/// Urban parameters; rates are fractions between 0 and 1
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UrbanParameters {
    #[serde(default)]
    pub max_height_m: Option<Decimal>,
    #[serde(default)]
    pub max_floors: Option<u16>,
    pub occupancy_rate: Decimal,
    pub utilization_coefficient: Decimal,
    pub permeability_rate: Decimal,
    #[serde(default)]
    pub min_front_setback_m: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// Zoning area entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoningArea {
    pub id: String,
    pub code: String,
    pub name: String,
    pub zone_type: ZoneType,
    pub status: ZoningStatus,
    pub area_m2: Decimal,
    pub parameters: UrbanParameters,
    #[serde(default)]
    pub permitted_uses: Vec<String>,
    #[serde(default)]
    pub restricted_uses: Vec<String>,
    #[serde(default)]
    pub legislation: Option<String>,
    #[serde(default)]
    pub boundaries: Vec<Coordinate>,
    #[serde(default)]
    pub suspension_reason: Option<String>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateZoningAreaRequest {
    pub code: String,
    pub name: String,
    pub zone_type: ZoneType,
    #[serde(default)]
    pub status: ZoningStatus,
    pub area_m2: Decimal,
    pub parameters: UrbanParameters,
    #[serde(default)]
    pub permitted_uses: Vec<String>,
    #[serde(default)]
    pub restricted_uses: Vec<String>,
    #[serde(default)]
    pub legislation: Option<String>,
    #[serde(default)]
    pub boundaries: Vec<Coordinate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateZoningAreaRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<ZoneType>,
    /// Must match the stored status; use activate, suspend or revoke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ZoningStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_m2: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<UrbanParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permitted_uses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restricted_uses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legislation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundaries: Option<Vec<Coordinate>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoningFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<ZoneType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ZoningStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suspension {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ZoningAreaAction {
    Activate,
    Suspend(Suspension),
    Revoke,
}

impl SubResourceAction for ZoningAreaAction {
    fn route(&self) -> ActionRoute {
        match self {
            Self::Activate => ActionRoute::post("activate"),
            Self::Suspend(_) => ActionRoute::post("suspend"),
            Self::Revoke => ActionRoute::post("revoke"),
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Suspend(s) => serde_json::to_value(s),
            Self::Activate | Self::Revoke => Ok(Value::Null),
        }
    }

    fn from_route(route: &ActionRoute, body: Value) -> Result<Self, DomainError> {
        match (route.method, route.segment.as_str(), route.sub_id.as_deref()) {
            (ActionMethod::Post, "activate", None) => Ok(Self::Activate),
            (ActionMethod::Post, "suspend", None) => Ok(Self::Suspend(decode(body)?)),
            (ActionMethod::Post, "revoke", None) => Ok(Self::Revoke),
            _ => Err(DomainError::unknown_action(route)),
        }
    }
}

fn is_rate(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE
}

impl ZoningArea {
    /// Maximum buildable floor area for a lot of `lot_area_m2`
    pub fn max_built_area(&self, lot_area_m2: Decimal) -> Decimal {
        lot_area_m2 * self.parameters.utilization_coefficient
    }
}

impl Resource for ZoningArea {
    const KIND: &'static str = "zoning_areas";
    const PATH: &'static str = "/urban-planning/zoning-areas";
    const ENVELOPE_KEY: &'static str = "zoningArea";

    type Create = CreateZoningAreaRequest;
    type Update = UpdateZoningAreaRequest;
    type Filters = ZoningFilters;
    type Action = ZoningAreaAction;

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
        let area = Self {
            id,
            code: req.code,
            name: req.name,
            zone_type: req.zone_type,
            status: req.status,
            area_m2: req.area_m2,
            parameters: req.parameters,
            permitted_uses: req.permitted_uses,
            restricted_uses: req.restricted_uses,
            legislation: req.legislation,
            boundaries: req.boundaries,
            suspension_reason: None,
            audit,
        };
        area.validate()?;
        Ok(area)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text(&self.code, "code")?;
        require_text(&self.name, "name")?;
        require(self.area_m2 > Decimal::ZERO, "area must be positive")?;
        require(
            is_rate(self.parameters.occupancy_rate) && is_rate(self.parameters.permeability_rate),
            "occupancy and permeability rates must be between 0 and 1",
        )?;
        require(
            self.parameters.occupancy_rate + self.parameters.permeability_rate <= Decimal::ONE,
            "occupancy and permeability rates exceed the lot",
        )?;
        require(
            self.parameters.utilization_coefficient >= Decimal::ZERO,
            "utilization coefficient must not be negative",
        )?;
        require(
            self.boundaries.is_empty() || self.boundaries.len() >= 3,
            "a boundary polygon needs at least three points",
        )
    }

    fn reconcile(&mut self, previous: &Self) -> Result<(), DomainError> {
        guard_status_edit(previous.status, self.status, |_, _| false)
    }

    fn apply(&mut self, action: Self::Action, _ctx: &ActionContext) -> Result<(), DomainError> {
        match (action, self.status) {
            (_, ZoningStatus::Revoked) => {
                return Err(DomainError::InvalidTransition(
                    "zoning area was revoked".to_string(),
                ));
            }
            (ZoningAreaAction::Activate, ZoningStatus::Proposed | ZoningStatus::Suspended) => {
                self.status = ZoningStatus::Active;
                self.suspension_reason = None;
            }
            (ZoningAreaAction::Suspend(suspension), ZoningStatus::Active) => {
                require_text(&suspension.reason, "suspension reason")?;
                self.status = ZoningStatus::Suspended;
                self.suspension_reason = Some(suspension.reason);
            }
            (ZoningAreaAction::Revoke, _) => {
                self.status = ZoningStatus::Revoked;
            }
            (action, status) => {
                return Err(DomainError::InvalidTransition(format!(
                    "cannot {:?} a {:?} zoning area",
                    action.route().segment,
                    status
                )));
            }
        }
        Ok(())
    }

    fn matches(&self, filters: &Self::Filters) -> bool {
        filters.zone_type.map_or(true, |t| self.zone_type == t)
            && filters.status.map_or(true, |s| self.status == s)
    }
}

// Selectors

pub fn by_type<'a>(
    areas: impl IntoIterator<Item = &'a ZoningArea>,
    zone_type: ZoneType,
) -> Vec<ZoningArea> {
    collect_where(areas, |a| a.zone_type == zone_type)
}

pub fn active<'a>(areas: impl IntoIterator<Item = &'a ZoningArea>) -> Vec<ZoningArea> {
    collect_where(areas, |a| a.status == ZoningStatus::Active)
}

pub fn permitting_use<'a>(
    areas: impl IntoIterator<Item = &'a ZoningArea>,
    land_use: &str,
) -> Vec<ZoningArea> {
    collect_where(areas, |a| {
        a.status == ZoningStatus::Active
            && a.permitted_uses.iter().any(|u| u.eq_ignore_ascii_case(land_use))
    })
}

pub fn total_area<'a>(areas: impl IntoIterator<Item = &'a ZoningArea>) -> Decimal {
    areas.into_iter().map(|a| a.area_m2).sum()
}
