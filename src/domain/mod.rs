//! Domain types and the resource contract
//!
//! Every secretariat entity implements [`Resource`]. The same definitions drive
//! the REST handlers and the client-side stores, so the wire shape of an entity
//! is declared exactly once.

pub mod artist_groups;
pub mod artists;
pub mod athletes;
pub mod common;
pub mod construction_licenses;
pub mod cultural_events;
pub mod cultural_spaces;
pub mod cultural_workshops;
pub mod families;
pub mod rural_producers;
pub mod urban_plans;
pub mod zoning_areas;

pub use artist_groups::ArtistGroup;
pub use artists::Artist;
pub use athletes::Athlete;
pub use common::*;
pub use construction_licenses::ConstructionLicense;
pub use cultural_events::CulturalEvent;
pub use cultural_spaces::CulturalSpace;
pub use cultural_workshops::CulturalWorkshop;
pub use families::Family;
pub use rural_producers::RuralProducer;
pub use urban_plans::UrbanPlan;
pub use zoning_areas::ZoningArea;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Fields owned by the server. Partial updates never overwrite them.
const PROTECTED_FIELDS: [&str; 4] = ["id", "created_at", "updated_at", "created_by"];

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl DomainError {
    pub fn unknown_action(route: &ActionRoute) -> Self {
        Self::UnknownAction(format!("{:?} {}", route.method, route.segment))
    }
}

/// HTTP verb of a sub-resource action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMethod {
    Post,
    Put,
    Delete,
}

/// Location of a sub-resource action relative to its parent record:
/// `{PATH}/{id}/{segment}` or `{PATH}/{id}/{segment}/{sub_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRoute {
    pub method: ActionMethod,
    pub segment: String,
    pub sub_id: Option<String>,
}

impl ActionRoute {
    pub fn new(method: ActionMethod, segment: impl Into<String>, sub_id: Option<String>) -> Self {
        Self {
            method,
            segment: segment.into(),
            sub_id,
        }
    }

    pub fn post(segment: &str) -> Self {
        Self::new(ActionMethod::Post, segment, None)
    }

    pub fn put(segment: &str) -> Self {
        Self::new(ActionMethod::Put, segment, None)
    }

    pub fn put_item(segment: &str, sub_id: &str) -> Self {
        Self::new(ActionMethod::Put, segment, Some(sub_id.to_string()))
    }

    pub fn delete_item(segment: &str, sub_id: &str) -> Self {
        Self::new(ActionMethod::Delete, segment, Some(sub_id.to_string()))
    }

    /// Request path for this action on the record `id` under `base`
    pub fn path(&self, base: &str, id: &str) -> String {
        match &self.sub_id {
            Some(sub_id) => format!("{}/{}/{}/{}", base, id, self.segment, sub_id),
            None => format!("{}/{}/{}", base, id, self.segment),
        }
    }
}

/// Server-side context handed to [`Resource::apply`]
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub now: DateTime<Utc>,
    pub actor: Option<String>,
}

impl ActionContext {
    pub fn new(actor: Option<String>) -> Self {
        Self {
            now: Utc::now(),
            actor,
        }
    }

    /// Identifier for a nested record created by an action
    pub fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// A tagged sub-resource mutation of one entity type.
///
/// `route` and `payload` describe the request a client sends; `from_route`
/// rebuilds the same variant on the server side.
pub trait SubResourceAction: Send + Sync + Sized + 'static {
    fn route(&self) -> ActionRoute;

    fn payload(&self) -> Result<Value, serde_json::Error>;

    fn from_route(route: &ActionRoute, body: Value) -> Result<Self, DomainError>;
}

/// Action type for entities without sub-resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoAction {}

impl SubResourceAction for NoAction {
    fn route(&self) -> ActionRoute {
        match *self {}
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match *self {}
    }

    fn from_route(route: &ActionRoute, _body: Value) -> Result<Self, DomainError> {
        Err(DomainError::unknown_action(route))
    }
}

/// Contract shared by every entity exposed through the portal.
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Storage discriminator
    const KIND: &'static str;

    /// Route prefix, e.g. `/culture/events`
    const PATH: &'static str;

    /// Named key older endpoints wrap a single record in
    const ENVELOPE_KEY: &'static str;

    type Create: Serialize + DeserializeOwned + Send + Sync + 'static;
    type Update: Serialize + DeserializeOwned + Default + Send + Sync + 'static;
    type Filters: Serialize + DeserializeOwned + Default + Send + Sync + 'static;
    type Action: SubResourceAction;

    fn id(&self) -> &str;

    fn audit(&self) -> &Audit;

    fn audit_mut(&mut self) -> &mut Audit;

    fn from_create(id: String, audit: Audit, req: Self::Create) -> Result<Self, DomainError>;

    fn validate(&self) -> Result<(), DomainError> {
        Ok(())
    }

    fn apply(&mut self, action: Self::Action, ctx: &ActionContext) -> Result<(), DomainError>;

    /// Check the result of a partial update against the stored record
    /// `previous`, and recompute derived state. State owned by actions must
    /// not move here.
    fn reconcile(&mut self, _previous: &Self) -> Result<(), DomainError> {
        Ok(())
    }

    fn matches(&self, filters: &Self::Filters) -> bool;

    /// Uploaded documents, for entities that accept file uploads
    fn documents_mut(&mut self) -> Option<&mut Vec<Document>> {
        None
    }
}

/// Merge a partial update into `current` and re-validate the result.
pub fn merge_update<R: Resource>(current: &R, update: &R::Update) -> Result<R, DomainError> {
    let mut target = serde_json::to_value(current)?;
    let mut patch = serde_json::to_value(update)?;

    if let Value::Object(fields) = &mut patch {
        for key in PROTECTED_FIELDS {
            fields.remove(key);
        }
    }

    merge_patch(&mut target, patch);

    let mut merged: R = serde_json::from_value(target)?;
    merged.reconcile(current)?;
    merged.validate()?;
    Ok(merged)
}

/// JSON merge patch (RFC 7386): objects merge recursively, `null` removes a key,
/// anything else replaces the target.
pub fn merge_patch(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(patch) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(fields) = target {
                for (key, value) in patch {
                    if value.is_null() {
                        fields.remove(&key);
                    } else {
                        merge_patch(fields.entry(key).or_insert(Value::Null), value);
                    }
                }
            }
        }
        other => *target = other,
    }
}

/// Reject a status change a partial update may not make. Keeping the status
/// is always allowed; `allowed` decides the rest.
pub(crate) fn guard_status_edit<S, F>(from: S, to: S, allowed: F) -> Result<(), DomainError>
where
    S: Copy + PartialEq + std::fmt::Debug,
    F: Fn(S, S) -> bool,
{
    if from == to || allowed(from, to) {
        return Ok(());
    }
    Err(DomainError::InvalidTransition(format!(
        "status cannot change from {:?} to {:?} by update",
        from, to
    )))
}

pub(crate) fn decode<T: DeserializeOwned>(body: Value) -> Result<T, DomainError> {
    Ok(serde_json::from_value(body)?)
}

pub(crate) fn require(condition: bool, message: &str) -> Result<(), DomainError> {
    if condition {
        Ok(())
    } else {
        Err(DomainError::Validation(message.to_string()))
    }
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<(), DomainError> {
    require(!value.trim().is_empty(), &format!("{} must not be empty", field))
}

/// Owned copies of the records matching `predicate`, in input order
pub(crate) fn collect_where<'a, T, I, F>(items: I, predicate: F) -> Vec<T>
where
    T: Clone + 'a,
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> bool,
{
    items.into_iter().filter(|item| predicate(item)).cloned().collect()
}
