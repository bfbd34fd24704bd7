pub mod health;
pub mod me;
pub mod resources;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::app::AppState;
use crate::domain::{
    Artist, ArtistGroup, Athlete, ConstructionLicense, CulturalEvent, CulturalSpace,
    CulturalWorkshop, Family, RuralProducer, UrbanPlan, ZoningArea,
};
use resources::resource_router;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Protected routes
        .route("/me", get(me::get_me))
        // Culture
        .merge(resource_router::<CulturalEvent>())
        .merge(resource_router::<Artist>())
        .merge(resource_router::<CulturalSpace>())
        .merge(resource_router::<CulturalWorkshop>())
        .merge(resource_router::<ArtistGroup>())
        // Sports
        .merge(resource_router::<Athlete>())
        // Urban planning
        .merge(resource_router::<ZoningArea>())
        .merge(resource_router::<ConstructionLicense>())
        .merge(resource_router::<UrbanPlan>())
        // Social assistance
        .merge(resource_router::<Family>())
        // Agriculture
        .merge(resource_router::<RuralProducer>())
}
