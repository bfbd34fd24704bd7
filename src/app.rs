use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::TokenVerifier;
use crate::config::Settings;
use crate::db::RecordStore;
use crate::middleware::{request_id_layer, RequestSpan};
use crate::routes;
use crate::services::UploadStore;

/// Everything handlers share
#[derive(Clone)]
pub struct AppState {
    pub records: RecordStore,
    pub settings: Settings,
    pub verifier: TokenVerifier,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(records: RecordStore, settings: Settings) -> Arc<Self> {
        Arc::new(Self {
            verifier: TokenVerifier::from_settings(&settings),
            uploads: UploadStore::new(settings.upload_dir.clone()),
            records,
            settings,
        })
    }
}

/// The portal API with its middleware stack
pub fn create_app(state: Arc<AppState>) -> Router {
    let (set_request_id, propagate_request_id) = request_id_layer();

    let trace = TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Uploads are the largest bodies; the axum default of 2 MiB would cut them off.
    let body_limit = RequestBodyLimitLayer::new(state.settings.max_upload_bytes);

    Router::new()
        .merge(routes::api_router())
        // Applied bottom-up: cors sees the request first
        .layer(DefaultBodyLimit::disable())
        .layer(body_limit)
        .layer(propagate_request_id)
        .layer(trace)
        .layer(set_request_id)
        .layer(cors(&state.settings))
        .with_state(state)
}

fn cors(settings: &Settings) -> CorsLayer {
    let preflight_cache = if settings.env.is_dev() {
        Duration::from_secs(24 * 60 * 60)
    } else {
        Duration::from_secs(60 * 60)
    };

    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([header::LOCATION, HeaderName::from_static("x-request-id")])
        .max_age(preflight_cache);

    // Credentials cannot be combined with a wildcard origin
    if settings.cors_allow_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}
