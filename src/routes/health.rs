use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::app::AppState;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
    environment: String,
    storage: StorageHealth,
}

#[derive(Serialize)]
struct StorageHealth {
    backend: &'static str,
    reachable: bool,
    latency_ms: u128,
}

/// GET /health - public, 503 when the record store does not answer
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let started = Instant::now();
    let reachable = state.records.health_check().await;

    let body = Health {
        status: if reachable { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        environment: format!("{:?}", state.settings.env).to_lowercase(),
        storage: StorageHealth {
            backend: state.records.backend_name(),
            reachable,
            latency_ms: started.elapsed().as_millis(),
        },
    };

    if !reachable {
        tracing::warn!(backend = body.storage.backend, "Health check failed");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    }
    Json(body).into_response()
}
