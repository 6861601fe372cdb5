use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::{AppState, StoreBackend};

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Whether the schedule store is reachable.
    pub db_healthy: bool,
}

/// GET /health -- returns service and store health.
async fn health_check<S: StoreBackend>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    let db_healthy = state.planning.store().ping().await;
    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router<S: StoreBackend>() -> Router<AppState<S>> {
    Router::new().route("/health", get(health_check::<S>))
}
