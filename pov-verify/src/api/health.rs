//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use pov_common::api::types::HealthResponse;

use crate::AppState;

/// Service name reported by /health
pub const SERVICE_NAME: &str = "verification";

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    Json(HealthResponse::healthy(
        SERVICE_NAME,
        env!("CARGO_PKG_VERSION"),
        uptime_seconds,
    ))
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
