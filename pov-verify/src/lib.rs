//! pov-verify library interface
//!
//! Photo location verification: a geo gate, an advisory metadata pass and
//! a visual gate over the submitted and reference photos, served over HTTP.

pub mod api;
pub mod checks;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fusion;
pub mod types;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::VerifyConfig;
use crate::workflow::Verifier;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration, read-only after startup
    pub config: Arc<VerifyConfig>,
    /// Verification pipeline
    pub verifier: Arc<Verifier>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State with the default collaborators
    pub fn new(config: VerifyConfig) -> Self {
        let verifier = Verifier::with_defaults(&config);
        Self::with_verifier(config, verifier)
    }

    /// State around an explicitly assembled verifier
    pub fn with_verifier(config: VerifyConfig, verifier: Verifier) -> Self {
        Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::verify_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
