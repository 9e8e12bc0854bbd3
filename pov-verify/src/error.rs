//! Error types for pov-verify
//!
//! Only two outcomes reach the HTTP boundary: a request that cannot be
//! evaluated (400) and an unexpected fault while evaluating it (500).
//! Rejections are ordinary 200 responses and never pass through here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pov_common::api::types::ErrorResponse;
use pov_common::config::Environment;
use thiserror::Error;
use tracing::error;

use crate::types::ValidationError;

/// Message returned in place of internal detail outside development mode
pub const GENERIC_FAULT: &str = "internal error";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Unexpected fault while verifying (500)
    #[error("verification failed: {0}")]
    VerificationFailed(String),
}

impl ApiError {
    /// Build a 500 for an unexpected fault
    ///
    /// The raw detail is always logged; it is only echoed to the caller in
    /// development mode.
    pub fn internal(environment: Environment, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        error!(error = %detail, "Verification fault");
        if environment.is_development() {
            ApiError::VerificationFailed(detail)
        } else {
            ApiError::VerificationFailed(GENERIC_FAULT.to_string())
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::VerificationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
