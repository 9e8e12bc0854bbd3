//! Shared API request/response types
//!
//! Bodies that every POV service answers with, independent of its own
//! endpoints.

use serde::{Deserialize, Serialize};

// ========================================
// Health
// ========================================

/// Health check response
///
/// # Examples
///
/// ```
/// use pov_common::api::types::HealthResponse;
///
/// let health = HealthResponse::healthy("verification", "0.1.0", 12);
/// let json = serde_json::to_value(&health).unwrap();
/// assert_eq!(json["status"], "healthy");
/// assert_eq!(json["uptimeSeconds"], 12);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always "healthy" while the process is serving requests
    pub status: String,
    /// Service name
    pub service: String,
    /// Crate version of the answering service
    pub version: String,
    /// Seconds since the service started
    pub uptime_seconds: u64,
}

impl HealthResponse {
    pub fn healthy(service: &str, version: &str, uptime_seconds: u64) -> Self {
        Self {
            status: "healthy".to_string(),
            service: service.to_string(),
            version: version.to_string(),
            uptime_seconds,
        }
    }
}

// ========================================
// Error Response Types
// ========================================

/// Flat error body: `{"error": "<message>"}`
///
/// # Examples
///
/// ```
/// use pov_common::api::types::ErrorResponse;
///
/// let body = ErrorResponse::new("missing required parameters");
/// assert_eq!(
///     serde_json::to_string(&body).unwrap(),
///     r#"{"error":"missing required parameters"}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
