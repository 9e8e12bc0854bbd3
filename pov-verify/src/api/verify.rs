//! Verification endpoint
//!
//! POST /verify
//!
//! The wire body keeps its historical shape (`submittedLocation` as
//! `{lat, lng}`, `referenceLocation` as `[lng, lat]`); both are normalized
//! to `Coordinate` here before anything else sees them.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use crate::config::VerifyConfig;
use crate::error::{ApiError, ApiResult};
use crate::types::{
    Coordinate, ImageHandle, ValidationError, VerificationRequest, VerificationResult,
};
use crate::AppState;

/// `{lat, lng}` object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireLocation {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// POST /verify request
///
/// Every field is optional at the serde level so that absence is reported
/// as "missing required parameters" rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequestBody {
    pub submitted_photo_path: Option<String>,
    pub reference_photo_path: Option<String>,
    pub submitted_location: Option<WireLocation>,
    /// `[longitude, latitude]`
    pub reference_location: Option<Vec<f64>>,
    pub verification_radius: Option<f64>,
    pub reference_metadata: Option<serde_json::Value>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl VerifyRequestBody {
    /// Validate and normalize into a pipeline request
    pub fn into_request(
        self,
        config: &VerifyConfig,
    ) -> Result<VerificationRequest, ValidationError> {
        let (Some(submitted_path), Some(reference_path), Some(submitted), Some(reference)) = (
            non_empty(self.submitted_photo_path),
            non_empty(self.reference_photo_path),
            self.submitted_location,
            self.reference_location,
        ) else {
            return Err(ValidationError::MissingParameters);
        };

        let (Some(lat), Some(lng)) = (submitted.lat, submitted.lng) else {
            return Err(ValidationError::MissingParameters);
        };
        let submitted_location = Coordinate::new(lat, lng)?;

        let reference_location = match reference.as_slice() {
            [lng, lat] => Coordinate::new(*lat, *lng)?,
            _ => {
                return Err(ValidationError::InvalidCoordinate(format!(
                    "referenceLocation must be [lng, lat], got {} values",
                    reference.len()
                )))
            }
        };

        let radius_m = self
            .verification_radius
            .unwrap_or(config.default_radius_m);
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Err(ValidationError::InvalidRadius(radius_m));
        }

        Ok(VerificationRequest {
            submitted_image: ImageHandle::new(config.resolve_image_path(&submitted_path)),
            reference_image: ImageHandle::new(config.resolve_image_path(&reference_path)),
            submitted_location,
            reference_location,
            radius_m,
            reference_metadata: self.reference_metadata,
        })
    }
}

/// POST /verify
///
/// 200 with the decision (including rejections), 400 for an unusable
/// request, 500 for an unexpected fault.
pub async fn verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequestBody>, JsonRejection>,
) -> ApiResult<Json<VerificationResult>> {
    let Json(body) = body.map_err(|rejection| {
        ApiError::from(ValidationError::MalformedBody(rejection.body_text()))
    })?;
    let request = body.into_request(&state.config)?;

    debug!(
        submitted = ?request.submitted_image.path(),
        reference = ?request.reference_image.path(),
        radius_m = request.radius_m,
        "Verification requested"
    );

    // Decoding and feature extraction are CPU-bound
    let verifier = state.verifier.clone();
    let result = tokio::task::spawn_blocking(move || verifier.verify(&request))
        .await
        .map_err(|e| ApiError::internal(state.config.environment, e.to_string()))??;

    Ok(Json(result))
}

/// Build verification routes
pub fn verify_routes() -> Router<AppState> {
    Router::new().route("/verify", post(verify))
}
