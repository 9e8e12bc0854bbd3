//! Verification Orchestrator
//!
//! Runs one request through the fixed stage sequence:
//!
//! ```text
//! RECEIVED → GEO_GATE ─┬─ reject
//!                      └─ METADATA (advisory) → VISUAL_GATE ─┬─ reject
//!                                                            └─ SCORE → DECISION
//! ```
//!
//! Stages run strictly in order on the calling thread. The orchestrator
//! holds no per-request state, so one instance serves concurrent requests.

use std::sync::Arc;

use pov_common::config::PolicySettings;
use tracing::{debug, info};

use crate::checks::{haversine_distance, GeoChecker, MetadataAnalyzer};
use crate::config::VerifyConfig;
use crate::extractors::{
    DctFingerprinter, ExifMetadataReader, FastBriefDetector, FsImageLoader, WindowedSsim,
};
use crate::fusion::VisualFuser;
use crate::types::{
    MetadataCheckResult, ValidationError, VerificationDetails, VerificationRequest,
    VerificationResult,
};

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Weighted overall score from the geo and visual stage scores
pub fn overall_score(policy: &PolicySettings, geo_score: f64, visual_score: f64) -> f64 {
    round2(geo_score * policy.geo_weight + visual_score * policy.visual_weight)
}

pub struct Verifier {
    geo: GeoChecker,
    metadata: MetadataAnalyzer,
    visual: VisualFuser,
    policy: PolicySettings,
}

impl Verifier {
    pub fn new(metadata: MetadataAnalyzer, visual: VisualFuser, policy: PolicySettings) -> Self {
        Self {
            geo: GeoChecker::new(),
            metadata,
            visual,
            policy,
        }
    }

    /// Verifier wired to the filesystem loader, EXIF reader and the
    /// built-in visual signals
    pub fn with_defaults(config: &VerifyConfig) -> Self {
        let metadata =
            MetadataAnalyzer::new(Arc::new(ExifMetadataReader), config.metadata.clone());
        let visual = VisualFuser::new(
            Arc::new(FsImageLoader),
            Arc::new(DctFingerprinter::new()),
            Arc::new(WindowedSsim::default()),
            Arc::new(FastBriefDetector::default()),
            config.policy.clone(),
        );
        Self::new(metadata, visual, config.policy.clone())
    }

    /// Run the full pipeline for one request
    ///
    /// Rejections are ordinary `Ok` results; only a request that cannot be
    /// evaluated at all (such as a negative radius) is an error.
    pub fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationResult, ValidationError> {
        if !request.radius_m.is_finite() || request.radius_m < 0.0 {
            return Err(ValidationError::InvalidRadius(request.radius_m));
        }

        // Geo gate
        let geo = self.geo.check(
            request.submitted_location,
            request.reference_location,
            request.radius_m,
        );
        if !geo.passed {
            let reason = format!(
                "location outside valid area ({:.0} m away)",
                geo.distance_meters
            );
            info!(
                distance_m = geo.distance_meters,
                radius_m = request.radius_m,
                "Rejected at geo gate"
            );
            return Ok(VerificationResult {
                passed: false,
                score: 0.0,
                details: VerificationDetails {
                    geo,
                    metadata: None,
                    visual: None,
                },
                rejection_reason: Some(reason),
            });
        }

        // Metadata (advisory)
        let mut metadata = self.metadata.analyze(&request.submitted_image);
        self.check_geotag(&mut metadata, request);

        // Visual gate
        let visual = self
            .visual
            .fuse(&request.submitted_image, &request.reference_image);
        if !visual.passed {
            let reason = visual
                .reason
                .clone()
                .unwrap_or_else(|| "visual verification failed".to_string());
            info!(reason = %reason, "Rejected at visual gate");
            return Ok(VerificationResult {
                passed: false,
                score: 0.0,
                details: VerificationDetails {
                    geo,
                    metadata: Some(metadata),
                    visual: Some(visual),
                },
                rejection_reason: Some(reason),
            });
        }

        // Score and decide
        let score = overall_score(&self.policy, geo.score, visual.score);
        let passed = score >= self.policy.min_overall_score;
        let rejection_reason = (!passed)
            .then(|| format!("overall verification score too low ({:.2}/100)", score));

        debug!(
            geo_score = geo.score,
            visual_score = visual.score,
            score,
            passed,
            "Verification scored"
        );
        if !passed {
            info!(score, "Rejected on overall score");
        }

        Ok(VerificationResult {
            passed,
            score,
            details: VerificationDetails {
                geo,
                metadata: Some(metadata),
                visual: Some(visual),
            },
            rejection_reason,
        })
    }

    /// Warn when the photo's own geotag disagrees with the submitted location
    fn check_geotag(&self, metadata: &mut MetadataCheckResult, request: &VerificationRequest) {
        let Some(embedded) = metadata.embedded_location else {
            return;
        };
        let distance = haversine_distance(embedded, request.submitted_location);
        if distance > request.radius_m {
            metadata.warnings.push(format!(
                "embedded geotag is {:.0} m from submitted location",
                distance
            ));
        }
    }
}
