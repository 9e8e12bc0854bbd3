//! Core Types and Trait Definitions for pov-verify
//!
//! Defines the data model of the verification pipeline and the traits behind
//! which the imaging and metadata collaborators sit:
//! - **Inputs:** `Coordinate`, `ImageHandle`, `VerificationRequest`
//! - **Per-stage results:** `GeoCheckResult`, `MetadataCheckResult`, `VisualCheckResult`
//! - **Decision:** `VerificationResult`
//! - **Collaborators:** `ImageLoader`, `MetadataReader`, `Fingerprinter`,
//!   `StructuralSimilarity`, `FeatureDetector`
//!
//! Every value here lives for one request only.

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Inputs
// ============================================================================

/// Point on the globe in decimal degrees
///
/// Serialized as `{"lat": .., "lng": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, enforcing latitude ∈ [-90, 90] and longitude ∈ [-180, 180]
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::InvalidCoordinate(format!(
                "latitude {} out of range [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::InvalidCoordinate(format!(
                "longitude {} out of range [-180, 180]",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Reference to an image on local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle(PathBuf);

impl ImageHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// Validated verification request
///
/// Built from the wire body by `api::verify`; immutable afterwards.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub submitted_image: ImageHandle,
    pub reference_image: ImageHandle,
    pub submitted_location: Coordinate,
    pub reference_location: Coordinate,
    /// Verification radius in meters
    pub radius_m: f64,
    /// Opaque metadata stored alongside the reference photo
    pub reference_metadata: Option<serde_json::Value>,
}

// ============================================================================
// Per-stage results
// ============================================================================

/// Geo Proximity Checker output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoCheckResult {
    pub passed: bool,
    pub distance_meters: f64,
    pub max_distance: f64,
    /// Proximity score (0-100)
    pub score: f64,
}

/// Metadata Plausibility Analyzer output
///
/// Advisory only: carries warnings, never a pass/fail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataCheckResult {
    pub has_metadata: bool,
    pub has_geo_tags: bool,
    pub warnings: Vec<String>,
    /// First few tags as name → display value
    pub preview: BTreeMap<String, String>,
    /// Decoded EXIF GPS position, when present and decodable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedded_location: Option<Coordinate>,
    /// Capture (or fallback modification) timestamp as written in the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_time: Option<String>,
}

/// Visual Similarity Fuser output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualCheckResult {
    pub passed: bool,
    pub reason: Option<String>,
    /// Fused visual score (0-100)
    pub score: f64,
    /// Fingerprint similarity (0-100)
    pub fingerprint_similarity: f64,
    /// Structural score in the metric's native range
    pub structural_score: f64,
    pub keypoint_matches: u32,
}

impl VisualCheckResult {
    /// Failing result with every sub-score zeroed
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
            score: 0.0,
            fingerprint_similarity: 0.0,
            structural_score: 0.0,
            keypoint_matches: 0,
        }
    }
}

// ============================================================================
// Decision
// ============================================================================

/// Per-stage details attached to the decision
///
/// Stages that never ran are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationDetails {
    pub geo: GeoCheckResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataCheckResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual: Option<VisualCheckResult>,
}

/// Final verification decision
///
/// `rejection_reason` is `Some` exactly when `passed` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub passed: bool,
    /// Overall score (0-100), rounded to 2 decimals
    pub score: f64,
    pub details: VerificationDetails,
    pub rejection_reason: Option<String>,
}

// ============================================================================
// Collaborator data
// ============================================================================

/// One embedded metadata tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTag {
    pub name: String,
    pub value: String,
}

/// Tags read from an image file, reduced to what the analyzer inspects
///
/// An empty `tags` list means the file carries no metadata at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedMetadata {
    /// All tags in file order
    pub tags: Vec<MetadataTag>,
    /// Original capture timestamp
    pub date_time_original: Option<String>,
    /// File modification timestamp
    pub date_time: Option<String>,
    /// Software / tool tag
    pub software: Option<String>,
    /// Both GPS latitude and longitude tags are present
    pub has_geotag: bool,
    /// GPS position, when the tags decode to a valid coordinate
    pub geotag: Option<Coordinate>,
}

/// Fixed-length perceptual fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    bits: Vec<u8>,
}

impl Fingerprint {
    pub fn from_bytes(bits: Vec<u8>) -> Self {
        Self { bits }
    }

    /// Largest possible difference: the fingerprint length in bits
    pub fn max_distance(&self) -> u32 {
        (self.bits.len() * 8) as u32
    }

    /// Number of differing bits
    pub fn distance(&self, other: &Fingerprint) -> Result<u32, SignalError> {
        if self.bits.len() != other.bits.len() {
            return Err(SignalError::Computation(format!(
                "fingerprint length mismatch ({} vs {} bytes)",
                self.bits.len(),
                other.bits.len()
            )));
        }
        Ok(self
            .bits
            .iter()
            .zip(&other.bits)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }
}

impl From<u64> for Fingerprint {
    fn from(hash: u64) -> Self {
        Self::from_bytes(hash.to_be_bytes().to_vec())
    }
}

/// 256-bit binary feature descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryDescriptor(pub [u64; 4]);

impl BinaryDescriptor {
    pub fn hamming(&self, other: &BinaryDescriptor) -> u32 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Decodes images from storage
pub trait ImageLoader: Send + Sync {
    fn load(&self, image: &ImageHandle) -> Result<DynamicImage, ImageLoadError>;
}

/// Reads embedded metadata tags
pub trait MetadataReader: Send + Sync {
    fn read(&self, image: &ImageHandle) -> Result<EmbeddedMetadata, MetadataReadError>;
}

/// Computes a perceptual fingerprint of a whole image
pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, image: &DynamicImage) -> Result<Fingerprint, SignalError>;
}

/// Structural similarity of two equally sized grayscale images
pub trait StructuralSimilarity: Send + Sync {
    fn compare(&self, first: &GrayImage, second: &GrayImage) -> Result<f64, SignalError>;
}

/// Detects at most `max_features` keypoints and describes them
pub trait FeatureDetector: Send + Sync {
    fn detect(
        &self,
        image: &GrayImage,
        max_features: usize,
    ) -> Result<Vec<BinaryDescriptor>, SignalError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Malformed or incomplete request; never reaches the pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required parameters")]
    MissingParameters,

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("invalid verification radius: {0}")]
    InvalidRadius(f64),

    #[error("invalid request body: {0}")]
    MalformedBody(String),
}

/// An image could not be decoded; fatal to the visual stage only
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to load {path}: {message}")]
pub struct ImageLoadError {
    pub path: PathBuf,
    pub message: String,
}

/// Metadata could not be read; downgraded to a warning
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetadataReadError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("malformed metadata: {0}")]
    Malformed(String),
}

/// A single visual sub-signal failed; degrades that sub-signal to zero
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("image too small ({width}x{height}, need at least {min}x{min})")]
    ImageTooSmall { width: u32, height: u32, min: u32 },

    #[error("dimension mismatch ({0:?} vs {1:?})")]
    DimensionMismatch((u32, u32), (u32, u32)),

    #[error("{0}")]
    Computation(String),
}
