//! Location and metadata checks
//!
//! - `geo`: hard gate on distance to the reference point
//! - `metadata`: advisory inspection of embedded tags

pub mod geo;
pub mod metadata;

pub use geo::{haversine_distance, proximity_score, GeoChecker};
pub use metadata::MetadataAnalyzer;
