//! Metadata Plausibility Analyzer
//!
//! Inspects the submitted photo's embedded tags for red flags. Everything
//! it finds is advisory: the result carries warnings and never a verdict,
//! and read failures are folded into a warning instead of propagating.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use pov_common::config::MetadataSettings;
use tracing::{debug, warn};

use crate::types::{EmbeddedMetadata, ImageHandle, MetadataCheckResult, MetadataReader};

/// EXIF timestamp layouts: raw tag text and the dashed display form
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parse an EXIF timestamp, read as UTC
pub fn parse_exif_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim().trim_matches('"').trim_end_matches('\0');
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub struct MetadataAnalyzer {
    reader: Arc<dyn MetadataReader>,
    settings: MetadataSettings,
}

impl MetadataAnalyzer {
    pub fn new(reader: Arc<dyn MetadataReader>, settings: MetadataSettings) -> Self {
        Self { reader, settings }
    }

    /// Analyze against the current wall clock
    pub fn analyze(&self, image: &ImageHandle) -> MetadataCheckResult {
        self.analyze_at(image, Utc::now())
    }

    /// Analyze with an explicit "now" for the capture-age rule
    pub fn analyze_at(&self, image: &ImageHandle, now: DateTime<Utc>) -> MetadataCheckResult {
        match self.reader.read(image) {
            Ok(metadata) => self.inspect(metadata, now),
            Err(e) => {
                warn!(file = ?image.path(), error = %e, "Metadata read failed");
                MetadataCheckResult {
                    has_metadata: false,
                    has_geo_tags: false,
                    warnings: vec![format!("metadata read error: {}", e)],
                    ..Default::default()
                }
            }
        }
    }

    fn inspect(&self, metadata: EmbeddedMetadata, now: DateTime<Utc>) -> MetadataCheckResult {
        let mut warnings = Vec::new();

        if metadata.tags.is_empty() {
            warnings.push("no metadata found".to_string());
        }

        let capture_time = metadata
            .date_time_original
            .clone()
            .or_else(|| metadata.date_time.clone());

        match &capture_time {
            None => warnings.push("no timestamp in metadata".to_string()),
            Some(raw) => {
                if let Some(warning) = self.check_capture_age(raw, now) {
                    warnings.push(warning);
                }
            }
        }

        if let Some(software) = &metadata.software {
            let lowered = software.to_lowercase();
            let edited = self
                .settings
                .editing_tools
                .iter()
                .any(|tool| !tool.is_empty() && lowered.contains(&tool.to_lowercase()));
            if edited {
                warnings.push(format!("photo may have been edited ({})", software.trim()));
            }
        }

        let mut preview = BTreeMap::new();
        for tag in &metadata.tags {
            if preview.len() >= self.settings.preview_limit {
                break;
            }
            preview
                .entry(tag.name.clone())
                .or_insert_with(|| tag.value.clone());
        }

        debug!(
            tags = metadata.tags.len(),
            has_geotag = metadata.has_geotag,
            warnings = warnings.len(),
            "Metadata analyzed"
        );

        MetadataCheckResult {
            has_metadata: !metadata.tags.is_empty(),
            has_geo_tags: metadata.has_geotag,
            warnings,
            preview,
            embedded_location: metadata.geotag,
            capture_time,
        }
    }

    fn check_capture_age(&self, raw: &str, now: DateTime<Utc>) -> Option<String> {
        let max_hours = self.settings.max_capture_age_hours?;
        let Some(captured) = parse_exif_timestamp(raw) else {
            return Some("unreadable timestamp in metadata".to_string());
        };
        // A limit too large for i64 seconds can never be exceeded
        let max_seconds = i64::try_from(max_hours)
            .ok()
            .and_then(|h| h.checked_mul(3600))?;
        let age = now.signed_duration_since(captured);
        (age.num_seconds() > max_seconds)
            .then(|| format!("photo capture time is older than {} hours", max_hours))
    }
}
