//! Configuration loading and config-file resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Tiers 1 and 2 are handled by each service's argument parser; this module
//! owns the TOML model, its defaults and where the file lives.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "pov";

/// Default listening port
pub const DEFAULT_PORT: u16 = 5000;

/// Default GPS verification radius in meters
pub const DEFAULT_RADIUS_M: f64 = 50.0;

// ============================================================================
// Environment
// ============================================================================

/// Deployment environment
///
/// Development mode only changes diagnostics (log verbosity and whether raw
/// internal error text reaches HTTP clients); it never changes a decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            other => Err(format!(
                "unknown environment '{}' (expected 'production' or 'development')",
                other
            )),
        }
    }
}

// ============================================================================
// TOML model
// ============================================================================

/// Contents of `pov-verify.toml`
///
/// Every section is optional; missing keys fall back to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub environment: Option<Environment>,
    pub bind_addr: Option<String>,
    /// Base directory for relative photo paths
    pub image_root: Option<PathBuf>,
    pub verification: VerificationSettings,
    pub policy: PolicySettings,
    pub metadata: MetadataSettings,
}

/// `[verification]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationSettings {
    /// Radius used when a request does not carry one (meters)
    pub default_radius_m: f64,
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            default_radius_m: DEFAULT_RADIUS_M,
        }
    }
}

/// `[policy]` section: decision thresholds and weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// Fingerprint similarity (0-100) that passes the visual gate on its own
    pub min_fingerprint_similarity: f64,
    /// Structural score required by the second visual disjunct
    pub min_structural_score: f64,
    /// Keypoint matches required by the second visual disjunct
    pub min_keypoint_matches: u32,
    /// Overall score (0-100) required to pass
    pub min_overall_score: f64,
    pub geo_weight: f64,
    pub visual_weight: f64,
    pub fingerprint_weight: f64,
    pub structural_weight: f64,
    pub keypoint_weight: f64,
    /// Match count at which the keypoint term reaches 100
    pub keypoint_saturation: u32,
    /// Feature detector cap per image
    pub max_features: usize,
    /// Matches at or above this Hamming distance are discarded
    pub max_match_distance: u32,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            min_fingerprint_similarity: 85.0,
            min_structural_score: 0.6,
            min_keypoint_matches: 10,
            min_overall_score: 70.0,
            geo_weight: 0.3,
            visual_weight: 0.7,
            fingerprint_weight: 0.3,
            structural_weight: 0.4,
            keypoint_weight: 0.3,
            keypoint_saturation: 50,
            max_features: 500,
            max_match_distance: 50,
        }
    }
}

/// `[metadata]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    /// Software-tag substrings that mark a photo as edited (case-insensitive)
    pub editing_tools: Vec<String>,
    /// Maximum number of tags echoed back in the preview
    pub preview_limit: usize,
    /// Warn when the capture time is older than this many hours
    pub max_capture_age_hours: Option<u64>,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            editing_tools: vec![
                "photoshop".to_string(),
                "gimp".to_string(),
                "lightroom".to_string(),
            ],
            preview_limit: 10,
            max_capture_age_hours: None,
        }
    }
}

impl TomlConfig {
    /// Reject values that would make the decision arithmetic meaningless
    pub fn validate(&self) -> Result<()> {
        let radius = self.verification.default_radius_m;
        if !radius.is_finite() || radius < 0.0 {
            return Err(Error::Config(format!(
                "verification.default_radius_m must be a non-negative number, got {}",
                radius
            )));
        }

        let p = &self.policy;
        let weights = [
            ("geo_weight", p.geo_weight),
            ("visual_weight", p.visual_weight),
            ("fingerprint_weight", p.fingerprint_weight),
            ("structural_weight", p.structural_weight),
            ("keypoint_weight", p.keypoint_weight),
            ("min_fingerprint_similarity", p.min_fingerprint_similarity),
            ("min_structural_score", p.min_structural_score),
            ("min_overall_score", p.min_overall_score),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "policy.{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if p.keypoint_saturation == 0 {
            return Err(Error::Config(
                "policy.keypoint_saturation must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// File resolution
// ============================================================================

/// Platform default location of a service config file
///
/// Linux: `~/.config/pov/<file>` then `/etc/pov/<file>`.
/// macOS / Windows: `<config_dir>/pov/<file>`.
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(file_name));

    if cfg!(target_os = "linux") {
        if let Some(path) = user_config.filter(|p| p.exists()) {
            return Some(path);
        }
        let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(file_name);
        return system_config.exists().then_some(system_config);
    }

    user_config.filter(|p| p.exists())
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Load the service configuration
///
/// An explicitly requested file must exist. Without one, the platform default
/// location is tried and a missing file degrades to compiled defaults.
pub fn load_config(explicit: Option<&Path>, file_name: &str) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        info!("Loading config from {}", path.display());
        return load_toml_config(path);
    }

    match default_config_path(file_name) {
        Some(path) => {
            info!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
        None => {
            warn!("No {} found, using compiled defaults", file_name);
            Ok(TomlConfig::default())
        }
    }
}
