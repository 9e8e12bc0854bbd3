//! Configuration resolution for pov-verify
//!
//! Merges command-line / environment overrides onto the TOML config and
//! produces the immutable `VerifyConfig` shared by every request.

use pov_common::config::{
    Environment, MetadataSettings, PolicySettings, TomlConfig, DEFAULT_PORT,
};
use pov_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Config file name looked up under the platform config dir
pub const CONFIG_FILE_NAME: &str = "pov-verify.toml";

/// Log filter used when `RUST_LOG` is unset
pub fn default_log_filter(environment: Environment) -> &'static str {
    if environment.is_development() {
        "pov_verify=debug,tower_http=debug"
    } else {
        "pov_verify=info,tower_http=info"
    }
}

/// Values given on the command line or through the environment
///
/// `None` means "not given"; the TOML value (or compiled default) applies.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub environment: Option<Environment>,
    pub bind_addr: Option<String>,
    pub default_radius_m: Option<f64>,
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub port: u16,
    pub bind_addr: String,
    pub environment: Environment,
    /// Radius applied when a request omits `verificationRadius`
    pub default_radius_m: f64,
    /// Base directory for relative photo paths
    pub image_root: Option<PathBuf>,
    pub policy: PolicySettings,
    pub metadata: MetadataSettings,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        let toml = TomlConfig::default();
        Self {
            port: DEFAULT_PORT,
            bind_addr: "0.0.0.0".to_string(),
            environment: Environment::default(),
            default_radius_m: toml.verification.default_radius_m,
            image_root: None,
            policy: toml.policy,
            metadata: toml.metadata,
        }
    }
}

impl VerifyConfig {
    /// Apply overrides on top of the TOML config
    pub fn resolve(toml: TomlConfig, overrides: Overrides) -> Result<Self> {
        let default_radius_m = overrides
            .default_radius_m
            .unwrap_or(toml.verification.default_radius_m);
        if !default_radius_m.is_finite() || default_radius_m < 0.0 {
            return Err(Error::Config(format!(
                "default verification radius must be non-negative, got {}",
                default_radius_m
            )));
        }

        let config = Self {
            port: overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            bind_addr: overrides
                .bind_addr
                .or(toml.bind_addr)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            environment: overrides
                .environment
                .or(toml.environment)
                .unwrap_or_default(),
            default_radius_m,
            image_root: toml.image_root,
            policy: toml.policy,
            metadata: toml.metadata,
        };

        info!(
            port = config.port,
            environment = %config.environment,
            default_radius_m = config.default_radius_m,
            "Configuration resolved"
        );
        Ok(config)
    }

    /// Resolve a request path against `image_root`
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve_image_path(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        match &self.image_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
