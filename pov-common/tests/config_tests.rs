//! Config file loading and graceful degradation
//!
//! Covers:
//! - Explicit config path must exist and parse
//! - Full TOML round-trips into the model
//! - Invalid values are rejected at load time

use pov_common::config::{load_config, load_toml_config, Environment, TomlConfig};
use pov_common::Error;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("pov-verify.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn test_load_full_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        port = 6001
        environment = "development"
        bind_addr = "127.0.0.1"
        image_root = "/srv/uploads"

        [verification]
        default_radius_m = 120.0

        [policy]
        min_fingerprint_similarity = 90.0
        min_structural_score = 0.5
        min_keypoint_matches = 12
        min_overall_score = 65.0
        max_features = 250

        [metadata]
        editing_tools = ["snapseed"]
        preview_limit = 5
        max_capture_age_hours = 24
        "#,
    );

    let config = load_toml_config(&path).expect("config should load");

    assert_eq!(config.port, Some(6001));
    assert_eq!(config.environment, Some(Environment::Development));
    assert_eq!(config.bind_addr.as_deref(), Some("127.0.0.1"));
    assert_eq!(config.image_root, Some(PathBuf::from("/srv/uploads")));
    assert_eq!(config.verification.default_radius_m, 120.0);
    assert_eq!(config.policy.min_fingerprint_similarity, 90.0);
    assert_eq!(config.policy.min_keypoint_matches, 12);
    assert_eq!(config.policy.max_features, 250);
    // Untouched keys keep their defaults
    assert_eq!(config.policy.geo_weight, 0.3);
    assert_eq!(config.metadata.editing_tools, vec!["snapseed".to_string()]);
    assert_eq!(config.metadata.preview_limit, 5);
    assert_eq!(config.metadata.max_capture_age_hours, Some(24));
}

#[test]
fn test_empty_file_is_all_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_explicit_missing_file_is_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let result = load_config(Some(&missing), "pov-verify.toml");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_malformed_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "port = \"not a number\"");

    let result = load_toml_config(&path);
    match result {
        Err(Error::Config(msg)) => assert!(msg.contains("Parse")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_invalid_weight_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[policy]\ngeo_weight = -0.5\n");

    let result = load_toml_config(&path);
    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("geo_weight")));
}

#[test]
fn test_unknown_environment_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "environment = \"staging\"\n");

    assert!(load_toml_config(&path).is_err());
}
