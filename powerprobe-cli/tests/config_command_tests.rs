//! Integration tests for the configuration consumed by `powerprobe config`.
//!
//! Tests config validation and loading with real TOML files.

use std::fs;

use tempfile::TempDir;

use powerprobe_cinder::{Capability, CapabilitySet};
use powerprobe_core::config::PowerprobeConfig;

#[tokio::test]
async fn test_config_validate_valid_toml() {
    // Given: A valid config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("powerprobe.toml");

    let valid_config = r#"
[general]
log_level = "debug"
log_format = "json"

[cloud]
endpoint = "https://cinder.example.com:8776/v3/abc123"
auth_token = "token"
admin = false

[volume]
build_interval_secs = 2
build_timeout_secs = 120
"#;

    fs::write(&config_path, valid_config).expect("should write config");

    // When: Loading the config
    let config = PowerprobeConfig::load(&config_path)
        .await
        .expect("valid config should load successfully");

    // Then: Values are applied and capabilities follow the admin flag
    assert_eq!(config.volume.build_timeout_secs, 120);
    let caps = CapabilitySet::from_config(&config.cloud);
    assert!(caps.contains(Capability::Volumes));
    assert!(!caps.contains(Capability::Failover));
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");

    fs::write(&config_path, "[general\nlog_level = \"info\"\n").expect("should write bad config");

    let result = PowerprobeConfig::load(&config_path).await;
    assert!(result.is_err(), "malformed TOML should fail to load");
}

#[tokio::test]
async fn test_config_validate_missing_file() {
    let config_path = std::path::PathBuf::from("/nonexistent/powerprobe.toml");

    let result = PowerprobeConfig::load(&config_path).await;
    assert!(result.is_err(), "missing file should fail to load");
}

#[tokio::test]
async fn test_config_validate_rejects_shrinking_backoff() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("powerprobe.toml");

    fs::write(&config_path, "[volume]\nbackoff_multiplier = 0.5\n").expect("should write config");

    let err = PowerprobeConfig::load(&config_path)
        .await
        .expect_err("multiplier below 1 should be rejected");
    assert!(err.to_string().contains("backoff_multiplier"));
}

#[tokio::test]
async fn test_config_example_file_loads() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("powerprobe.toml");
    fs::write(&config_path, include_str!("../../powerprobe.toml.example"))
        .expect("should write example");

    let config = PowerprobeConfig::load(&config_path)
        .await
        .expect("example config should load");
    assert_eq!(config.migration.timeout_secs, 1800);
    assert!(config.cloud.admin);
    assert!(CapabilitySet::from_config(&config.cloud).contains(Capability::Migration));
}
