//! powerprobe.toml 통합 설정 테스트
//!
//! - powerprobe.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use std::fs;

use powerprobe_core::config::PowerprobeConfig;
use powerprobe_core::error::{ConfigError, PowerprobeError};
use tempfile::TempDir;

// =============================================================================
// powerprobe.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../powerprobe.toml.example");
    let config = PowerprobeConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.cloud.api_microversion, "3.59");
    assert!(config.cloud.admin);
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../powerprobe.toml.example");
    let config = PowerprobeConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_has_backend_defaults() {
    let content = include_str!("../../../powerprobe.toml.example");
    let config = PowerprobeConfig::parse(content).expect("should parse");

    assert_eq!(config.powerstore.backend_id, "powerstore-backend-id");
    assert_eq!(config.powerflex.storage_pool_name, "SP1");
    assert_eq!(config.powerflex.protection_domain_name, "PD1");
    assert_eq!(config.powerflex.provisioning_type, "thin");
    assert_eq!(config.powerflex.volume_size_gb, 8);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_only_migration_section() {
    let toml = r#"
[migration]
timeout_secs = 600
poll_interval_secs = 5
"#;
    let config = PowerprobeConfig::parse(toml).expect("should parse");
    assert_eq!(config.migration.timeout_secs, 600);
    assert_eq!(config.migration.poll_interval_secs, 5);
    // 다른 섹션은 기본값
    assert_eq!(config.volume.build_timeout_secs, 300);
    assert!(config.features.replication);
}

#[test]
fn unknown_field_type_is_parse_error() {
    let toml = r#"
[volume]
build_timeout_secs = "five minutes"
"#;
    let err = PowerprobeConfig::parse(toml).unwrap_err();
    assert!(matches!(
        err,
        PowerprobeError::Config(ConfigError::ParseFailed { .. })
    ));
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
async fn load_from_file_applies_validation() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("powerprobe.toml");
    fs::write(
        &path,
        r#"
[volume]
build_interval_secs = 0
"#,
    )
    .expect("should write config");

    let err = PowerprobeConfig::from_file(&path).await.unwrap_err();
    assert!(err.to_string().contains("build_interval_secs"));
}

#[tokio::test]
async fn load_empty_file_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("empty.toml");
    fs::write(&path, "").expect("should write config");

    let config = PowerprobeConfig::from_file(&path)
        .await
        .expect("empty file should load");
    assert_eq!(config.powerstore.backend_name, "powerstore");
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[cloud]
endpoint = "http://from-file:8776/v3"
"#;

    let original = std::env::var("POWERPROBE_CLOUD_ENDPOINT").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("POWERPROBE_CLOUD_ENDPOINT", "https://from-env:8776/v3");
    }

    let mut config = PowerprobeConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.cloud.endpoint.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("POWERPROBE_CLOUD_ENDPOINT", val),
            None => std::env::remove_var("POWERPROBE_CLOUD_ENDPOINT"),
        }
    }

    assert_eq!(result, "https://from-env:8776/v3");
}

#[test]
#[serial_test::serial]
fn env_override_feature_flag() {
    let original = std::env::var("POWERPROBE_FEATURES_REPLICATION").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("POWERPROBE_FEATURES_REPLICATION", "false");
    }

    let mut config = PowerprobeConfig::default();
    config.apply_env_overrides();
    let replication = config.features.replication;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("POWERPROBE_FEATURES_REPLICATION", val),
            None => std::env::remove_var("POWERPROBE_FEATURES_REPLICATION"),
        }
    }

    assert!(!replication);
}

#[tokio::test]
#[serial_test::serial]
async fn load_rejects_env_value_that_breaks_validation() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("powerprobe.toml");
    fs::write(&path, "").expect("should write config");

    let original = std::env::var("POWERPROBE_VOLUME_BACKOFF_MULTIPLIER").ok();
    // SAFETY: serial_test로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("POWERPROBE_VOLUME_BACKOFF_MULTIPLIER", "0.25");
    }

    let result = PowerprobeConfig::load(&path).await;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("POWERPROBE_VOLUME_BACKOFF_MULTIPLIER", val),
            None => std::env::remove_var("POWERPROBE_VOLUME_BACKOFF_MULTIPLIER"),
        }
    }

    let err = result.unwrap_err();
    assert!(err.to_string().contains("backoff_multiplier"));
}
