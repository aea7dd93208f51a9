//! 설정 관리: powerprobe.toml 파싱 및 런타임 설정
//!
//! [`PowerprobeConfig`]는 한 번의 검증 실행에 필요한 모든 설정을 담습니다.
//! 전역 상태 없이 생성 시점에 각 레이어(클라이언트, 대기기, 시나리오)로 전달됩니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`POWERPROBE_CLOUD_ENDPOINT=https://...` 형식)
//! 3. 설정 파일 (`powerprobe.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), powerprobe_core::error::PowerprobeError> {
//! use powerprobe_core::config::PowerprobeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = PowerprobeConfig::load("powerprobe.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = PowerprobeConfig::parse("[features]\nreplication = false")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, PowerprobeError};

/// 설정 상한값 상수
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;
const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;
const MAX_MIGRATION_TIMEOUT_SECS: u64 = 24 * 3600;
/// 볼륨 상태 대기 제한 시간 상한 (초)
pub const MAX_BUILD_TIMEOUT_SECS: u64 = 24 * 3600;

/// powerprobe 통합 설정
///
/// `powerprobe.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PowerprobeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// Block Storage 엔드포인트 설정
    #[serde(default)]
    pub cloud: CloudConfig,
    /// 볼륨 생성/삭제 대기 설정
    #[serde(default)]
    pub volume: VolumeConfig,
    /// 기능 활성화 플래그
    #[serde(default)]
    pub features: FeatureFlags,
    /// 볼륨 마이그레이션 대기 설정
    #[serde(default)]
    pub migration: MigrationConfig,
    /// PowerStore 백엔드 설정
    #[serde(default)]
    pub powerstore: PowerStoreConfig,
    /// PowerFlex 백엔드 설정
    #[serde(default)]
    pub powerflex: PowerFlexConfig,
}

impl PowerprobeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PowerprobeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PowerprobeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PowerprobeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PowerprobeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, PowerprobeError> {
        toml::from_str(toml_str).map_err(|e| {
            PowerprobeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `POWERPROBE_{SECTION}_{FIELD}`
    /// 예: `POWERPROBE_CLOUD_AUTH_TOKEN=gAAAA...`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "POWERPROBE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "POWERPROBE_GENERAL_LOG_FORMAT");

        // Cloud
        override_string(&mut self.cloud.endpoint, "POWERPROBE_CLOUD_ENDPOINT");
        override_string(&mut self.cloud.auth_token, "POWERPROBE_CLOUD_AUTH_TOKEN");
        override_string(
            &mut self.cloud.api_microversion,
            "POWERPROBE_CLOUD_API_MICROVERSION",
        );
        override_u64(
            &mut self.cloud.request_timeout_secs,
            "POWERPROBE_CLOUD_REQUEST_TIMEOUT_SECS",
        );
        override_bool(&mut self.cloud.admin, "POWERPROBE_CLOUD_ADMIN");

        // Volume
        override_u64(
            &mut self.volume.build_interval_secs,
            "POWERPROBE_VOLUME_BUILD_INTERVAL_SECS",
        );
        override_u64(
            &mut self.volume.build_timeout_secs,
            "POWERPROBE_VOLUME_BUILD_TIMEOUT_SECS",
        );
        override_f64(
            &mut self.volume.backoff_multiplier,
            "POWERPROBE_VOLUME_BACKOFF_MULTIPLIER",
        );
        override_u64(
            &mut self.volume.max_interval_secs,
            "POWERPROBE_VOLUME_MAX_INTERVAL_SECS",
        );

        // Features
        override_bool(
            &mut self.features.replication,
            "POWERPROBE_FEATURES_REPLICATION",
        );
        override_bool(
            &mut self.features.volume_types,
            "POWERPROBE_FEATURES_VOLUME_TYPES",
        );

        // Migration
        override_u64(
            &mut self.migration.timeout_secs,
            "POWERPROBE_MIGRATION_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.migration.poll_interval_secs,
            "POWERPROBE_MIGRATION_POLL_INTERVAL_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), PowerprobeError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if !(self.cloud.endpoint.starts_with("http://")
            || self.cloud.endpoint.starts_with("https://"))
        {
            return Err(invalid(
                "cloud.endpoint",
                "must start with http:// or https://".to_owned(),
            ));
        }

        if self.cloud.request_timeout_secs == 0
            || self.cloud.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS
        {
            return Err(invalid(
                "cloud.request_timeout_secs",
                format!("must be 1-{MAX_REQUEST_TIMEOUT_SECS}"),
            ));
        }

        // 폴링 간격/타임아웃 검증
        if self.volume.build_interval_secs == 0 {
            return Err(invalid(
                "volume.build_interval_secs",
                "must be greater than 0".to_owned(),
            ));
        }
        if self.volume.build_timeout_secs < self.volume.build_interval_secs {
            return Err(invalid(
                "volume.build_timeout_secs",
                "must not be shorter than build_interval_secs".to_owned(),
            ));
        }
        if self.volume.build_timeout_secs > MAX_BUILD_TIMEOUT_SECS {
            return Err(invalid(
                "volume.build_timeout_secs",
                format!("must be at most {MAX_BUILD_TIMEOUT_SECS}"),
            ));
        }
        if !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&self.volume.backoff_multiplier) {
            return Err(invalid(
                "volume.backoff_multiplier",
                format!("must be 1.0-{MAX_BACKOFF_MULTIPLIER}"),
            ));
        }
        if self.volume.max_interval_secs < self.volume.build_interval_secs {
            return Err(invalid(
                "volume.max_interval_secs",
                "must not be shorter than build_interval_secs".to_owned(),
            ));
        }

        if self.migration.poll_interval_secs == 0 {
            return Err(invalid(
                "migration.poll_interval_secs",
                "must be greater than 0".to_owned(),
            ));
        }
        if self.migration.timeout_secs < self.migration.poll_interval_secs
            || self.migration.timeout_secs > MAX_MIGRATION_TIMEOUT_SECS
        {
            return Err(invalid(
                "migration.timeout_secs",
                format!("must be poll_interval_secs-{MAX_MIGRATION_TIMEOUT_SECS}"),
            ));
        }

        if self.powerstore.backend_name.is_empty() {
            return Err(invalid(
                "powerstore.backend_name",
                "must not be empty".to_owned(),
            ));
        }
        if self.powerflex.backend_name.is_empty() {
            return Err(invalid(
                "powerflex.backend_name",
                "must not be empty".to_owned(),
            ));
        }
        if self.powerflex.volume_size_gb == 0 {
            return Err(invalid(
                "powerflex.volume_size_gb",
                "must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> PowerprobeError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Block Storage 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// 프로젝트 범위의 Block Storage v3 엔드포인트 (예: `http://ctl:8776/v3/<project>`)
    pub endpoint: String,
    /// 사전 발급된 인증 토큰
    pub auth_token: String,
    /// API 마이크로버전 (빈 문자열이면 헤더 생략)
    pub api_microversion: String,
    /// 요청 단위 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// 관리자 자격 증명 여부
    pub admin: bool,
}

impl CloudConfig {
    /// 요청 타임아웃을 `Duration`으로 반환합니다.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8776/v3".to_owned(),
            auth_token: String::new(),
            api_microversion: String::new(),
            request_timeout_secs: 60,
            admin: true,
        }
    }
}

/// 볼륨 상태 대기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// 최초 폴링 간격 (초)
    pub build_interval_secs: u64,
    /// 상태 전이 대기 제한 시간 (초)
    pub build_timeout_secs: u64,
    /// 폴링 간격 증가 배수
    pub backoff_multiplier: f64,
    /// 폴링 간격 상한 (초)
    pub max_interval_secs: u64,
}

impl VolumeConfig {
    /// 최초 폴링 간격
    pub fn build_interval(&self) -> Duration {
        Duration::from_secs(self.build_interval_secs)
    }

    /// 대기 제한 시간
    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    /// 폴링 간격 상한
    pub fn max_interval(&self) -> Duration {
        Duration::from_secs(self.max_interval_secs)
    }
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            build_interval_secs: 1,
            build_timeout_secs: 300,
            backoff_multiplier: 1.5,
            max_interval_secs: 10,
        }
    }
}

/// 기능 활성화 플래그
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// 복제(failover) 시나리오 활성화
    pub replication: bool,
    /// 볼륨 타입 기반 시나리오 활성화
    pub volume_types: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            replication: true,
            volume_types: true,
        }
    }
}

/// 볼륨 마이그레이션 대기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// 마이그레이션 완료 대기 제한 시간 (초)
    pub timeout_secs: u64,
    /// 마이그레이션 상태 폴링 간격 (초)
    pub poll_interval_secs: u64,
}

impl MigrationConfig {
    /// 대기 제한 시간
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 폴링 간격
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 1800,
            poll_interval_secs: 10,
        }
    }
}

/// PowerStore 백엔드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerStoreConfig {
    /// 서비스 호스트 검색에 사용하는 백엔드 이름
    pub backend_name: String,
    /// failover 대상 backend_id
    pub backend_id: String,
}

impl Default for PowerStoreConfig {
    fn default() -> Self {
        Self {
            backend_name: "powerstore".to_owned(),
            backend_id: "powerstore-backend-id".to_owned(),
        }
    }
}

/// PowerFlex 백엔드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerFlexConfig {
    /// 서비스 호스트 검색에 사용하는 백엔드 이름
    pub backend_name: String,
    /// failover 대상 backend_id
    pub backend_id: String,
    /// 볼륨 타입 extra spec `volume_backend_name`
    pub volume_backend_name: String,
    /// 스토리지 풀 이름
    pub storage_pool_name: String,
    /// 보호 도메인 이름
    pub protection_domain_name: String,
    /// 프로비저닝 방식 (thin, thick)
    pub provisioning_type: String,
    /// IOPS 상한
    pub iops_limit: String,
    /// 시나리오에서 생성할 볼륨 크기 (GiB)
    pub volume_size_gb: u64,
}

impl Default for PowerFlexConfig {
    fn default() -> Self {
        Self {
            backend_name: "powerflex".to_owned(),
            backend_id: "powerflex-backend-id".to_owned(),
            volume_backend_name: "powerflex1".to_owned(),
            storage_pool_name: "SP1".to_owned(),
            protection_domain_name: "PD1".to_owned(),
            provisioning_type: "thin".to_owned(),
            iops_limit: "5000".to_owned(),
            volume_size_gb: 8,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_f64(target: &mut f64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) if parsed.is_finite() => *target = parsed,
            _ => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}
