//! 클라이언트 기능 협상
//!
//! 필요한 API 기능을 시나리오 시작 전에 한 번 검증합니다.
//! 기능 집합은 설정에서 도출되며, 부족하면 REST 호출 없이
//! [`ConfigError::MissingCapability`]로 실패합니다.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use powerprobe_core::config::CloudConfig;
use powerprobe_core::error::ConfigError;

use crate::client::ReqwestBlockStorageClient;
use crate::error::CinderError;

/// Block Storage API 기능
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// 볼륨 조회, 생성, 삭제
    Volumes,
    /// 볼륨 타입 생성, 삭제 (관리자)
    VolumeTypes,
    /// QoS 명세 관리 (관리자)
    QosSpecs,
    /// `os-services` 조회 (관리자)
    Services,
    /// `scheduler-stats` 풀 조회 (관리자)
    SchedulerStats,
    /// `os-volume-hosts` 페일오버 (관리자)
    Failover,
    /// `os-migrate_volume` (관리자)
    Migration,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Self::Volumes,
        Self::VolumeTypes,
        Self::QosSpecs,
        Self::Services,
        Self::SchedulerStats,
        Self::Failover,
        Self::Migration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Volumes => "volumes",
            Self::VolumeTypes => "volume_types",
            Self::QosSpecs => "qos_specs",
            Self::Services => "services",
            Self::SchedulerStats => "scheduler_stats",
            Self::Failover => "failover",
            Self::Migration => "migration",
        }
    }

    fn requires_admin(&self) -> bool {
        !matches!(self, Self::Volumes)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 사용 가능한 기능 집합
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// 설정에서 기능 집합을 도출합니다.
    ///
    /// 볼륨 기능은 항상 포함되고, 나머지는 관리자 자격 증명일 때만 포함됩니다.
    pub fn from_config(config: &CloudConfig) -> Self {
        Capability::ALL
            .into_iter()
            .filter(|c| config.admin || !c.requires_admin())
            .collect()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    /// 요구 기능 중 없는 것을 반환합니다.
    pub fn missing(&self, required: &[Capability]) -> Vec<Capability> {
        required
            .iter()
            .copied()
            .filter(|c| !self.contains(*c))
            .collect()
    }

    /// 요구 기능이 모두 있는지 검증합니다.
    pub fn require(&self, required: &[Capability]) -> Result<(), ConfigError> {
        let missing = self.missing(required);
        if missing.is_empty() {
            return Ok(());
        }
        Err(ConfigError::MissingCapability {
            capability: missing
                .iter()
                .map(Capability::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// 설정과 요구 기능으로 클라이언트를 생성합니다.
#[derive(Debug, Clone)]
pub struct ClientFactory {
    config: CloudConfig,
    capabilities: CapabilitySet,
}

impl ClientFactory {
    pub fn new(config: CloudConfig) -> Self {
        let capabilities = CapabilitySet::from_config(&config);
        debug!(admin = config.admin, capabilities = ?capabilities, "derived client capabilities");
        Self {
            config,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// 요구 기능을 검증하고 구체 클라이언트를 생성합니다.
    ///
    /// # Errors
    ///
    /// - [`CinderError::Config`]: 요구 기능이 없음
    /// - [`CinderError::InvalidRequest`] / [`CinderError::Transport`]: 클라이언트 생성 실패
    pub fn negotiate(
        &self,
        required: &[Capability],
    ) -> Result<ReqwestBlockStorageClient, CinderError> {
        self.capabilities.require(required)?;
        let client = ReqwestBlockStorageClient::new(&self.config)?;
        info!(
            endpoint = %client.endpoint(),
            required = ?required,
            "block storage client ready"
        );
        Ok(client)
    }
}
