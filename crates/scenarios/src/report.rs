//! 시나리오 식별자와 실행 보고서

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use powerprobe_cinder::Capability;

use crate::error::ScenarioError;

/// 실행 가능한 시나리오
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    /// PowerStore 복제 볼륨 페일오버
    #[serde(rename = "failover-powerstore")]
    FailoverPowerStore,
    /// PowerFlex 복제 볼륨 페일오버
    #[serde(rename = "failover-powerflex")]
    FailoverPowerFlex,
    /// PowerFlex extra spec 볼륨 타입
    VolumeType,
    /// PowerFlex back-end QoS
    Qos,
    /// PowerStore 드라이버 지원 마이그레이션
    Migration,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 5] = [
        ScenarioKind::FailoverPowerStore,
        ScenarioKind::FailoverPowerFlex,
        ScenarioKind::VolumeType,
        ScenarioKind::Qos,
        ScenarioKind::Migration,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::FailoverPowerStore => "failover-powerstore",
            Self::FailoverPowerFlex => "failover-powerflex",
            Self::VolumeType => "volume-type",
            Self::Qos => "qos",
            Self::Migration => "migration",
        }
    }

    /// 시나리오가 호출하는 API에 필요한 클라이언트 기능
    pub fn required_capabilities(&self) -> &'static [Capability] {
        match self {
            Self::FailoverPowerStore | Self::FailoverPowerFlex => &[
                Capability::Volumes,
                Capability::Services,
                Capability::Failover,
            ],
            Self::VolumeType => &[Capability::Volumes, Capability::VolumeTypes],
            Self::Qos => &[
                Capability::Volumes,
                Capability::VolumeTypes,
                Capability::QosSpecs,
            ],
            Self::Migration => &[
                Capability::Volumes,
                Capability::VolumeTypes,
                Capability::SchedulerStats,
                Capability::Migration,
            ],
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ScenarioError::UnknownScenario(s.to_owned()))
    }
}

/// 시나리오 종료 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum ScenarioOutcome {
    Passed,
    Skipped(String),
    Failed(String),
}

impl ScenarioOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// 메트릭 레이블 값
    pub fn result_label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Skipped(_) => "skipped",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// 시나리오 한 번의 실행 보고서
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: ScenarioKind,
    pub outcome: ScenarioOutcome,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
    /// 실행 중 기록한 관찰 내용
    pub notes: Vec<String>,
    /// 실패한 정리 작업 설명
    pub cleanup_failures: Vec<String>,
}

impl ScenarioReport {
    /// 시나리오는 통과했더라도 정리 실패가 있으면 false
    pub fn is_clean(&self) -> bool {
        !self.outcome.is_failed() && self.cleanup_failures.is_empty()
    }
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}
