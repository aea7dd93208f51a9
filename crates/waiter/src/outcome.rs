//! 대기 종료 결과
//!
//! 한 번의 [`wait`](crate::wait) 호출은 정확히 하나의 [`WaitOutcome`]으로
//! 끝납니다. 모든 결과는 진단용 [`WaitReport`]를 포함합니다.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::WaitError;
use crate::spec::WaitPurpose;

/// 대기 진단 정보
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaitReport {
    /// 대상 리소스 ID
    pub resource_id: String,
    /// 대기 목적
    pub purpose: WaitPurpose,
    /// 수행한 조회 횟수
    pub attempts: u32,
    /// 경과 시간
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    /// 제한 시간
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

/// [`WaitOutcome`]의 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitResult {
    Succeeded,
    Failed,
    TimedOut,
}

impl WaitResult {
    /// 메트릭 레이블과 출력에 쓰는 고정된 결과명
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for WaitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 대기 종료 결과
#[derive(Debug, Clone)]
pub enum WaitOutcome<T> {
    /// 목표 상태 도달. 부재 대기에서 NotFound로 끝난 경우 스냅샷은 `None`.
    Succeeded {
        snapshot: Option<T>,
        report: WaitReport,
    },
    /// 리소스가 실패 상태를 보고함
    Failed {
        status: String,
        snapshot: T,
        report: WaitReport,
    },
    /// 제한 시간 초과
    TimedOut {
        last_status: Option<String>,
        last_error: Option<String>,
        report: WaitReport,
    },
}

impl<T> WaitOutcome<T> {
    pub fn report(&self) -> &WaitReport {
        match self {
            Self::Succeeded { report, .. }
            | Self::Failed { report, .. }
            | Self::TimedOut { report, .. } => report,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn result(&self) -> WaitResult {
        match self {
            Self::Succeeded { .. } => WaitResult::Succeeded,
            Self::Failed { .. } => WaitResult::Failed,
            Self::TimedOut { .. } => WaitResult::TimedOut,
        }
    }

    /// 메트릭 레이블용 고정된 결과명
    pub fn result_label(&self) -> &'static str {
        self.result().as_str()
    }

    /// 성공이면 스냅샷을, 실패나 시간 초과면 [`WaitError`]를 반환합니다.
    pub fn into_result(self) -> Result<Option<T>, WaitError> {
        match self {
            Self::Succeeded { snapshot, .. } => Ok(snapshot),
            Self::Failed { status, report, .. } => Err(WaitError::ResourceFailed {
                resource_id: report.resource_id,
                status,
                attempts: report.attempts,
                elapsed: report.elapsed,
                timeout: report.timeout,
            }),
            Self::TimedOut {
                last_status,
                last_error,
                report,
            } => Err(WaitError::Timeout {
                resource_id: report.resource_id,
                last_status,
                last_error,
                attempts: report.attempts,
                elapsed: report.elapsed,
                timeout: report.timeout,
            }),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}
