//! 대기 에러 타입
//!
//! 종료 결과 중 호출자가 `?`로 전파하고 싶은 경우를 표현합니다.
//! [`WaitOutcome::into_result`](crate::WaitOutcome::into_result)가
//! `Failed`/`TimedOut`을 이 타입으로 변환합니다.

use std::time::Duration;

use powerprobe_core::error::{PowerprobeError, WaitFailure};

/// 대기 에러
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WaitError {
    /// 명세가 잘못되어 폴링을 시작하지 않음
    #[error("invalid wait spec: {reason}")]
    Config { reason: String },

    /// 리소스가 실패 상태를 보고함
    #[error(
        "resource '{resource_id}' entered failure status '{status}' after {attempts} reads in {elapsed:?} (timeout {timeout:?})"
    )]
    ResourceFailed {
        resource_id: String,
        status: String,
        attempts: u32,
        elapsed: Duration,
        timeout: Duration,
    },

    /// 제한 시간 내에 목표 상태에 도달하지 못함
    #[error(
        "timed out after {elapsed:?} (timeout {timeout:?}) waiting for resource '{resource_id}': last status {}, last read error {}",
        last_status.as_deref().unwrap_or("<none>"),
        last_error.as_deref().unwrap_or("<none>")
    )]
    Timeout {
        resource_id: String,
        last_status: Option<String>,
        last_error: Option<String>,
        attempts: u32,
        elapsed: Duration,
        timeout: Duration,
    },

    /// 호출자가 대기를 취소함
    #[error("wait for resource '{resource_id}' cancelled after {attempts} reads in {elapsed:?}")]
    Cancelled {
        resource_id: String,
        attempts: u32,
        elapsed: Duration,
    },
}

impl WaitError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// 메트릭 레이블용 고정된 결과명
    pub fn result_label(&self) -> &'static str {
        match self {
            Self::Config { .. } => "invalid",
            Self::ResourceFailed { .. } => "failed",
            Self::Timeout { .. } => "timed_out",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

impl From<WaitError> for WaitFailure {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Config { reason } => WaitFailure::InvalidSpec(reason),
            WaitError::ResourceFailed {
                resource_id,
                status,
                ..
            } => WaitFailure::ResourceFailed {
                resource_id,
                status,
            },
            WaitError::Timeout {
                resource_id,
                last_status,
                ..
            } => WaitFailure::Timeout {
                resource_id,
                last_status: last_status.unwrap_or_else(|| "<none>".to_owned()),
            },
            WaitError::Cancelled { resource_id, .. } => WaitFailure::Cancelled { resource_id },
        }
    }
}

impl From<WaitError> for PowerprobeError {
    fn from(err: WaitError) -> Self {
        PowerprobeError::Wait(err.into())
    }
}
