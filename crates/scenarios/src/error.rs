//! 시나리오 에러 타입
//!
//! [`ScenarioError`]는 시나리오 본문이 `?`로 전파하는 에러입니다.
//! 러너는 `Precondition`을 건너뜀으로, 나머지는 실패로 보고합니다.

use powerprobe_cinder::CinderError;
use powerprobe_core::error::{ConfigError, PowerprobeError};

/// 시나리오 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// Block Storage 호출 또는 대기 실패
    #[error(transparent)]
    Cinder(#[from] CinderError),

    /// 검증 실패
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// 실행 조건이 갖춰지지 않음 (시나리오를 건너뜀)
    #[error("precondition not met: {0}")]
    Precondition(String),

    /// 알 수 없는 시나리오 이름
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
}

impl From<ScenarioError> for PowerprobeError {
    fn from(err: ScenarioError) -> Self {
        match err {
            ScenarioError::Cinder(e) => e.into(),
            ScenarioError::UnknownScenario(name) => ConfigError::InvalidValue {
                field: "scenario".to_owned(),
                reason: format!("unknown scenario '{name}'"),
            }
            .into(),
            other => ConfigError::InvalidValue {
                field: "scenario".to_owned(),
                reason: other.to_string(),
            }
            .into(),
        }
    }
}
