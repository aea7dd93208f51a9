//! Block Storage 클라이언트 에러 타입
//!
//! [`CinderError`]는 REST 호출과 볼륨 헬퍼에서 발생하는 모든 에러를 표현합니다.
//! `From<CinderError> for PowerprobeError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use powerprobe_core::error::{ConfigError, PowerprobeError, StorageApiError};
use powerprobe_waiter::WaitError;

/// Block Storage 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum CinderError {
    /// 리소스가 존재하지 않음 (HTTP 404)
    #[error("not found: {0}")]
    NotFound(String),

    /// 잘못된 요청 또는 사용 중인 리소스 (HTTP 400)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 그 외 2xx가 아닌 응답
    #[error("http {status}: {message}")]
    Api {
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문 또는 사유
        message: String,
    },

    /// 연결 실패, 타임아웃 등
    #[error("transport failure: {0}")]
    Transport(String),

    /// 응답 본문 디코딩 실패
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// 요청 파라미터가 잘못됨 (전송하지 않음)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// 클라이언트 설정 에러
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 볼륨 대기 실패
    #[error(transparent)]
    Wait(#[from] WaitError),
}

impl CinderError {
    /// HTTP 상태 코드와 응답 본문으로 에러를 분류합니다.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotFound(message),
            400 => Self::BadRequest(message),
            _ => Self::Api { status, message },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<CinderError> for PowerprobeError {
    fn from(err: CinderError) -> Self {
        match err {
            CinderError::NotFound(msg) => StorageApiError::NotFound(msg).into(),
            CinderError::BadRequest(msg) | CinderError::InvalidRequest(msg) => {
                StorageApiError::BadRequest(msg).into()
            }
            CinderError::Api { status, message } => {
                StorageApiError::Api { status, message }.into()
            }
            CinderError::Transport(msg) => StorageApiError::Transport(msg).into(),
            CinderError::Decode(msg) => StorageApiError::Decode(msg).into(),
            CinderError::Config(e) => e.into(),
            CinderError::Wait(e) => e.into(),
        }
    }
}
