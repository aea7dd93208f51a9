//! 에러 타입: 도메인별 에러 정의
//!
//! 각 크레이트는 자체 에러 enum을 갖고, `From` 구현으로
//! [`PowerprobeError`]에 합쳐져 상위 레이어에서 `?`로 전파됩니다.

/// powerprobe 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum PowerprobeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스토리지 REST API 에러
    #[error("storage api error: {0}")]
    StorageApi(#[from] StorageApiError),

    /// 비동기 상태 대기 실패
    #[error("wait error: {0}")]
    Wait(#[from] WaitFailure),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// 클라이언트가 요구된 기능을 제공하지 않음
    #[error("missing client capability: {capability}")]
    MissingCapability { capability: String },
}

/// 스토리지 REST API 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageApiError {
    /// 리소스가 존재하지 않음 (HTTP 404)
    #[error("not found: {0}")]
    NotFound(String),

    /// 잘못된 요청 (HTTP 400)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 그 외 비정상 응답
    #[error("http {status}: {message}")]
    Api { status: u16, message: String },

    /// 연결 실패, 타임아웃 등 전송 계층 에러
    #[error("transport failure: {0}")]
    Transport(String),

    /// 응답 본문 디코딩 실패
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// 비동기 상태 대기 실패
#[derive(Debug, thiserror::Error)]
pub enum WaitFailure {
    /// 대기 명세가 잘못됨 (폴링하지 않음)
    #[error("invalid wait spec: {0}")]
    InvalidSpec(String),

    /// 리소스가 실패 상태를 보고함
    #[error("resource '{resource_id}' entered failure status '{status}'")]
    ResourceFailed { resource_id: String, status: String },

    /// 제한 시간 초과
    #[error("timed out waiting for resource '{resource_id}' (last status: {last_status})")]
    Timeout {
        resource_id: String,
        last_status: String,
    },

    /// 호출자가 대기를 취소함
    #[error("wait for resource '{resource_id}' was cancelled")]
    Cancelled { resource_id: String },
}
