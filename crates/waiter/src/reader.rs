//! 리소스 상태 조회 추상화
//!
//! [`ResourceReader`]는 원격 API에서 리소스의 현재 스냅샷을 읽어옵니다.
//! 구현체는 "존재하지 않음"과 "일시적 실패"를 구분해서 보고해야 합니다.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// 상태 문자열을 노출하는 리소스 스냅샷
pub trait Observed {
    /// 원격 시스템이 보고한 상태 (대소문자 무관)
    fn status(&self) -> &str;
}

/// 상태 조회 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// 리소스가 존재하지 않음
    #[error("resource not found: {0}")]
    NotFound(String),

    /// 네트워크 오류, 5xx 응답 등 재시도 가능한 실패
    #[error("transient read failure: {0}")]
    Transient(String),

    /// 요청 자체가 잘못되어 재시도해도 성공할 수 없음
    #[error("invalid read request: {0}")]
    Invalid(String),
}

/// 리소스 상태 조회 trait
///
/// 대기 루프는 이 trait만 알고 있으므로, 테스트에서는 Mock 구현으로
/// 원격 API 없이 상태 전이를 재현할 수 있습니다.
pub trait ResourceReader: Send + Sync {
    /// 조회 결과 스냅샷 타입
    type Resource: Observed + Send;

    /// 리소스의 현재 스냅샷을 조회합니다.
    fn fetch(
        &self,
        resource_id: &str,
    ) -> impl Future<Output = Result<Self::Resource, ReadError>> + Send;
}

impl<R: ResourceReader> ResourceReader for Arc<R> {
    type Resource = R::Resource;

    fn fetch(
        &self,
        resource_id: &str,
    ) -> impl Future<Output = Result<Self::Resource, ReadError>> + Send {
        (**self).fetch(resource_id)
    }
}

impl<R: ResourceReader> ResourceReader for &R {
    type Resource = R::Resource;

    fn fetch(
        &self,
        resource_id: &str,
    ) -> impl Future<Output = Result<Self::Resource, ReadError>> + Send {
        (**self).fetch(resource_id)
    }
}

/// 가장 단순한 스냅샷: 식별자와 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub id: String,
    pub status: String,
}

impl ResourceSnapshot {
    pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
        }
    }
}

impl Observed for ResourceSnapshot {
    fn status(&self) -> &str {
        &self.status
    }
}
