//! 대기 루프용 볼륨 상태 조회기
//!
//! - [`VolumeReader`]: 볼륨의 `status`
//! - [`MigrationReader`]: 목적지 호스트 도달 여부와 `migration_status`
//!
//! 404는 [`ReadError::NotFound`], 요청 전에 거부된 잘못된 ID는
//! [`ReadError::Invalid`], 그 외 모든 클라이언트 에러는
//! [`ReadError::Transient`]로 변환됩니다.

use serde::Serialize;

use powerprobe_waiter::{Observed, ReadError, ResourceReader};

use crate::client::BlockStorageClient;
use crate::error::CinderError;
use crate::types::Volume;

/// 마이그레이션 완료 시 보고되는 상태
pub const MIGRATION_SUCCESS: &str = "success";

/// `migration_status`가 비어 있을 때 보고되는 상태
pub const MIGRATION_PENDING: &str = "pending";

fn to_read_error(err: CinderError) -> ReadError {
    match err {
        CinderError::NotFound(msg) => ReadError::NotFound(msg),
        CinderError::InvalidRequest(msg) => ReadError::Invalid(msg),
        other => ReadError::Transient(other.to_string()),
    }
}

/// 볼륨 상태 조회기
#[derive(Debug)]
pub struct VolumeReader<'a, C> {
    client: &'a C,
}

impl<'a, C: BlockStorageClient> VolumeReader<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }
}

impl<C: BlockStorageClient> ResourceReader for VolumeReader<'_, C> {
    type Resource = Volume;

    async fn fetch(&self, resource_id: &str) -> Result<Volume, ReadError> {
        self.client
            .show_volume(resource_id)
            .await
            .map_err(to_read_error)
    }
}

/// 마이그레이션 진행 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationProgress {
    pub volume: Volume,
    status: String,
}

impl MigrationProgress {
    /// 볼륨과 목적지 호스트로 진행 상태를 계산합니다.
    ///
    /// 호스트가 목적지와 같으면 `success`, 아니면 소문자 `migration_status`
    /// (비어 있으면 `pending`)입니다.
    pub fn evaluate(volume: Volume, destination: &str) -> Self {
        let status = if volume.host_str() == destination {
            MIGRATION_SUCCESS.to_owned()
        } else {
            let migration_status = volume.migration_status_lower();
            if migration_status.is_empty() {
                MIGRATION_PENDING.to_owned()
            } else {
                migration_status
            }
        };
        Self { volume, status }
    }
}

impl Observed for MigrationProgress {
    fn status(&self) -> &str {
        &self.status
    }
}

/// 마이그레이션 진행 조회기
#[derive(Debug)]
pub struct MigrationReader<'a, C> {
    client: &'a C,
    destination: String,
}

impl<'a, C: BlockStorageClient> MigrationReader<'a, C> {
    pub fn new(client: &'a C, destination: impl Into<String>) -> Self {
        Self {
            client,
            destination: destination.into(),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

impl<C: BlockStorageClient> ResourceReader for MigrationReader<'_, C> {
    type Resource = MigrationProgress;

    async fn fetch(&self, resource_id: &str) -> Result<MigrationProgress, ReadError> {
        let volume = self
            .client
            .show_volume(resource_id)
            .await
            .map_err(to_read_error)?;
        tracing::debug!(
            volume_id = resource_id,
            host = volume.host_str(),
            migration_status = volume.migration_status.as_deref().unwrap_or("<none>"),
            destination = %self.destination,
            "polled migration progress"
        );
        Ok(MigrationProgress::evaluate(volume, &self.destination))
    }
}
