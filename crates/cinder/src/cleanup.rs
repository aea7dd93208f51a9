//! 정리 헬퍼 -- 테스트 리소스의 안전한 삭제
//!
//! 정리 단계는 이미 사라진 리소스를 성공으로 취급하고, 삭제할 수 없는
//! 상태의 볼륨은 건너뜁니다. 호출자는 [`DeleteOutcome`]으로 무엇이
//! 일어났는지 확인할 수 있습니다.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use powerprobe_core::config::VolumeConfig;
use powerprobe_waiter::WaitError;

use crate::client::BlockStorageClient;
use crate::error::CinderError;
use crate::wait::wait_for_volume_deletion;

/// 삭제 요청을 보낼 수 있는 볼륨 상태
pub const DELETABLE_STATES: [&str; 5] = [
    "available",
    "error",
    "error_restoring",
    "error_extending",
    "error_managing",
];

/// 정리 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// 삭제 후 부재를 확인함
    Deleted,
    /// 요청 시점에 이미 없었음
    AlreadyGone,
    /// 삭제할 수 없는 상태라 건너뜀
    Skipped { status: String },
}

impl fmt::Display for DeleteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deleted => write!(f, "deleted"),
            Self::AlreadyGone => write!(f, "already gone"),
            Self::Skipped { status } => write!(f, "skipped (status {status})"),
        }
    }
}

/// 볼륨 타입 삭제 재시도 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDeletePolicy {
    /// 사용 중(400) 응답을 재시도할 최대 시간
    pub timeout: Duration,
    /// 재시도 간격
    pub interval: Duration,
}

impl Default for TypeDeletePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            interval: Duration::from_secs(5),
        }
    }
}

/// 삭제 가능한 상태일 때만 볼륨을 삭제하고 부재를 기다립니다.
pub async fn safe_delete_volume<C: BlockStorageClient>(
    client: &C,
    volume_id: &str,
    config: &VolumeConfig,
    cancel: &CancellationToken,
) -> Result<DeleteOutcome, CinderError> {
    let volume = match client.show_volume(volume_id).await {
        Ok(volume) => volume,
        Err(CinderError::NotFound(_)) => {
            debug!(volume_id = volume_id, "volume already gone");
            return Ok(DeleteOutcome::AlreadyGone);
        }
        Err(e) => return Err(e),
    };

    let status = volume.status.to_lowercase();
    if !DELETABLE_STATES.contains(&status.as_str()) {
        warn!(
            volume_id = volume_id,
            status = %status,
            "skipping deletion of volume in non-deletable status"
        );
        return Ok(DeleteOutcome::Skipped { status });
    }

    match client.delete_volume(volume_id).await {
        Ok(()) => {}
        Err(CinderError::NotFound(_)) => return Ok(DeleteOutcome::AlreadyGone),
        Err(e) => return Err(e),
    }
    wait_for_volume_deletion(client, volume_id, config, cancel).await?;
    info!(volume_id = volume_id, "volume deleted");
    Ok(DeleteOutcome::Deleted)
}

/// 볼륨 삭제를 요청하고 사라질 때까지 기다립니다.
///
/// 삭제 요청 시점의 NotFound는 이미 삭제된 것으로 처리합니다.
/// 그 외 삭제 요청 에러는 기록만 하고 부재 대기를 계속합니다.
pub async fn delete_volume_and_wait<C: BlockStorageClient>(
    client: &C,
    volume_id: &str,
    config: &VolumeConfig,
    cancel: &CancellationToken,
) -> Result<DeleteOutcome, CinderError> {
    info!(volume_id = volume_id, "deleting volume and waiting until it vanishes");
    match client.delete_volume(volume_id).await {
        Ok(()) => {}
        Err(CinderError::NotFound(_)) => {
            info!(
                volume_id = volume_id,
                "volume not found at delete request time, treating as deleted"
            );
            return Ok(DeleteOutcome::AlreadyGone);
        }
        Err(e) => {
            debug!(
                volume_id = volume_id,
                error = %e,
                "delete request failed, continuing to wait for deletion"
            );
        }
    }

    wait_for_volume_deletion(client, volume_id, config, cancel).await?;
    info!(volume_id = volume_id, "volume deletion confirmed");
    Ok(DeleteOutcome::Deleted)
}

/// 볼륨 타입을 삭제합니다. 아직 사용 중이면 정책에 따라 재시도합니다.
///
/// NotFound는 이미 삭제된 것으로 처리합니다. 제한 시간이 지나면 마지막으로
/// 한 번 더 시도하고 그 결과를 반환합니다.
pub async fn delete_volume_type_safe<C: BlockStorageClient>(
    client: &C,
    type_id: &str,
    policy: TypeDeletePolicy,
    cancel: &CancellationToken,
) -> Result<DeleteOutcome, CinderError> {
    let started = Instant::now();
    let deadline = started
        .checked_add(policy.timeout)
        .ok_or_else(|| WaitError::Config {
            reason: format!("volume type delete timeout {:?} is too large", policy.timeout),
        })?;
    let mut attempts: u32 = 0;

    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        attempts += 1;

        match client.delete_volume_type(type_id).await {
            Ok(()) => {
                info!(type_id = type_id, attempts = attempts, "volume type deleted");
                return Ok(DeleteOutcome::Deleted);
            }
            Err(CinderError::NotFound(_)) => return Ok(DeleteOutcome::AlreadyGone),
            Err(CinderError::BadRequest(reason)) => {
                info!(
                    type_id = type_id,
                    attempt = attempts,
                    reason = %reason,
                    "volume type still in use, retrying"
                );
            }
            Err(e) => return Err(e),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(CinderError::Wait(WaitError::Cancelled {
                    resource_id: type_id.to_owned(),
                    attempts,
                    elapsed: started.elapsed(),
                }));
            }
            _ = tokio::time::sleep(policy.interval.min(remaining)) => {}
        }
    }

    match client.delete_volume_type(type_id).await {
        Ok(()) => Ok(DeleteOutcome::Deleted),
        Err(CinderError::NotFound(_)) => Ok(DeleteOutcome::AlreadyGone),
        Err(e) => {
            warn!(
                type_id = type_id,
                error = %e,
                "final attempt to delete volume type failed"
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBlockStorage;
    use crate::types::{CreateVolumeRequest, CreateVolumeTypeRequest, Volume};

    fn volume_config() -> VolumeConfig {
        VolumeConfig {
            build_interval_secs: 1,
            build_timeout_secs: 60,
            backoff_multiplier: 1.5,
            max_interval_secs: 5,
        }
    }

    fn volume_with_status(id: &str, status: &str) -> Volume {
        Volume {
            id: id.to_owned(),
            name: None,
            status: status.to_owned(),
            size: 1,
            volume_type: None,
            host: None,
            migration_status: None,
            replication_status: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn safe_delete_removes_available_volume() {
        let fake = FakeBlockStorage::new().with_delete_polls(2);
        fake.insert_volume(volume_with_status("vol-1", "available"));

        let outcome = safe_delete_volume(&fake, "vol-1", &volume_config(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(fake.volume_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn safe_delete_skips_in_use_volume() {
        let fake = FakeBlockStorage::new();
        fake.insert_volume(volume_with_status("vol-1", "in-use"));

        let outcome = safe_delete_volume(&fake, "vol-1", &volume_config(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DeleteOutcome::Skipped {
                status: "in-use".to_owned()
            }
        );
        assert_eq!(fake.volume_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn safe_delete_accepts_error_states() {
        for status in ["error", "error_restoring", "error_extending", "error_managing"] {
            let fake = FakeBlockStorage::new();
            fake.insert_volume(volume_with_status("vol-1", status));
            let outcome =
                safe_delete_volume(&fake, "vol-1", &volume_config(), &CancellationToken::new())
                    .await
                    .unwrap();
            assert_eq!(outcome, DeleteOutcome::Deleted, "status {status}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn safe_delete_missing_volume_is_already_gone() {
        let fake = FakeBlockStorage::new();
        let outcome = safe_delete_volume(&fake, "vol-x", &volume_config(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::AlreadyGone);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_and_wait_treats_not_found_as_deleted() {
        let fake = FakeBlockStorage::new();
        let outcome =
            delete_volume_and_wait(&fake, "vol-x", &volume_config(), &CancellationToken::new())
                .await
                .unwrap();
        assert_eq!(outcome, DeleteOutcome::AlreadyGone);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_and_wait_confirms_absence() {
        let fake = FakeBlockStorage::new().with_create_polls(0);
        let volume = fake
            .create_volume(&CreateVolumeRequest::new("v", 1))
            .await
            .unwrap();
        fake.show_volume(&volume.id).await.unwrap();

        let outcome =
            delete_volume_and_wait(&fake, &volume.id, &volume_config(), &CancellationToken::new())
                .await
                .unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(fake.peek_volume(&volume.id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn type_delete_retries_while_in_use() {
        let fake = FakeBlockStorage::new().with_type_in_use_rejections(2);
        let vt = fake
            .create_volume_type(&CreateVolumeTypeRequest::new("gold"))
            .await
            .unwrap();
        let start = Instant::now();

        let outcome = delete_volume_type_safe(
            &fake,
            &vt.id,
            TypeDeletePolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(fake.volume_type_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn type_delete_not_found_is_done() {
        let fake = FakeBlockStorage::new();
        let outcome = delete_volume_type_safe(
            &fake,
            "type-x",
            TypeDeletePolicy::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, DeleteOutcome::AlreadyGone);
    }

    #[tokio::test(start_paused = true)]
    async fn type_delete_gives_up_after_timeout() {
        let fake = FakeBlockStorage::new().with_type_in_use_rejections(u32::MAX);
        let vt = fake
            .create_volume_type(&CreateVolumeTypeRequest::new("gold"))
            .await
            .unwrap();
        let policy = TypeDeletePolicy {
            timeout: Duration::from_secs(12),
            interval: Duration::from_secs(5),
        };

        let err = delete_volume_type_safe(&fake, &vt.id, policy, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CinderError::BadRequest(_)));
        assert_eq!(fake.volume_type_count(), 1);
    }

    #[test]
    fn delete_outcome_display() {
        assert_eq!(DeleteOutcome::Deleted.to_string(), "deleted");
        assert_eq!(
            DeleteOutcome::Skipped {
                status: "in-use".to_owned()
            }
            .to_string(),
            "skipped (status in-use)"
        );
    }
}
