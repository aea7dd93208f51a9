//! 볼륨 상태 대기 헬퍼
//!
//! `[volume]`, `[migration]` 설정에서 [`WaitSpec`]을 만들고
//! [`powerprobe_waiter::wait_until`]로 대기합니다.

use tokio_util::sync::CancellationToken;

use powerprobe_core::config::{MigrationConfig, VolumeConfig};
use powerprobe_waiter::{WaitError, WaitSpec, wait_until};

use crate::client::BlockStorageClient;
use crate::error::CinderError;
use crate::reader::{MIGRATION_SUCCESS, MigrationReader, VolumeReader};
use crate::types::Volume;

/// 볼륨 상태 대기에서 실패로 간주하는 상태
pub const VOLUME_FAILURE_STATES: [&str; 3] = ["error", "error_restoring", "error_extending"];

/// 볼륨 삭제 대기에서 실패로 간주하는 상태
pub const VOLUME_DELETE_FAILURE_STATES: [&str; 1] = ["error_deleting"];

/// 마이그레이션 대기에서 실패로 간주하는 상태
pub const MIGRATION_FAILURE_STATES: [&str; 2] = ["error", "failed"];

/// 볼륨이 `status`에 도달하기를 기다리는 명세
pub fn volume_status_spec(
    volume_id: &str,
    status: &str,
    config: &VolumeConfig,
) -> Result<WaitSpec, WaitError> {
    WaitSpec::presence(volume_id, status)
        .failure_states(VOLUME_FAILURE_STATES)
        .timeout(config.build_timeout())
        .initial_interval(config.build_interval())
        .backoff_multiplier(config.backoff_multiplier)
        .max_interval(config.max_interval())
        .build()
}

/// 볼륨이 사라지기를 기다리는 명세
pub fn volume_deletion_spec(volume_id: &str, config: &VolumeConfig) -> Result<WaitSpec, WaitError> {
    WaitSpec::absence(volume_id)
        .failure_states(VOLUME_DELETE_FAILURE_STATES)
        .timeout(config.build_timeout())
        .initial_interval(config.build_interval())
        .backoff_multiplier(config.backoff_multiplier)
        .max_interval(config.max_interval())
        .build()
}

/// 마이그레이션 완료를 기다리는 명세 (고정 간격)
pub fn migration_spec(volume_id: &str, config: &MigrationConfig) -> Result<WaitSpec, WaitError> {
    WaitSpec::presence(volume_id, MIGRATION_SUCCESS)
        .failure_states(MIGRATION_FAILURE_STATES)
        .timeout(config.timeout())
        .initial_interval(config.poll_interval())
        .backoff_multiplier(1.0)
        .max_interval(config.poll_interval())
        .build()
}

/// 볼륨이 `status`에 도달할 때까지 대기하고 마지막 스냅샷을 반환합니다.
pub async fn wait_for_volume_status<C: BlockStorageClient>(
    client: &C,
    volume_id: &str,
    status: &str,
    config: &VolumeConfig,
    cancel: &CancellationToken,
) -> Result<Volume, CinderError> {
    let spec = volume_status_spec(volume_id, status, config)?;
    let volume = wait_until(&spec, &VolumeReader::new(client), cancel).await?;
    volume.ok_or_else(|| CinderError::NotFound(format!("volume {volume_id} vanished")))
}

/// 볼륨이 삭제될 때까지 대기합니다.
pub async fn wait_for_volume_deletion<C: BlockStorageClient>(
    client: &C,
    volume_id: &str,
    config: &VolumeConfig,
    cancel: &CancellationToken,
) -> Result<(), CinderError> {
    let spec = volume_deletion_spec(volume_id, config)?;
    wait_until(&spec, &VolumeReader::new(client), cancel).await?;
    Ok(())
}

/// 볼륨이 `destination`으로 옮겨질 때까지 대기하고 마지막 스냅샷을 반환합니다.
pub async fn wait_for_migration<C: BlockStorageClient>(
    client: &C,
    volume_id: &str,
    destination: &str,
    config: &MigrationConfig,
    cancel: &CancellationToken,
) -> Result<Volume, CinderError> {
    let spec = migration_spec(volume_id, config)?;
    let reader = MigrationReader::new(client, destination);
    let progress = wait_until(&spec, &reader, cancel).await?;
    progress
        .map(|p| p.volume)
        .ok_or_else(|| CinderError::NotFound(format!("volume {volume_id} vanished")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::testing::{FakeBlockStorage, pool};
    use crate::types::CreateVolumeRequest;

    fn volume_config() -> VolumeConfig {
        VolumeConfig {
            build_interval_secs: 1,
            build_timeout_secs: 30,
            backoff_multiplier: 2.0,
            max_interval_secs: 4,
        }
    }

    #[test]
    fn status_spec_uses_volume_timing() {
        let spec = volume_status_spec("vol-1", "available", &volume_config()).unwrap();
        assert_eq!(spec.timeout(), Duration::from_secs(30));
        assert_eq!(spec.max_interval(), Duration::from_secs(4));
        assert!(spec.failure_states().contains("error_extending"));
    }

    #[test]
    fn migration_spec_has_fixed_interval() {
        let spec = migration_spec("vol-1", &MigrationConfig::default()).unwrap();
        assert_eq!(spec.initial_interval(), spec.max_interval());
        assert!(spec.failure_states().contains("failed"));
        assert!(spec.target_states().contains(MIGRATION_SUCCESS));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_until_volume_available() {
        let fake = FakeBlockStorage::new().with_create_polls(3);
        let created = fake
            .create_volume(&CreateVolumeRequest::new("v", 1))
            .await
            .unwrap();
        let start = Instant::now();

        let volume = wait_for_volume_status(
            &fake,
            &created.id,
            "available",
            &volume_config(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(volume.status, "available");
        // 0, 1, 3, 7초에 조회
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn error_status_fails_fast() {
        let fake = FakeBlockStorage::new()
            .with_create_polls(0)
            .with_create_status("error");
        let created = fake
            .create_volume(&CreateVolumeRequest::new("v", 1))
            .await
            .unwrap();

        let err = wait_for_volume_status(
            &fake,
            &created.id,
            "available",
            &volume_config(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            CinderError::Wait(WaitError::ResourceFailed { ref status, .. }) if status == "error"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn deletion_wait_tolerates_transient_errors() {
        let fake = FakeBlockStorage::new().with_create_polls(0);
        let created = fake
            .create_volume(&CreateVolumeRequest::new("v", 1))
            .await
            .unwrap();
        fake.show_volume(&created.id).await.unwrap();
        fake.delete_volume(&created.id).await.unwrap();
        let fake = fake.with_transient_failures(2);

        wait_for_volume_deletion(&fake, &created.id, &volume_config(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(fake.volume_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn migration_wait_returns_moved_volume() {
        let fake = FakeBlockStorage::new()
            .with_create_polls(0)
            .with_migrate_polls(2)
            .with_default_host("n1@ps#p1")
            .with_pools(vec![pool("n1@ps#p1", None), pool("n2@ps#p2", None)]);
        let created = fake
            .create_volume(&CreateVolumeRequest::new("v", 1))
            .await
            .unwrap();
        fake.show_volume(&created.id).await.unwrap();
        fake.migrate_volume(&created.id, "n2@ps#p2", false)
            .await
            .unwrap();

        let config = MigrationConfig {
            timeout_secs: 120,
            poll_interval_secs: 10,
        };
        let volume = wait_for_migration(
            &fake,
            &created.id,
            "n2@ps#p2",
            &config,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(volume.host_str(), "n2@ps#p2");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_migration_is_reported() {
        let fake = FakeBlockStorage::new()
            .with_create_polls(0)
            .with_failing_migration()
            .with_default_host("n1@ps#p1")
            .with_pools(vec![pool("n1@ps#p1", None), pool("n2@ps#p2", None)]);
        let created = fake
            .create_volume(&CreateVolumeRequest::new("v", 1))
            .await
            .unwrap();
        fake.show_volume(&created.id).await.unwrap();
        fake.migrate_volume(&created.id, "n2@ps#p2", false)
            .await
            .unwrap();

        let err = wait_for_migration(
            &fake,
            &created.id,
            "n2@ps#p2",
            &MigrationConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            CinderError::Wait(WaitError::ResourceFailed { .. })
        ));
    }
}
