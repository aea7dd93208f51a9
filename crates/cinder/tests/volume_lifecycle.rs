//! 볼륨 수명 주기 통합 테스트
//!
//! 생성 → available 대기 → 안전 삭제 → 부재 확인 흐름을
//! `FakeBlockStorage`로 검증합니다.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use powerprobe_cinder::testing::FakeBlockStorage;
use powerprobe_cinder::{
    BlockStorageClient, CinderError, CreateVolumeRequest, CreateVolumeTypeRequest, DeleteOutcome,
    TypeDeletePolicy, delete_volume_type_safe, safe_delete_volume, wait_for_volume_status,
};
use powerprobe_core::config::VolumeConfig;
use powerprobe_waiter::WaitError;

fn config() -> VolumeConfig {
    VolumeConfig {
        build_interval_secs: 1,
        build_timeout_secs: 20,
        backoff_multiplier: 1.5,
        max_interval_secs: 4,
    }
}

#[tokio::test(start_paused = true)]
async fn create_wait_delete_round() {
    let fake = FakeBlockStorage::new()
        .with_create_polls(2)
        .with_delete_polls(2);
    let cancel = CancellationToken::new();

    fake.create_volume_type(&CreateVolumeTypeRequest::new("gold"))
        .await
        .unwrap();
    let created = fake
        .create_volume(&CreateVolumeRequest::new("v", 8).with_volume_type("gold"))
        .await
        .unwrap();

    let volume = wait_for_volume_status(&fake, &created.id, "available", &config(), &cancel)
        .await
        .unwrap();
    assert_eq!(volume.size, 8);
    assert_eq!(volume.volume_type.as_deref(), Some("gold"));

    let outcome = safe_delete_volume(&fake, &created.id, &config(), &cancel)
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(fake.volume_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn volume_that_never_becomes_available_times_out() {
    let fake = FakeBlockStorage::new().with_create_polls(1_000);
    let created = fake
        .create_volume(&CreateVolumeRequest::new("v", 1))
        .await
        .unwrap();
    let start = Instant::now();

    let err = wait_for_volume_status(
        &fake,
        &created.id,
        "available",
        &config(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    match err {
        CinderError::Wait(WaitError::Timeout { last_status, .. }) => {
            assert_eq!(last_status.as_deref(), Some("creating"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(start.elapsed(), Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn type_is_deleted_once_volume_is_gone() {
    let fake = FakeBlockStorage::new().with_create_polls(0);
    let cancel = CancellationToken::new();
    let vt = fake
        .create_volume_type(&CreateVolumeTypeRequest::new("gold"))
        .await
        .unwrap();
    let created = fake
        .create_volume(&CreateVolumeRequest::new("v", 1).with_volume_type("gold"))
        .await
        .unwrap();
    wait_for_volume_status(&fake, &created.id, "available", &config(), &cancel)
        .await
        .unwrap();

    // 볼륨이 남아 있으면 타입 삭제는 정책 시간 동안 재시도 후 실패
    let short = TypeDeletePolicy {
        timeout: Duration::from_secs(3),
        interval: Duration::from_secs(1),
    };
    assert!(
        delete_volume_type_safe(&fake, &vt.id, short, &cancel)
            .await
            .is_err()
    );

    safe_delete_volume(&fake, &created.id, &config(), &cancel)
        .await
        .unwrap();
    let outcome = delete_volume_type_safe(&fake, &vt.id, short, &cancel)
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_volume_wait() {
    let fake = FakeBlockStorage::new().with_create_polls(1_000);
    let created = fake
        .create_volume(&CreateVolumeRequest::new("v", 1))
        .await
        .unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.cancel();
    });

    let err = wait_for_volume_status(&fake, &created.id, "available", &config(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CinderError::Wait(WaitError::Cancelled { .. })
    ));
}
