//! 시나리오 흐름 통합 테스트
//!
//! `FakeBlockStorage`를 대상으로 각 시나리오의 통과, 건너뜀, 실패 경로와
//! 정리 스택 동작을 검증합니다.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use powerprobe_cinder::testing::{FakeBlockStorage, pool, service};
use powerprobe_core::config::PowerprobeConfig;
use powerprobe_scenarios::{ScenarioKind, ScenarioOutcome, run_all, run_scenario};

fn config() -> PowerprobeConfig {
    PowerprobeConfig::default()
}

fn powerstore_cluster() -> FakeBlockStorage {
    FakeBlockStorage::new()
        .with_default_host("node1@powerstore#pool1")
        .with_services(vec![
            service("cinder-scheduler", "controller"),
            service("cinder-volume", "node1@powerstore"),
            service("cinder-volume", "node2@powerflex"),
        ])
}

// =============================================================================
// failover
// =============================================================================

#[tokio::test(start_paused = true)]
async fn failover_passes_and_cleans_up() {
    let fake = powerstore_cluster().with_create_polls(3);
    let cancel = CancellationToken::new();

    let report = run_scenario(ScenarioKind::FailoverPowerStore, &fake, &config(), &cancel).await;

    assert_eq!(report.outcome, ScenarioOutcome::Passed, "{report:?}");
    assert_eq!(
        fake.failover_calls(),
        vec![(
            "node1@powerstore".to_owned(),
            Some("powerstore-backend-id".to_owned())
        )]
    );
    assert!(report.cleanup_failures.is_empty());
    assert_eq!(fake.volume_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failover_skipped_when_replication_disabled() {
    let fake = powerstore_cluster();
    let mut config = config();
    config.features.replication = false;

    let report = run_scenario(
        ScenarioKind::FailoverPowerFlex,
        &fake,
        &config,
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(report.outcome, ScenarioOutcome::Skipped(_)));
    assert_eq!(fake.show_calls(), 0);
    assert!(fake.failover_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failover_without_volume_service_fails_and_cleans_up() {
    let fake = FakeBlockStorage::new().with_services(vec![service("cinder-volume", "node1@lvm")]);

    let report = run_scenario(
        ScenarioKind::FailoverPowerFlex,
        &fake,
        &config(),
        &CancellationToken::new(),
    )
    .await;

    match &report.outcome {
        ScenarioOutcome::Failed(reason) => assert!(reason.contains("powerflex"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(fake.volume_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failover_api_error_is_reported() {
    let fake = powerstore_cluster().with_failing_failover();

    let report = run_scenario(
        ScenarioKind::FailoverPowerStore,
        &fake,
        &config(),
        &CancellationToken::new(),
    )
    .await;

    match &report.outcome {
        ScenarioOutcome::Failed(reason) => assert!(reason.contains("500"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(fake.failover_calls().len(), 1);
    assert_eq!(fake.volume_count(), 0);
}

// =============================================================================
// volume-type / qos
// =============================================================================

#[tokio::test(start_paused = true)]
async fn volume_type_passes_and_removes_everything() {
    let fake = FakeBlockStorage::new()
        .with_pools(vec![pool("node2@powerflex1#SP1", Some("powerflex1"))])
        .with_create_polls(2)
        .with_delete_polls(2);

    let report = run_scenario(
        ScenarioKind::VolumeType,
        &fake,
        &config(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.outcome, ScenarioOutcome::Passed, "{report:?}");
    assert!(
        report
            .notes
            .iter()
            .any(|n| n.contains("node2@powerflex1#SP1"))
    );
    assert_eq!(fake.volume_count(), 0);
    assert_eq!(fake.volume_type_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn volume_type_retries_while_type_reported_in_use() {
    let fake = FakeBlockStorage::new().with_type_in_use_rejections(2);

    let report = run_scenario(
        ScenarioKind::VolumeType,
        &fake,
        &config(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.outcome, ScenarioOutcome::Passed, "{report:?}");
    assert!(report.duration >= Duration::from_secs(10));
    assert_eq!(fake.volume_type_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn volume_in_error_fails_scenario_but_is_still_deleted() {
    let fake = FakeBlockStorage::new().with_create_status("error");

    let report = run_scenario(
        ScenarioKind::VolumeType,
        &fake,
        &config(),
        &CancellationToken::new(),
    )
    .await;

    match &report.outcome {
        ScenarioOutcome::Failed(reason) => assert!(reason.contains("error"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(report.cleanup_failures.is_empty(), "{report:?}");
    assert_eq!(fake.volume_count(), 0);
    assert_eq!(fake.volume_type_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn volume_types_disabled_skips_type_scenarios() {
    let fake = FakeBlockStorage::new();
    let mut config = config();
    config.features.volume_types = false;

    for kind in [ScenarioKind::VolumeType, ScenarioKind::Qos, ScenarioKind::Migration] {
        let report = run_scenario(kind, &fake, &config, &CancellationToken::new()).await;
        assert!(
            matches!(report.outcome, ScenarioOutcome::Skipped(_)),
            "{kind}: {report:?}"
        );
    }
    assert_eq!(fake.volume_type_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn qos_passes_and_unwinds_association() {
    let fake = FakeBlockStorage::new().with_create_polls(2);

    let report = run_scenario(ScenarioKind::Qos, &fake, &config(), &CancellationToken::new()).await;

    assert_eq!(report.outcome, ScenarioOutcome::Passed, "{report:?}");
    assert!(report.cleanup_failures.is_empty(), "{report:?}");
    assert_eq!(fake.qos_count(), 0);
    assert_eq!(fake.volume_type_count(), 0);
    assert_eq!(fake.volume_count(), 0);
}

// =============================================================================
// migration
// =============================================================================

#[tokio::test(start_paused = true)]
async fn migration_moves_volume_to_sibling_pool() {
    let fake = FakeBlockStorage::new()
        .with_pools(vec![
            pool("node1@powerstore#pool-a", Some("powerstore")),
            pool("node1@powerstore#pool-b", Some("powerstore")),
            pool("node1@lvm#lvm", Some("lvm")),
        ])
        .with_migrate_polls(3);

    let report = run_scenario(
        ScenarioKind::Migration,
        &fake,
        &config(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.outcome, ScenarioOutcome::Passed, "{report:?}");
    let calls = fake.migrate_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "node1@powerstore#pool-b");
    assert!(!calls[0].2, "force_host_copy must be false");
    assert_eq!(fake.volume_count(), 0);
    assert_eq!(fake.volume_type_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn migration_reverses_direction_when_volume_lands_on_target() {
    // 배치는 목록 순서를 따르므로 볼륨은 정렬상 두 번째 풀에 놓입니다.
    let fake = FakeBlockStorage::new().with_pools(vec![
        pool("node1@powerstore#pool-b", Some("powerstore")),
        pool("node1@powerstore#pool-a", Some("powerstore")),
    ]);

    let report = run_scenario(
        ScenarioKind::Migration,
        &fake,
        &config(),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.outcome, ScenarioOutcome::Passed, "{report:?}");
    assert_eq!(fake.migrate_calls()[0].1, "node1@powerstore#pool-a");
}

#[tokio::test(start_paused = true)]
async fn migration_skipped_with_single_pool() {
    let fake = FakeBlockStorage::new()
        .with_pools(vec![pool("node1@powerstore#pool-a", Some("powerstore"))]);

    let report = run_scenario(
        ScenarioKind::Migration,
        &fake,
        &config(),
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(report.outcome, ScenarioOutcome::Skipped(_)));
    assert_eq!(fake.volume_type_count(), 0);
    assert!(fake.migrate_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn migration_across_backends_is_skipped() {
    let fake = FakeBlockStorage::new().with_pools(vec![
        pool("node1@powerstore_a#p1", None),
        pool("node1@powerstore_b#p2", None),
    ]);

    let report = run_scenario(
        ScenarioKind::Migration,
        &fake,
        &config(),
        &CancellationToken::new(),
    )
    .await;

    match &report.outcome {
        ScenarioOutcome::Skipped(reason) => assert!(reason.contains("retype"), "{reason}"),
        other => panic!("expected skip, got {other:?}"),
    }
    assert!(fake.migrate_calls().is_empty());
    assert_eq!(fake.volume_count(), 0);
    assert_eq!(fake.volume_type_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_migration_is_reported() {
    let fake = FakeBlockStorage::new()
        .with_pools(vec![
            pool("node1@powerstore#pool-a", Some("powerstore")),
            pool("node1@powerstore#pool-b", Some("powerstore")),
        ])
        .with_failing_migration();

    let report = run_scenario(
        ScenarioKind::Migration,
        &fake,
        &config(),
        &CancellationToken::new(),
    )
    .await;

    match &report.outcome {
        ScenarioOutcome::Failed(reason) => assert!(reason.contains("error"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(fake.volume_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn migration_already_in_progress_fails_scenario() {
    let fake = FakeBlockStorage::new()
        .with_pools(vec![
            pool("node1@powerstore#pool-a", Some("powerstore")),
            pool("node1@powerstore#pool-b", Some("powerstore")),
        ])
        .with_create_migration_status("migrating");

    let report = run_scenario(
        ScenarioKind::Migration,
        &fake,
        &config(),
        &CancellationToken::new(),
    )
    .await;

    match &report.outcome {
        ScenarioOutcome::Failed(reason) => {
            assert!(reason.contains("migration in progress"), "{reason}")
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(fake.migrate_calls().is_empty());
    assert_eq!(fake.volume_count(), 0);
    assert_eq!(fake.volume_type_count(), 0);
}

// =============================================================================
// runner
// =============================================================================

#[tokio::test(start_paused = true)]
async fn cancelled_run_all_skips_every_scenario() {
    let fake = powerstore_cluster();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let reports = run_all(&ScenarioKind::ALL, &fake, &config(), &cancel).await;

    assert_eq!(reports.len(), ScenarioKind::ALL.len());
    assert!(
        reports
            .iter()
            .all(|r| r.outcome == ScenarioOutcome::skipped("cancelled"))
    );
    assert_eq!(fake.show_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_mid_wait_fails_scenario() {
    let fake = powerstore_cluster().with_create_polls(1_000);
    let cancel = CancellationToken::new();
    let config = config();

    let (report, ()) = tokio::join!(
        run_scenario(ScenarioKind::FailoverPowerStore, &fake, &config, &cancel),
        async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            cancel.cancel();
        }
    );

    match &report.outcome {
        ScenarioOutcome::Failed(reason) => assert!(reason.contains("cancelled"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    // 아직 creating 상태라 정리 단계는 삭제를 건너뜁니다.
    assert!(report.cleanup_failures.is_empty());
    assert_eq!(fake.volume_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn run_all_reports_in_order() {
    let fake = powerstore_cluster().with_pools(vec![
        pool("node1@powerstore#pool-a", Some("powerstore")),
        pool("node1@powerstore#pool-b", Some("powerstore")),
    ]);
    let kinds = [ScenarioKind::Qos, ScenarioKind::Migration];

    let reports = run_all(&kinds, &fake, &config(), &CancellationToken::new()).await;

    let scenarios: Vec<ScenarioKind> = reports.iter().map(|r| r.scenario).collect();
    assert_eq!(scenarios, kinds);
    assert!(reports.iter().all(|r| r.is_clean()), "{reports:?}");
}
