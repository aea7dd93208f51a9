//! PowerStore 드라이버 지원 마이그레이션 시나리오
//!
//! 스케줄러 풀에서 PowerStore 배치 후보를 찾고, 볼륨을 같은 backend의
//! 다른 풀로 `os-migrate_volume` 합니다. backend가 다르면 retype이
//! 필요하므로 건너뜁니다.

use tracing::{info, warn};

use powerprobe_cinder::{
    BlockStorageClient, CreateVolumeRequest, CreateVolumeTypeRequest, HostTarget, Pool, Volume,
    wait_for_migration, wait_for_volume_status,
};

use crate::cleanup::CleanupAction;
use crate::context::{ScenarioContext, ensure, unique_name};
use crate::error::ScenarioError;
use crate::report::ScenarioOutcome;
use crate::volume_type::BACKEND_NAME_KEY;

const MIGRATION_VOLUME_SIZE_GB: u64 = 1;

/// 마이그레이션 요청을 받을 수 있는 볼륨 상태
const MIGRATABLE_STATES: [&str; 2] = ["available", "in-use"];

/// 이미 진행 중인 마이그레이션 상태
const BUSY_MIGRATION_STATES: [&str; 3] = ["starting", "migrating", "completing"];

/// 이름이나 `volume_backend_name`에 `backend`가 들어간 풀을 이름순으로 돌려줍니다.
pub fn discover_candidates(pools: Vec<Pool>, backend: &str) -> Vec<Pool> {
    let needle = backend.to_lowercase();
    let mut candidates: Vec<Pool> = pools
        .into_iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle)
                || p
                    .capabilities
                    .volume_backend_name
                    .as_deref()
                    .is_some_and(|b| b.to_lowercase().contains(&needle))
        })
        .collect();
    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    candidates.dedup_by(|a, b| a.name == b.name);
    candidates
}

/// 볼륨을 볼륨 타입으로 고정할 backend 이름
fn pinned_backend(pool: &Pool) -> Option<String> {
    pool.capabilities
        .volume_backend_name
        .clone()
        .or_else(|| HostTarget::parse(&pool.name).backend)
}

/// 마이그레이션을 요청할 수 있는 상태인지 확인합니다.
pub fn check_migratable(volume: &Volume) -> Result<(), ScenarioError> {
    let status = volume.status.to_lowercase();
    if !MIGRATABLE_STATES.contains(&status.as_str()) {
        return Err(ScenarioError::Assertion(format!(
            "volume {} is {status}, expected one of {MIGRATABLE_STATES:?}",
            volume.id
        )));
    }
    let migration_status = volume.migration_status_lower();
    if BUSY_MIGRATION_STATES.contains(&migration_status.as_str()) {
        return Err(ScenarioError::Assertion(format!(
            "volume {} already has migration in progress ({migration_status})",
            volume.id
        )));
    }
    Ok(())
}

pub async fn run<C: BlockStorageClient>(
    ctx: &mut ScenarioContext<'_, C>,
) -> Result<ScenarioOutcome, ScenarioError> {
    if !ctx.config.features.volume_types {
        return Ok(ScenarioOutcome::skipped("volume types feature is disabled"));
    }
    let client = ctx.client;
    let backend = &ctx.config.powerstore.backend_name;

    let candidates = discover_candidates(client.list_pools().await?, backend);
    info!(
        backend = %backend,
        pools = ?candidates.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        "discovered migration candidates"
    );
    let [source, target, ..] = candidates.as_slice() else {
        return Ok(ScenarioOutcome::skipped(format!(
            "need at least two '{backend}' pools, found {}",
            candidates.len()
        )));
    };
    let (mut source_host, mut target_host) = (source.name.clone(), target.name.clone());

    let pin = pinned_backend(source).ok_or_else(|| {
        ScenarioError::Precondition(format!("pool {} has no backend name", source.name))
    })?;
    let type_name = unique_name("powerstore-type");
    let volume_type = client
        .create_volume_type(&CreateVolumeTypeRequest::new(&type_name).extra_spec(BACKEND_NAME_KEY, &pin))
        .await?;
    ctx.defer(CleanupAction::DeleteVolumeType(volume_type.id.clone()));

    let created = client
        .create_volume(
            &CreateVolumeRequest::new(unique_name("powerstore-migrate-vol"), MIGRATION_VOLUME_SIZE_GB)
                .with_volume_type(&type_name),
        )
        .await?;
    ctx.defer(CleanupAction::DeleteVolumeAndWait(created.id.clone()));

    let volume = wait_for_volume_status(
        client,
        &created.id,
        "available",
        &ctx.config.volume,
        ctx.cancel,
    )
    .await?;
    let current_host = volume.host_str().to_owned();
    ctx.note(format!("volume {} available on {current_host}", volume.id));

    if current_host == target_host {
        std::mem::swap(&mut source_host, &mut target_host);
        ctx.note(format!("volume already on target, migrating back to {target_host}"));
    } else if current_host != source_host {
        warn!(
            volume_id = %volume.id,
            host = %current_host,
            expected = %source_host,
            "volume placed outside the discovered source pool"
        );
    }

    check_migratable(&volume)?;
    if target_host == current_host {
        return Ok(ScenarioOutcome::skipped(format!(
            "no target pool different from {current_host}"
        )));
    }

    let (from, to) = (HostTarget::parse(&current_host), HostTarget::parse(&target_host));
    if !from.same_backend(&to) {
        return Ok(ScenarioOutcome::skipped(format!(
            "cross-backend migration {from} -> {to} requires retype"
        )));
    }

    info!(volume_id = %volume.id, from = %from, to = %to, "requesting volume migration");
    client.migrate_volume(&volume.id, &target_host, false).await?;
    let migrated = wait_for_migration(
        client,
        &volume.id,
        &target_host,
        &ctx.config.migration,
        ctx.cancel,
    )
    .await?;

    ensure(migrated.host_str() != current_host, || {
        format!("volume {} is still on {current_host}", volume.id)
    })?;
    ensure(migrated.host_str() == target_host, || {
        format!(
            "volume {} landed on {}, expected {target_host}",
            volume.id,
            migrated.host_str()
        )
    })?;
    ctx.note(format!("volume {} migrated to {target_host}", volume.id));
    Ok(ScenarioOutcome::Passed)
}
