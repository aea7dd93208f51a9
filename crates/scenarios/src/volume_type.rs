//! PowerFlex 볼륨 타입 시나리오
//!
//! 백엔드 extra spec을 가진 볼륨 타입으로 볼륨을 만들고, 볼륨과 타입을
//! 순서대로 삭제합니다.

use tracing::info;

use powerprobe_cinder::{
    BlockStorageClient, CreateVolumeRequest, CreateVolumeTypeRequest, TypeDeletePolicy, Volume,
    VolumeType, delete_volume_and_wait, delete_volume_type_safe, wait_for_volume_status,
};
use powerprobe_core::config::PowerFlexConfig;

use crate::cleanup::CleanupAction;
use crate::context::{ScenarioContext, ensure, ensure_eq, unique_name};
use crate::error::ScenarioError;
use crate::report::ScenarioOutcome;

pub const BACKEND_NAME_KEY: &str = "volume_backend_name";
pub const STORAGE_POOL_KEY: &str = "powerflex:storage_pool_name";
pub const PROTECTION_DOMAIN_KEY: &str = "powerflex:protection_domain_name";
pub const PROVISIONING_KEY: &str = "provisioning:type";
pub const IOPS_LIMIT_KEY: &str = "powerflex:iops_limit";

/// PowerFlex 배치 extra spec을 채운 볼륨 타입 요청
pub fn powerflex_type_request(config: &PowerFlexConfig, name: &str) -> CreateVolumeTypeRequest {
    CreateVolumeTypeRequest::new(name)
        .extra_spec(BACKEND_NAME_KEY, &config.volume_backend_name)
        .extra_spec(STORAGE_POOL_KEY, &config.storage_pool_name)
        .extra_spec(PROTECTION_DOMAIN_KEY, &config.protection_domain_name)
        .extra_spec(PROVISIONING_KEY, &config.provisioning_type)
}

pub(crate) fn check_volume_type(
    volume_type: &VolumeType,
    name: &str,
    config: &PowerFlexConfig,
) -> Result<(), ScenarioError> {
    ensure_eq("volume type name", name, volume_type.name.as_str())?;
    ensure(volume_type.is_public, || {
        format!("volume type {} is not public", volume_type.id)
    })?;
    ensure_eq(
        "volume_backend_name extra spec",
        &Some(config.volume_backend_name.as_str()),
        &volume_type.extra_specs.get(BACKEND_NAME_KEY).map(String::as_str),
    )
}

pub(crate) fn check_volume(
    volume: &Volume,
    name: &str,
    type_name: &str,
    size: u64,
) -> Result<(), ScenarioError> {
    ensure_eq("volume name", &Some(name), &volume.name.as_deref())?;
    ensure_eq("volume type", &Some(type_name), &volume.volume_type.as_deref())?;
    ensure_eq("volume size", &size, &volume.size)
}

pub async fn run<C: BlockStorageClient>(
    ctx: &mut ScenarioContext<'_, C>,
) -> Result<ScenarioOutcome, ScenarioError> {
    if !ctx.config.features.volume_types {
        return Ok(ScenarioOutcome::skipped("volume types feature is disabled"));
    }
    let client = ctx.client;
    let powerflex = &ctx.config.powerflex;

    let type_name = unique_name("powerflex-limit-iops");
    let request = powerflex_type_request(powerflex, &type_name)
        .extra_spec(IOPS_LIMIT_KEY, &powerflex.iops_limit);
    let volume_type = client.create_volume_type(&request).await?;
    ctx.defer(CleanupAction::DeleteVolumeType(volume_type.id.clone()));
    check_volume_type(&volume_type, &type_name, powerflex)?;
    info!(type_id = %volume_type.id, name = %type_name, "created powerflex volume type");

    let volume_name = unique_name("powerflex-volume");
    let created = client
        .create_volume(
            &CreateVolumeRequest::new(&volume_name, powerflex.volume_size_gb)
                .with_volume_type(&type_name),
        )
        .await?;
    ctx.defer(CleanupAction::SafeDeleteVolume(created.id.clone()));

    let volume = wait_for_volume_status(
        client,
        &created.id,
        "available",
        &ctx.config.volume,
        ctx.cancel,
    )
    .await?;
    check_volume(&volume, &volume_name, &type_name, powerflex.volume_size_gb)?;
    ctx.note(format!("volume {} placed on {}", volume.id, volume.host_str()));

    let outcome = delete_volume_and_wait(client, &volume.id, &ctx.config.volume, ctx.cancel).await?;
    info!(volume_id = %volume.id, outcome = %outcome, "volume removed");
    delete_volume_type_safe(client, &volume_type.id, TypeDeletePolicy::default(), ctx.cancel)
        .await?;

    Ok(ScenarioOutcome::Passed)
}
