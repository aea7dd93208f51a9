//! PowerFlex back-end QoS 시나리오

use std::collections::BTreeMap;

use tracing::info;

use powerprobe_cinder::{
    BlockStorageClient, CreateVolumeRequest, QosConsumer, delete_volume_and_wait,
    wait_for_volume_status,
};

use crate::cleanup::CleanupAction;
use crate::context::{ScenarioContext, ensure_eq, unique_name};
use crate::error::ScenarioError;
use crate::report::ScenarioOutcome;
use crate::volume_type::{IOPS_LIMIT_KEY, check_volume, check_volume_type, powerflex_type_request};

pub async fn run<C: BlockStorageClient>(
    ctx: &mut ScenarioContext<'_, C>,
) -> Result<ScenarioOutcome, ScenarioError> {
    if !ctx.config.features.volume_types {
        return Ok(ScenarioOutcome::skipped("volume types feature is disabled"));
    }
    let client = ctx.client;
    let powerflex = &ctx.config.powerflex;

    let qos = client
        .create_qos(&unique_name("powerflex-qos"), QosConsumer::BackEnd)
        .await?;
    ctx.defer(CleanupAction::DeleteQos(qos.id.clone()));
    ensure_eq(
        "qos consumer",
        &Some(QosConsumer::BackEnd.as_str()),
        &qos.consumer.as_deref(),
    )?;

    let keys = BTreeMap::from([(IOPS_LIMIT_KEY.to_owned(), powerflex.iops_limit.clone())]);
    client.set_qos_keys(&qos.id, &keys).await?;

    let type_name = unique_name("powerflex-limit-iops");
    let volume_type = client
        .create_volume_type(&powerflex_type_request(powerflex, &type_name))
        .await?;
    ctx.defer(CleanupAction::DeleteVolumeType(volume_type.id.clone()));

    client.associate_qos(&qos.id, &volume_type.id).await?;
    ctx.defer(CleanupAction::DisassociateQos {
        qos_id: qos.id.clone(),
        type_id: volume_type.id.clone(),
    });
    check_volume_type(&volume_type, &type_name, powerflex)?;
    info!(qos_id = %qos.id, type_id = %volume_type.id, "qos spec associated with volume type");

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

    delete_volume_and_wait(client, &volume.id, &ctx.config.volume, ctx.cancel).await?;
    Ok(ScenarioOutcome::Passed)
}
