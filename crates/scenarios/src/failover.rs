//! 복제 볼륨 페일오버 시나리오
//!
//! 복제 볼륨을 만들고 백엔드의 `cinder-volume` 호스트를 페일오버한 뒤
//! 볼륨이 `available` 상태로 `failed-over` 복제 상태를 보고하는지 확인합니다.

use tracing::info;

use powerprobe_cinder::{BlockStorageClient, CreateVolumeRequest, wait_for_volume_status};
use powerprobe_core::config::PowerprobeConfig;

use crate::cleanup::CleanupAction;
use crate::context::{ScenarioContext, ensure_eq, unique_name};
use crate::error::ScenarioError;
use crate::report::ScenarioOutcome;

const VOLUME_SERVICE_BINARY: &str = "cinder-volume";
const FAILOVER_VOLUME_SIZE_GB: u64 = 1;
const FAILED_OVER: &str = "failed-over";

/// 페일오버 대상 백엔드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverTarget {
    /// 서비스 호스트 검색에 쓰는 부분 문자열
    pub backend_name: String,
    /// `failover_host`에 전달할 backend_id
    pub backend_id: String,
}

impl FailoverTarget {
    pub fn powerstore(config: &PowerprobeConfig) -> Self {
        Self {
            backend_name: config.powerstore.backend_name.clone(),
            backend_id: config.powerstore.backend_id.clone(),
        }
    }

    pub fn powerflex(config: &PowerprobeConfig) -> Self {
        Self {
            backend_name: config.powerflex.backend_name.clone(),
            backend_id: config.powerflex.backend_id.clone(),
        }
    }
}

/// 백엔드 이름을 포함하는 `cinder-volume` 서비스 호스트를 찾습니다.
pub async fn discover_volume_host<C: BlockStorageClient>(
    client: &C,
    backend_name: &str,
) -> Result<String, ScenarioError> {
    client
        .list_services()
        .await?
        .into_iter()
        .find(|s| s.binary == VOLUME_SERVICE_BINARY && s.host.contains(backend_name))
        .map(|s| s.host)
        .ok_or_else(|| {
            ScenarioError::Assertion(format!(
                "no {VOLUME_SERVICE_BINARY} service found for backend '{backend_name}'"
            ))
        })
}

pub async fn run<C: BlockStorageClient>(
    ctx: &mut ScenarioContext<'_, C>,
    target: &FailoverTarget,
) -> Result<ScenarioOutcome, ScenarioError> {
    if !ctx.config.features.replication {
        return Ok(ScenarioOutcome::skipped("replication feature is disabled"));
    }
    let client = ctx.client;

    let name = unique_name(&format!("{}-volume", target.backend_name));
    let created = client
        .create_volume(&CreateVolumeRequest::new(&name, FAILOVER_VOLUME_SIZE_GB))
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
    ensure_eq("volume status before failover", "available", volume.status.as_str())?;
    info!(volume_id = %volume.id, "created volume for failover");

    let host = discover_volume_host(client, &target.backend_name).await?;
    ctx.note(format!("failing over host {host} to {}", target.backend_id));
    client
        .failover_host(&host, Some(target.backend_id.as_str()))
        .await?;

    let after = client.show_volume(&volume.id).await?;
    ensure_eq("volume status after failover", "available", after.status.as_str())?;
    ensure_eq(
        "replication_status",
        &Some(FAILED_OVER),
        &after.replication_status.as_deref(),
    )?;

    Ok(ScenarioOutcome::Passed)
}
