//! LIFO 정리 스택
//!
//! 시나리오는 리소스를 만들 때마다 되돌리는 작업을 등록합니다.
//! [`CleanupStack::run`]은 시나리오 결과와 상관없이 역순으로 모두 실행하고,
//! 실패는 로그와 메트릭으로 남긴 뒤 다음 작업으로 넘어갑니다.

use std::fmt;

use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use powerprobe_cinder::{
    BlockStorageClient, CinderError, DeleteOutcome, TypeDeletePolicy, delete_volume_and_wait,
    delete_volume_type_safe, safe_delete_volume,
};
use powerprobe_core::config::VolumeConfig;
use powerprobe_core::metrics as m;

/// 등록 가능한 정리 작업
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    /// 삭제 가능한 상태일 때만 볼륨 삭제
    SafeDeleteVolume(String),
    /// 볼륨 삭제 요청 후 부재 대기
    DeleteVolumeAndWait(String),
    /// 사용 중이면 재시도하며 볼륨 타입 삭제
    DeleteVolumeType(String),
    /// QoS 명세와 볼륨 타입의 연결 해제
    DisassociateQos { qos_id: String, type_id: String },
    /// QoS 명세 삭제
    DeleteQos(String),
}

impl fmt::Display for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SafeDeleteVolume(id) => write!(f, "safe delete volume {id}"),
            Self::DeleteVolumeAndWait(id) => write!(f, "delete volume {id}"),
            Self::DeleteVolumeType(id) => write!(f, "delete volume type {id}"),
            Self::DisassociateQos { qos_id, type_id } => {
                write!(f, "disassociate qos {qos_id} from type {type_id}")
            }
            Self::DeleteQos(id) => write!(f, "delete qos {id}"),
        }
    }
}

impl CleanupAction {
    async fn execute<C: BlockStorageClient>(
        &self,
        client: &C,
        config: &VolumeConfig,
        cancel: &CancellationToken,
    ) -> Result<DeleteOutcome, CinderError> {
        match self {
            Self::SafeDeleteVolume(id) => safe_delete_volume(client, id, config, cancel).await,
            Self::DeleteVolumeAndWait(id) => {
                delete_volume_and_wait(client, id, config, cancel).await
            }
            Self::DeleteVolumeType(id) => {
                delete_volume_type_safe(client, id, TypeDeletePolicy::default(), cancel).await
            }
            Self::DisassociateQos { qos_id, type_id } => {
                gone_is_done(client.disassociate_qos(qos_id, type_id).await)
            }
            Self::DeleteQos(id) => gone_is_done(client.delete_qos(id).await),
        }
    }
}

fn gone_is_done(result: Result<(), CinderError>) -> Result<DeleteOutcome, CinderError> {
    match result {
        Ok(()) => Ok(DeleteOutcome::Deleted),
        Err(CinderError::NotFound(_)) => Ok(DeleteOutcome::AlreadyGone),
        Err(e) => Err(e),
    }
}

/// 역순으로 실행되는 정리 작업 목록
#[derive(Debug, Default)]
pub struct CleanupStack {
    actions: Vec<CleanupAction>,
}

impl CleanupStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: CleanupAction) {
        debug!(action = %action, "cleanup registered");
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// 등록 역순으로 모든 작업을 실행하고 실패한 작업의 설명을 반환합니다.
    pub async fn run<C: BlockStorageClient>(
        self,
        client: &C,
        config: &VolumeConfig,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        let mut failures = Vec::new();
        for action in self.actions.into_iter().rev() {
            match action.execute(client, config, cancel).await {
                Ok(outcome) => info!(action = %action, outcome = %outcome, "cleanup step done"),
                Err(e) => {
                    warn!(action = %action, error = %e, "cleanup step failed");
                    counter!(m::SCENARIO_CLEANUP_FAILURES_TOTAL).increment(1);
                    failures.push(format!("{action}: {e}"));
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use powerprobe_cinder::testing::FakeBlockStorage;
    use powerprobe_cinder::{CreateVolumeRequest, CreateVolumeTypeRequest, QosConsumer};

    #[tokio::test(start_paused = true)]
    async fn runs_in_reverse_registration_order() {
        let client = FakeBlockStorage::new();
        let cancel = CancellationToken::new();
        let qos = client.create_qos("q", QosConsumer::BackEnd).await.unwrap();
        client
            .set_qos_keys(&qos.id, &BTreeMap::from([("k".to_owned(), "v".to_owned())]))
            .await
            .unwrap();
        let vtype = client
            .create_volume_type(&CreateVolumeTypeRequest::new("t"))
            .await
            .unwrap();
        client.associate_qos(&qos.id, &vtype.id).await.unwrap();

        let mut stack = CleanupStack::new();
        stack.push(CleanupAction::DeleteQos(qos.id.clone()));
        stack.push(CleanupAction::DeleteVolumeType(vtype.id.clone()));
        stack.push(CleanupAction::DisassociateQos {
            qos_id: qos.id.clone(),
            type_id: vtype.id.clone(),
        });
        assert_eq!(stack.len(), 3);

        let failures = stack.run(&client, &VolumeConfig::default(), &cancel).await;
        assert!(failures.is_empty(), "{failures:?}");
        assert_eq!(client.qos_count(), 0);
        assert_eq!(client.volume_type_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_collected_and_do_not_stop_the_stack() {
        let client = FakeBlockStorage::new();
        let cancel = CancellationToken::new();
        let qos = client.create_qos("q", QosConsumer::BackEnd).await.unwrap();
        let vtype = client
            .create_volume_type(&CreateVolumeTypeRequest::new("t"))
            .await
            .unwrap();
        client.associate_qos(&qos.id, &vtype.id).await.unwrap();

        // 연결을 해제하지 않으므로 QoS 삭제는 400으로 실패합니다.
        let mut stack = CleanupStack::new();
        stack.push(CleanupAction::DeleteQos(qos.id.clone()));
        stack.push(CleanupAction::SafeDeleteVolume("vol-missing".to_owned()));

        let failures = stack.run(&client, &VolumeConfig::default(), &cancel).await;
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with(&format!("delete qos {}", qos.id)));
        assert_eq!(client.qos_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn volume_cleanup_waits_for_absence() {
        let client = FakeBlockStorage::new().with_delete_polls(2);
        let cancel = CancellationToken::new();
        let volume = client
            .create_volume(&CreateVolumeRequest::new("v", 1))
            .await
            .unwrap();
        client.show_volume(&volume.id).await.unwrap();
        client.show_volume(&volume.id).await.unwrap();

        let mut stack = CleanupStack::new();
        stack.push(CleanupAction::DeleteVolumeAndWait(volume.id.clone()));
        let failures = stack.run(&client, &VolumeConfig::default(), &cancel).await;

        assert!(failures.is_empty(), "{failures:?}");
        assert_eq!(client.volume_count(), 0);
    }
}
