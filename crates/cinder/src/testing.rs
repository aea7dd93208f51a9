//! 테스트용 인메모리 Block Storage
//!
//! [`FakeBlockStorage`]는 Cinder의 상태 전이를 단순화하여 재현합니다.
//! 볼륨은 조회될 때마다 예약된 전이를 하나씩 적용하므로, 대기 루프와
//! 시나리오를 실제 API 없이 검증할 수 있습니다.
//!
//! 단위 테스트에서는 항상 사용할 수 있고, 다른 크레이트의 테스트에서는
//! `test-util` feature로 활성화합니다.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::client::BlockStorageClient;
use crate::error::CinderError;
use crate::host::HostTarget;
use crate::types::{
    CreateVolumeRequest, CreateVolumeTypeRequest, Pool, PoolCapabilities, QosConsumer, QosSpecs,
    Service, Volume, VolumeType,
};

/// Cinder가 삭제를 허용하는 볼륨 상태
const DELETABLE: &[&str] = &[
    "available",
    "error",
    "error_restoring",
    "error_extending",
    "error_managing",
];

/// 조회 한 번에 적용되는 볼륨 전이
#[derive(Debug, Clone)]
enum Step {
    Stay,
    Status(String),
    MigrationStatus(String),
    Migrated(String),
    Gone,
}

#[derive(Debug)]
struct FakeVolume {
    volume: Volume,
    pending: VecDeque<Step>,
}

#[derive(Debug)]
struct FakeState {
    next_id: u64,
    volumes: BTreeMap<String, FakeVolume>,
    volume_types: BTreeMap<String, VolumeType>,
    qos: BTreeMap<String, QosSpecs>,
    associations: BTreeSet<(String, String)>,
    services: Vec<Service>,
    pools: Vec<Pool>,
    default_host: String,
    create_polls: usize,
    delete_polls: usize,
    migrate_polls: usize,
    create_status: String,
    create_migration_status: Option<String>,
    transient_failures: u32,
    type_in_use_rejections: u32,
    fail_migration: bool,
    fail_failover: bool,
    show_calls: u32,
    failover_calls: Vec<(String, Option<String>)>,
    migrate_calls: Vec<(String, String, bool)>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            next_id: 0,
            volumes: BTreeMap::new(),
            volume_types: BTreeMap::new(),
            qos: BTreeMap::new(),
            associations: BTreeSet::new(),
            services: Vec::new(),
            pools: Vec::new(),
            default_host: "node1@default#pool".to_owned(),
            create_polls: 1,
            delete_polls: 1,
            migrate_polls: 1,
            create_status: "available".to_owned(),
            create_migration_status: None,
            transient_failures: 0,
            type_in_use_rejections: 0,
            fail_migration: false,
            fail_failover: false,
            show_calls: 0,
            failover_calls: Vec::new(),
            migrate_calls: Vec::new(),
        }
    }
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }

    fn find_type(&self, name_or_id: &str) -> Option<&VolumeType> {
        self.volume_types
            .get(name_or_id)
            .or_else(|| self.volume_types.values().find(|t| t.name == name_or_id))
    }

    /// 볼륨 타입의 `volume_backend_name`에 맞는 풀을 고릅니다.
    fn place(&self, volume_type: Option<&VolumeType>) -> String {
        let backend = volume_type.and_then(|t| t.extra_specs.get("volume_backend_name"));
        let Some(backend) = backend else {
            return self.default_host.clone();
        };
        self.pools
            .iter()
            .find(|p| {
                p.capabilities.volume_backend_name.as_deref() == Some(backend.as_str())
                    || HostTarget::parse(&p.name).backend.as_deref() == Some(backend.as_str())
            })
            .map(|p| p.name.clone())
            .unwrap_or_else(|| self.default_host.clone())
    }

    fn type_in_use(&self, volume_type: &VolumeType) -> bool {
        self.volumes.values().any(|v| {
            matches!(v.volume.volume_type.as_deref(), Some(t) if t == volume_type.name || t == volume_type.id)
        })
    }
}

/// 인메모리 Block Storage 구현
#[derive(Debug, Default)]
pub struct FakeBlockStorage {
    state: Mutex<FakeState>,
}

impl FakeBlockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn configure(self, f: impl FnOnce(&mut FakeState)) -> Self {
        f(&mut self.state());
        self
    }

    // --- 설정 ---

    pub fn with_services(self, services: Vec<Service>) -> Self {
        self.configure(|s| s.services = services)
    }

    pub fn with_pools(self, pools: Vec<Pool>) -> Self {
        self.configure(|s| s.pools = pools)
    }

    /// 볼륨 타입으로 배치를 정할 수 없을 때 사용하는 호스트
    pub fn with_default_host(self, host: &str) -> Self {
        let host = host.to_owned();
        self.configure(|s| s.default_host = host)
    }

    /// 새 볼륨이 `creating`으로 보고되는 조회 횟수
    pub fn with_create_polls(self, polls: usize) -> Self {
        self.configure(|s| s.create_polls = polls)
    }

    /// 삭제 요청 후 `deleting`으로 보고되는 조회 횟수
    pub fn with_delete_polls(self, polls: usize) -> Self {
        self.configure(|s| s.delete_polls = polls)
    }

    /// 마이그레이션 요청 후 `migrating`으로 보고되는 조회 횟수
    pub fn with_migrate_polls(self, polls: usize) -> Self {
        self.configure(|s| s.migrate_polls = polls)
    }

    /// 새 볼륨이 최종적으로 도달하는 상태 (기본 `available`)
    pub fn with_create_status(self, status: &str) -> Self {
        let status = status.to_owned();
        self.configure(|s| s.create_status = status)
    }

    /// 새 볼륨이 처음부터 보고하는 `migration_status`
    pub fn with_create_migration_status(self, status: &str) -> Self {
        let status = status.to_owned();
        self.configure(|s| s.create_migration_status = Some(status))
    }

    /// 다음 `n`번의 `show_volume`이 HTTP 503으로 실패
    pub fn with_transient_failures(self, n: u32) -> Self {
        self.configure(|s| s.transient_failures = n)
    }

    /// 다음 `n`번의 `delete_volume_type`이 사용 중(400)으로 거부됨
    pub fn with_type_in_use_rejections(self, n: u32) -> Self {
        self.configure(|s| s.type_in_use_rejections = n)
    }

    pub fn with_failing_migration(self) -> Self {
        self.configure(|s| s.fail_migration = true)
    }

    pub fn with_failing_failover(self) -> Self {
        self.configure(|s| s.fail_failover = true)
    }

    /// 임의 상태의 볼륨을 직접 등록합니다.
    pub fn insert_volume(&self, volume: Volume) {
        self.state().volumes.insert(
            volume.id.clone(),
            FakeVolume {
                volume,
                pending: VecDeque::new(),
            },
        );
    }

    // --- 검사 ---

    pub fn volume_count(&self) -> usize {
        self.state().volumes.len()
    }

    pub fn volume_type_count(&self) -> usize {
        self.state().volume_types.len()
    }

    pub fn qos_count(&self) -> usize {
        self.state().qos.len()
    }

    pub fn is_associated(&self, qos_id: &str, type_id: &str) -> bool {
        self.state()
            .associations
            .contains(&(qos_id.to_owned(), type_id.to_owned()))
    }

    pub fn show_calls(&self) -> u32 {
        self.state().show_calls
    }

    pub fn failover_calls(&self) -> Vec<(String, Option<String>)> {
        self.state().failover_calls.clone()
    }

    pub fn migrate_calls(&self) -> Vec<(String, String, bool)> {
        self.state().migrate_calls.clone()
    }

    /// 전이를 적용하지 않고 현재 볼륨을 반환합니다.
    pub fn peek_volume(&self, id: &str) -> Option<Volume> {
        self.state().volumes.get(id).map(|v| v.volume.clone())
    }

    // --- 동작 ---

    fn show_volume_sync(&self, id: &str) -> Result<Volume, CinderError> {
        let mut state = self.state();
        state.show_calls += 1;
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(CinderError::Api {
                status: 503,
                message: "service unavailable".to_owned(),
            });
        }

        let not_found = || CinderError::NotFound(format!("volume {id} could not be found"));
        let entry = state.volumes.get_mut(id).ok_or_else(not_found)?;
        match entry.pending.pop_front() {
            None | Some(Step::Stay) => {}
            Some(Step::Status(status)) => entry.volume.status = status,
            Some(Step::MigrationStatus(status)) => entry.volume.migration_status = Some(status),
            Some(Step::Migrated(host)) => {
                entry.volume.host = Some(host);
                entry.volume.migration_status = Some("success".to_owned());
            }
            Some(Step::Gone) => {
                state.volumes.remove(id);
                return Err(not_found());
            }
        }
        Ok(entry.volume.clone())
    }

    fn create_volume_sync(&self, request: &CreateVolumeRequest) -> Result<Volume, CinderError> {
        let mut state = self.state();
        let volume_type = match &request.volume_type {
            Some(name) => Some(state.find_type(name).cloned().ok_or_else(|| {
                CinderError::NotFound(format!("volume type {name} could not be found"))
            })?),
            None => None,
        };
        let id = state.next_id("vol");
        let host = state.place(volume_type.as_ref());
        let volume = Volume {
            id: id.clone(),
            name: Some(request.name.clone()),
            status: "creating".to_owned(),
            size: request.size,
            volume_type: volume_type.map(|t| t.name),
            host: Some(host),
            migration_status: state.create_migration_status.clone(),
            replication_status: Some("disabled".to_owned()),
        };
        let mut pending: VecDeque<Step> = std::iter::repeat_n(Step::Stay, state.create_polls)
            .collect();
        pending.push_back(Step::Status(state.create_status.clone()));
        state.volumes.insert(
            id,
            FakeVolume {
                volume: volume.clone(),
                pending,
            },
        );
        Ok(volume)
    }

    fn delete_volume_sync(&self, id: &str) -> Result<(), CinderError> {
        let mut state = self.state();
        let delete_polls = state.delete_polls;
        let entry = state
            .volumes
            .get_mut(id)
            .ok_or_else(|| CinderError::NotFound(format!("volume {id} could not be found")))?;
        if !DELETABLE.contains(&entry.volume.status.as_str()) {
            return Err(CinderError::BadRequest(format!(
                "invalid volume: volume status must be available or error, but current status is: {}",
                entry.volume.status
            )));
        }
        entry.volume.status = "deleting".to_owned();
        entry.pending = std::iter::repeat_n(Step::Stay, delete_polls).collect();
        entry.pending.push_back(Step::Gone);
        Ok(())
    }

    fn create_volume_type_sync(
        &self,
        request: &CreateVolumeTypeRequest,
    ) -> Result<VolumeType, CinderError> {
        let mut state = self.state();
        if state.volume_types.values().any(|t| t.name == request.name) {
            return Err(CinderError::Api {
                status: 409,
                message: format!("volume type {} already exists", request.name),
            });
        }
        let id = state.next_id("type");
        let volume_type = VolumeType {
            id: id.clone(),
            name: request.name.clone(),
            is_public: request.is_public,
            extra_specs: request.extra_specs.clone(),
        };
        state.volume_types.insert(id, volume_type.clone());
        Ok(volume_type)
    }

    fn delete_volume_type_sync(&self, id: &str) -> Result<(), CinderError> {
        let mut state = self.state();
        let volume_type = state
            .volume_types
            .get(id)
            .cloned()
            .ok_or_else(|| CinderError::NotFound(format!("volume type {id} could not be found")))?;
        if state.type_in_use(&volume_type) {
            return Err(CinderError::BadRequest(format!(
                "target volume type {id} is still in use"
            )));
        }
        if state.type_in_use_rejections > 0 {
            state.type_in_use_rejections -= 1;
            return Err(CinderError::BadRequest(format!(
                "target volume type {id} is still in use"
            )));
        }
        state.volume_types.remove(id);
        state.associations.retain(|(_, type_id)| type_id != id);
        Ok(())
    }

    fn create_qos_sync(&self, name: &str, consumer: QosConsumer) -> Result<QosSpecs, CinderError> {
        let mut state = self.state();
        let id = state.next_id("qos");
        let qos = QosSpecs {
            id: id.clone(),
            name: name.to_owned(),
            consumer: Some(consumer.as_str().to_owned()),
            specs: BTreeMap::new(),
        };
        state.qos.insert(id, qos.clone());
        Ok(qos)
    }

    fn set_qos_keys_sync(
        &self,
        qos_id: &str,
        keys: &BTreeMap<String, String>,
    ) -> Result<(), CinderError> {
        let mut state = self.state();
        let qos = state
            .qos
            .get_mut(qos_id)
            .ok_or_else(|| CinderError::NotFound(format!("qos spec {qos_id} could not be found")))?;
        qos.specs
            .extend(keys.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn set_association(&self, qos_id: &str, type_id: &str, associate: bool) -> Result<(), CinderError> {
        let mut state = self.state();
        if !state.qos.contains_key(qos_id) {
            return Err(CinderError::NotFound(format!(
                "qos spec {qos_id} could not be found"
            )));
        }
        if !state.volume_types.contains_key(type_id) {
            return Err(CinderError::NotFound(format!(
                "volume type {type_id} could not be found"
            )));
        }
        let key = (qos_id.to_owned(), type_id.to_owned());
        if associate {
            state.associations.insert(key);
        } else {
            state.associations.remove(&key);
        }
        Ok(())
    }

    fn delete_qos_sync(&self, qos_id: &str) -> Result<(), CinderError> {
        let mut state = self.state();
        if !state.qos.contains_key(qos_id) {
            return Err(CinderError::NotFound(format!(
                "qos spec {qos_id} could not be found"
            )));
        }
        if state.associations.iter().any(|(q, _)| q == qos_id) {
            return Err(CinderError::BadRequest(format!(
                "qos spec {qos_id} is still associated with a volume type"
            )));
        }
        state.qos.remove(qos_id);
        Ok(())
    }

    fn failover_host_sync(&self, host: &str, backend_id: Option<&str>) -> Result<(), CinderError> {
        let mut state = self.state();
        state
            .failover_calls
            .push((host.to_owned(), backend_id.map(str::to_owned)));
        if state.fail_failover {
            return Err(CinderError::Api {
                status: 500,
                message: "failover failed".to_owned(),
            });
        }
        if !state.services.iter().any(|s| s.host == host) {
            return Err(CinderError::NotFound(format!("host {host} could not be found")));
        }
        for entry in state.volumes.values_mut() {
            if entry.volume.host_str().starts_with(host) {
                entry.volume.replication_status = Some("failed-over".to_owned());
            }
        }
        Ok(())
    }

    fn migrate_volume_sync(
        &self,
        id: &str,
        host: &str,
        force_host_copy: bool,
    ) -> Result<(), CinderError> {
        let mut state = self.state();
        state
            .migrate_calls
            .push((id.to_owned(), host.to_owned(), force_host_copy));
        let known_host = state.pools.iter().any(|p| p.name == host);
        let (migrate_polls, fail) = (state.migrate_polls, state.fail_migration);
        let entry = state
            .volumes
            .get_mut(id)
            .ok_or_else(|| CinderError::NotFound(format!("volume {id} could not be found")))?;
        if !matches!(entry.volume.status.as_str(), "available" | "in-use") {
            return Err(CinderError::BadRequest(format!(
                "volume {id} status must be available or in-use"
            )));
        }
        if !known_host {
            return Err(CinderError::BadRequest(format!("no valid host {host}")));
        }
        entry.volume.migration_status = Some("starting".to_owned());
        entry.pending =
            std::iter::repeat_n(Step::MigrationStatus("migrating".to_owned()), migrate_polls)
                .collect();
        entry.pending.push_back(if fail {
            Step::MigrationStatus("error".to_owned())
        } else {
            Step::Migrated(host.to_owned())
        });
        Ok(())
    }
}

impl BlockStorageClient for FakeBlockStorage {
    async fn show_volume(&self, id: &str) -> Result<Volume, CinderError> {
        self.show_volume_sync(id)
    }

    async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume, CinderError> {
        self.create_volume_sync(request)
    }

    async fn delete_volume(&self, id: &str) -> Result<(), CinderError> {
        self.delete_volume_sync(id)
    }

    async fn create_volume_type(
        &self,
        request: &CreateVolumeTypeRequest,
    ) -> Result<VolumeType, CinderError> {
        self.create_volume_type_sync(request)
    }

    async fn delete_volume_type(&self, id: &str) -> Result<(), CinderError> {
        self.delete_volume_type_sync(id)
    }

    async fn create_qos(&self, name: &str, consumer: QosConsumer) -> Result<QosSpecs, CinderError> {
        self.create_qos_sync(name, consumer)
    }

    async fn set_qos_keys(
        &self,
        qos_id: &str,
        keys: &BTreeMap<String, String>,
    ) -> Result<(), CinderError> {
        self.set_qos_keys_sync(qos_id, keys)
    }

    async fn associate_qos(&self, qos_id: &str, type_id: &str) -> Result<(), CinderError> {
        self.set_association(qos_id, type_id, true)
    }

    async fn disassociate_qos(&self, qos_id: &str, type_id: &str) -> Result<(), CinderError> {
        self.set_association(qos_id, type_id, false)
    }

    async fn delete_qos(&self, qos_id: &str) -> Result<(), CinderError> {
        self.delete_qos_sync(qos_id)
    }

    async fn list_services(&self) -> Result<Vec<Service>, CinderError> {
        Ok(self.state().services.clone())
    }

    async fn list_pools(&self) -> Result<Vec<Pool>, CinderError> {
        Ok(self.state().pools.clone())
    }

    async fn failover_host(&self, host: &str, backend_id: Option<&str>) -> Result<(), CinderError> {
        self.failover_host_sync(host, backend_id)
    }

    async fn migrate_volume(
        &self,
        id: &str,
        host: &str,
        force_host_copy: bool,
    ) -> Result<(), CinderError> {
        self.migrate_volume_sync(id, host, force_host_copy)
    }
}

/// 테스트용 서비스 항목
pub fn service(binary: &str, host: &str) -> Service {
    Service {
        binary: binary.to_owned(),
        host: host.to_owned(),
        zone: Some("nova".to_owned()),
        status: Some("enabled".to_owned()),
        state: Some("up".to_owned()),
    }
}

/// 테스트용 풀 항목
pub fn pool(name: &str, volume_backend_name: Option<&str>) -> Pool {
    Pool {
        name: name.to_owned(),
        capabilities: PoolCapabilities {
            volume_backend_name: volume_backend_name.map(str::to_owned),
        },
    }
}
