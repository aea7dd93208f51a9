//! Block Storage v3 리소스 타입
//!
//! REST 응답 본문의 필요한 필드만 역직렬화합니다. 알 수 없는 필드는 무시됩니다.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use powerprobe_waiter::Observed;

/// 볼륨
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub status: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub volume_type: Option<String>,
    /// `host@backend#pool` 배치 문자열 (관리자 전용 필드)
    #[serde(rename = "os-vol-host-attr:host", alias = "host", default)]
    pub host: Option<String>,
    #[serde(default)]
    pub migration_status: Option<String>,
    #[serde(default)]
    pub replication_status: Option<String>,
}

impl Volume {
    /// 현재 배치 문자열. 노출되지 않으면 빈 문자열.
    pub fn host_str(&self) -> &str {
        self.host.as_deref().unwrap_or_default()
    }

    /// 소문자로 정규화된 마이그레이션 상태. 없으면 빈 문자열.
    pub fn migration_status_lower(&self) -> String {
        self.migration_status
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
    }
}

impl Observed for Volume {
    fn status(&self) -> &str {
        &self.status
    }
}

/// 볼륨 타입
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeType {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true", alias = "os-volume-type-access:is_public")]
    pub is_public: bool,
    #[serde(default)]
    pub extra_specs: BTreeMap<String, String>,
}

/// QoS 명세
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QosSpecs {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub consumer: Option<String>,
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
}

/// Cinder 서비스 (`os-services`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub binary: String,
    pub host: String,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// 스케줄러 풀 (`scheduler-stats/get_pools`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// `host@backend#pool`
    pub name: String,
    #[serde(default)]
    pub capabilities: PoolCapabilities,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolCapabilities {
    #[serde(default)]
    pub volume_backend_name: Option<String>,
}

/// QoS 소비자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QosConsumer {
    #[serde(rename = "back-end")]
    BackEnd,
    #[serde(rename = "front-end")]
    FrontEnd,
    #[serde(rename = "both")]
    Both,
}

impl QosConsumer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackEnd => "back-end",
            Self::FrontEnd => "front-end",
            Self::Both => "both",
        }
    }
}

/// 볼륨 생성 요청
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateVolumeRequest {
    pub name: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
}

impl CreateVolumeRequest {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            volume_type: None,
        }
    }

    pub fn with_volume_type(mut self, volume_type: impl Into<String>) -> Self {
        self.volume_type = Some(volume_type.into());
        self
    }
}

/// 볼륨 타입 생성 요청
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateVolumeTypeRequest {
    pub name: String,
    #[serde(rename = "os-volume-type-access:is_public")]
    pub is_public: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_specs: BTreeMap<String, String>,
}

impl CreateVolumeTypeRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_public: true,
            extra_specs: BTreeMap::new(),
        }
    }

    pub fn extra_spec(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_specs.insert(key.into(), value.into());
        self
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_deserializes_admin_host_attribute() {
        let json = r#"{
            "id": "vol-1",
            "name": "pf-volume",
            "status": "available",
            "size": 8,
            "volume_type": "pf-type",
            "os-vol-host-attr:host": "node1@powerstore#pool1",
            "migration_status": null,
            "replication_status": "enabled",
            "bootable": "false"
        }"#;
        let volume: Volume = serde_json::from_str(json).unwrap();
        assert_eq!(volume.host_str(), "node1@powerstore#pool1");
        assert_eq!(volume.size, 8);
        assert_eq!(volume.replication_status.as_deref(), Some("enabled"));
        assert_eq!(volume.migration_status_lower(), "");
        assert_eq!(Observed::status(&volume), "available");
    }

    #[test]
    fn volume_falls_back_to_plain_host_field() {
        let json = r#"{"id": "vol-1", "status": "creating", "host": "node2@ps#p"}"#;
        let volume: Volume = serde_json::from_str(json).unwrap();
        assert_eq!(volume.host_str(), "node2@ps#p");
        assert!(volume.name.is_none());
    }

    #[test]
    fn volume_type_defaults_to_public() {
        let json = r#"{"id": "t-1", "name": "gold"}"#;
        let vt: VolumeType = serde_json::from_str(json).unwrap();
        assert!(vt.is_public);
        assert!(vt.extra_specs.is_empty());
    }

    #[test]
    fn volume_type_request_serializes_access_flag() {
        let req = CreateVolumeTypeRequest::new("gold").extra_spec("volume_backend_name", "pf1");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["os-volume-type-access:is_public"], true);
        assert_eq!(json["extra_specs"]["volume_backend_name"], "pf1");
    }

    #[test]
    fn create_volume_request_omits_missing_type() {
        let json = serde_json::to_value(CreateVolumeRequest::new("v", 1)).unwrap();
        assert!(json.get("volume_type").is_none());
    }

    #[test]
    fn pool_capabilities_are_optional() {
        let json = r#"{"pools": [{"name": "a@ps#p1"}, {"name": "b@ps#p2", "capabilities": {"volume_backend_name": "powerstore", "total_capacity_gb": 100}}]}"#;
        #[derive(Deserialize)]
        struct Pools {
            pools: Vec<Pool>,
        }
        let pools: Pools = serde_json::from_str(json).unwrap();
        assert!(pools.pools[0].capabilities.volume_backend_name.is_none());
        assert_eq!(
            pools.pools[1].capabilities.volume_backend_name.as_deref(),
            Some("powerstore")
        );
    }

    #[test]
    fn qos_consumer_wire_names() {
        assert_eq!(
            serde_json::to_string(&QosConsumer::BackEnd).unwrap(),
            "\"back-end\""
        );
        assert_eq!(QosConsumer::Both.as_str(), "both");
    }
}
