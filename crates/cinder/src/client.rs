//! Block Storage REST API abstraction for testability.
//!
//! The [`BlockStorageClient`] trait abstracts the Cinder v3 REST API, allowing
//! production code to use [`ReqwestBlockStorageClient`] while tests use the
//! in-memory `FakeBlockStorage` from the `testing` module.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │ scenarios / waits  │
//! └─────────┬──────────┘
//!           │
//!           ▼
//!  ┌────────────────────┐
//!  │ BlockStorageClient │ (trait)
//!  └────────────────────┘
//!        │         │
//!        ▼         ▼
//!   ┌─────────┐ ┌──────┐
//!   │ Reqwest │ │ Fake │
//!   └────┬────┘ └──────┘
//!        │
//!        ▼
//!   cinder-api (v3)
//! ```
//!
//! # Path Segment Validation
//!
//! Every identifier that ends up in a URL path is validated first:
//! empty values and values containing control characters or `/` are rejected
//! with [`CinderError::InvalidRequest`] and no request is sent.

use std::collections::BTreeMap;
use std::future::Future;

use metrics::counter;
use reqwest::{Method, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use powerprobe_core::config::CloudConfig;
use powerprobe_core::metrics::{CINDER_REQUESTS_TOTAL, LABEL_OPERATION, LABEL_RESULT};

use crate::error::CinderError;
use crate::types::{
    CreateVolumeRequest, CreateVolumeTypeRequest, Pool, QosConsumer, QosSpecs, Service, Volume,
    VolumeType,
};

/// Validates an identifier before it is placed in a URL path.
pub(crate) fn validate_path_segment(kind: &str, value: &str) -> Result<(), CinderError> {
    if value.is_empty() {
        return Err(CinderError::InvalidRequest(format!("{kind} must not be empty")));
    }
    if value.len() > 255 {
        return Err(CinderError::InvalidRequest(format!(
            "{kind} too long: length {} (max 255)",
            value.len()
        )));
    }
    if value.chars().any(|c| c.is_control() || c == '/') {
        return Err(CinderError::InvalidRequest(format!(
            "{kind} contains invalid characters"
        )));
    }
    Ok(())
}

/// Trait abstracting Block Storage v3 operations.
///
/// All REST calls go through this trait, enabling testability via fakes.
/// The trait is `Send + Sync + 'static`, allowing safe sharing across async contexts.
///
/// # Error Handling
///
/// - **404**: [`CinderError::NotFound`]
/// - **400**: [`CinderError::BadRequest`] (for example a volume type still in use)
/// - **other non-2xx**: [`CinderError::Api`]
/// - **connection / timeout**: [`CinderError::Transport`]
pub trait BlockStorageClient: Send + Sync + 'static {
    /// `GET volumes/{id}`
    fn show_volume(&self, id: &str) -> impl Future<Output = Result<Volume, CinderError>> + Send;

    /// `POST volumes`
    fn create_volume(
        &self,
        request: &CreateVolumeRequest,
    ) -> impl Future<Output = Result<Volume, CinderError>> + Send;

    /// `DELETE volumes/{id}`
    fn delete_volume(&self, id: &str) -> impl Future<Output = Result<(), CinderError>> + Send;

    /// `POST types`
    fn create_volume_type(
        &self,
        request: &CreateVolumeTypeRequest,
    ) -> impl Future<Output = Result<VolumeType, CinderError>> + Send;

    /// `DELETE types/{id}`. Returns `BadRequest` while volumes still use the type.
    fn delete_volume_type(&self, id: &str)
    -> impl Future<Output = Result<(), CinderError>> + Send;

    /// `POST qos-specs`
    fn create_qos(
        &self,
        name: &str,
        consumer: QosConsumer,
    ) -> impl Future<Output = Result<QosSpecs, CinderError>> + Send;

    /// `PUT qos-specs/{id}`
    fn set_qos_keys(
        &self,
        qos_id: &str,
        keys: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<(), CinderError>> + Send;

    /// `GET qos-specs/{id}/associate?vol_type_id=...`
    fn associate_qos(
        &self,
        qos_id: &str,
        type_id: &str,
    ) -> impl Future<Output = Result<(), CinderError>> + Send;

    /// `GET qos-specs/{id}/disassociate?vol_type_id=...`
    fn disassociate_qos(
        &self,
        qos_id: &str,
        type_id: &str,
    ) -> impl Future<Output = Result<(), CinderError>> + Send;

    /// `DELETE qos-specs/{id}`
    fn delete_qos(&self, qos_id: &str) -> impl Future<Output = Result<(), CinderError>> + Send;

    /// `GET os-services` (admin)
    fn list_services(&self) -> impl Future<Output = Result<Vec<Service>, CinderError>> + Send;

    /// `GET scheduler-stats/get_pools?detail=True` (admin)
    fn list_pools(&self) -> impl Future<Output = Result<Vec<Pool>, CinderError>> + Send;

    /// `POST os-volume-hosts/{host}/action` with `failover_host` (admin)
    fn failover_host(
        &self,
        host: &str,
        backend_id: Option<&str>,
    ) -> impl Future<Output = Result<(), CinderError>> + Send;

    /// `POST volumes/{id}/action` with `os-migrate_volume` (admin)
    fn migrate_volume(
        &self,
        id: &str,
        host: &str,
        force_host_copy: bool,
    ) -> impl Future<Output = Result<(), CinderError>> + Send;
}

#[derive(Deserialize)]
struct VolumeBody {
    volume: Volume,
}

#[derive(Deserialize)]
struct VolumeTypeBody {
    volume_type: VolumeType,
}

#[derive(Deserialize)]
struct QosSpecsBody {
    qos_specs: QosSpecs,
}

#[derive(Deserialize)]
struct ServicesBody {
    services: Vec<Service>,
}

#[derive(Deserialize)]
struct PoolsBody {
    pools: Vec<Pool>,
}

/// Production Block Storage client using `reqwest`.
///
/// Every request carries `X-Auth-Token` (when configured) and, when an API
/// microversion is configured, `OpenStack-API-Version: volume <mv>`.
#[derive(Debug, Clone)]
pub struct ReqwestBlockStorageClient {
    http: reqwest::Client,
    endpoint: Url,
    auth_token: String,
    api_microversion: Option<String>,
}

impl ReqwestBlockStorageClient {
    /// Builds a client from the `[cloud]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `CinderError::InvalidRequest` if the endpoint is not a valid
    /// base URL, or `CinderError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &CloudConfig) -> Result<Self, CinderError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            CinderError::InvalidRequest(format!("invalid endpoint '{}': {e}", config.endpoint))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(CinderError::InvalidRequest(format!(
                "endpoint '{}' cannot be used as a base url",
                config.endpoint
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CinderError::Transport(format!("failed to build http client: {e}")))?;

        let api_microversion = Some(config.api_microversion.trim())
            .filter(|mv| !mv.is_empty())
            .map(str::to_owned);

        Ok(Self {
            http,
            endpoint,
            auth_token: config.auth_token.clone(),
            api_microversion,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Joins path segments onto the endpoint, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, CinderError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| CinderError::InvalidRequest("endpoint cannot be a base".to_owned()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        if !self.auth_token.is_empty() {
            builder = builder.header("X-Auth-Token", &self.auth_token);
        }
        if let Some(mv) = &self.api_microversion {
            builder = builder.header("OpenStack-API-Version", format!("volume {mv}"));
        }
        builder
    }

    /// Sends a request and returns the raw body of a 2xx response.
    async fn send(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<String, CinderError> {
        let result = self.send_inner(builder).await;
        let label = match &result {
            Ok(_) => "ok",
            Err(CinderError::NotFound(_)) => "not_found",
            Err(CinderError::BadRequest(_)) => "bad_request",
            Err(CinderError::Transport(_)) => "transport",
            Err(_) => "error",
        };
        counter!(CINDER_REQUESTS_TOTAL, LABEL_OPERATION => operation, LABEL_RESULT => label)
            .increment(1);

        match &result {
            Ok(_) => debug!(operation = operation, "block storage request succeeded"),
            Err(CinderError::NotFound(_)) => {
                debug!(operation = operation, "block storage resource not found");
            }
            Err(e) => warn!(operation = operation, error = %e, "block storage request failed"),
        }
        result
    }

    async fn send_inner(&self, builder: RequestBuilder) -> Result<String, CinderError> {
        let response = builder.send().await.map_err(|e| {
            CinderError::Transport(if e.is_timeout() {
                format!("request timed out: {e}")
            } else {
                format!("request failed: {e}")
            })
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CinderError::Transport(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(CinderError::from_status(status.as_u16(), body));
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<T, CinderError> {
        let body = self.send(operation, builder).await?;
        serde_json::from_str(&body)
            .map_err(|e| CinderError::Decode(format!("{operation}: {e}")))
    }
}

impl BlockStorageClient for ReqwestBlockStorageClient {
    async fn show_volume(&self, id: &str) -> Result<Volume, CinderError> {
        validate_path_segment("volume id", id)?;
        let url = self.url(&["volumes", id])?;
        let body: VolumeBody = self
            .send_json("show_volume", self.request(Method::GET, url))
            .await?;
        Ok(body.volume)
    }

    async fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume, CinderError> {
        let url = self.url(&["volumes"])?;
        let builder = self
            .request(Method::POST, url)
            .json(&json!({ "volume": request }));
        let body: VolumeBody = self.send_json("create_volume", builder).await?;
        Ok(body.volume)
    }

    async fn delete_volume(&self, id: &str) -> Result<(), CinderError> {
        validate_path_segment("volume id", id)?;
        let url = self.url(&["volumes", id])?;
        self.send("delete_volume", self.request(Method::DELETE, url))
            .await?;
        Ok(())
    }

    async fn create_volume_type(
        &self,
        request: &CreateVolumeTypeRequest,
    ) -> Result<VolumeType, CinderError> {
        let url = self.url(&["types"])?;
        let builder = self
            .request(Method::POST, url)
            .json(&json!({ "volume_type": request }));
        let body: VolumeTypeBody = self.send_json("create_volume_type", builder).await?;
        Ok(body.volume_type)
    }

    async fn delete_volume_type(&self, id: &str) -> Result<(), CinderError> {
        validate_path_segment("volume type id", id)?;
        let url = self.url(&["types", id])?;
        self.send("delete_volume_type", self.request(Method::DELETE, url))
            .await?;
        Ok(())
    }

    async fn create_qos(&self, name: &str, consumer: QosConsumer) -> Result<QosSpecs, CinderError> {
        let url = self.url(&["qos-specs"])?;
        let builder = self.request(Method::POST, url).json(&json!({
            "qos_specs": { "name": name, "consumer": consumer.as_str() }
        }));
        let body: QosSpecsBody = self.send_json("create_qos", builder).await?;
        Ok(body.qos_specs)
    }

    async fn set_qos_keys(
        &self,
        qos_id: &str,
        keys: &BTreeMap<String, String>,
    ) -> Result<(), CinderError> {
        validate_path_segment("qos id", qos_id)?;
        let url = self.url(&["qos-specs", qos_id])?;
        let builder = self
            .request(Method::PUT, url)
            .json(&json!({ "qos_specs": keys }));
        self.send("set_qos_keys", builder).await?;
        Ok(())
    }

    async fn associate_qos(&self, qos_id: &str, type_id: &str) -> Result<(), CinderError> {
        validate_path_segment("qos id", qos_id)?;
        validate_path_segment("volume type id", type_id)?;
        let mut url = self.url(&["qos-specs", qos_id, "associate"])?;
        url.query_pairs_mut().append_pair("vol_type_id", type_id);
        self.send("associate_qos", self.request(Method::GET, url))
            .await?;
        Ok(())
    }

    async fn disassociate_qos(&self, qos_id: &str, type_id: &str) -> Result<(), CinderError> {
        validate_path_segment("qos id", qos_id)?;
        validate_path_segment("volume type id", type_id)?;
        let mut url = self.url(&["qos-specs", qos_id, "disassociate"])?;
        url.query_pairs_mut().append_pair("vol_type_id", type_id);
        self.send("disassociate_qos", self.request(Method::GET, url))
            .await?;
        Ok(())
    }

    async fn delete_qos(&self, qos_id: &str) -> Result<(), CinderError> {
        validate_path_segment("qos id", qos_id)?;
        let url = self.url(&["qos-specs", qos_id])?;
        self.send("delete_qos", self.request(Method::DELETE, url))
            .await?;
        Ok(())
    }

    async fn list_services(&self) -> Result<Vec<Service>, CinderError> {
        let url = self.url(&["os-services"])?;
        let body: ServicesBody = self
            .send_json("list_services", self.request(Method::GET, url))
            .await?;
        Ok(body.services)
    }

    async fn list_pools(&self) -> Result<Vec<Pool>, CinderError> {
        let mut url = self.url(&["scheduler-stats", "get_pools"])?;
        url.query_pairs_mut().append_pair("detail", "True");
        let body: PoolsBody = self
            .send_json("list_pools", self.request(Method::GET, url))
            .await?;
        Ok(body.pools)
    }

    async fn failover_host(&self, host: &str, backend_id: Option<&str>) -> Result<(), CinderError> {
        validate_path_segment("host", host)?;
        let url = self.url(&["os-volume-hosts", host, "action"])?;
        let builder = self.request(Method::POST, url).json(&json!({
            "failover_host": { "backend_id": backend_id }
        }));
        self.send("failover_host", builder).await?;
        Ok(())
    }

    async fn migrate_volume(
        &self,
        id: &str,
        host: &str,
        force_host_copy: bool,
    ) -> Result<(), CinderError> {
        validate_path_segment("volume id", id)?;
        if host.is_empty() {
            return Err(CinderError::InvalidRequest(
                "destination host must not be empty".to_owned(),
            ));
        }
        let url = self.url(&["volumes", id, "action"])?;
        let builder = self.request(Method::POST, url).json(&json!({
            "os-migrate_volume": { "host": host, "force_host_copy": force_host_copy }
        }));
        self.send("migrate_volume", builder).await?;
        Ok(())
    }
}
