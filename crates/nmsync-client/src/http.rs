//! HTTP client for the monitoring API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use nmsync_api::{
    ApiStatus, DeviceRef, DeviceResponse, Envelope, GroupMembersResponse, GroupsResponse, RemoteDevice,
    RemoteGroup, Reply,
};

use crate::error::{ClientError, Result};
use crate::traits::MonitoringApi;

/// Header carrying the API token
pub const AUTH_HEADER: &str = "X-Auth-Token";

/// Connection settings for [`HttpClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base endpoint, e.g. `https://nms.example.net/api/v0`
    pub endpoint: String,
    /// Pre-issued API token
    pub token: String,
    /// Verify TLS certificates (default: true)
    pub validate_certs: bool,
    /// Per-request timeout (default: 60s)
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create settings with default certificate validation and timeout
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            validate_certs: true,
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable certificate validation
    #[must_use]
    pub fn with_validate_certs(mut self, validate_certs: bool) -> Self {
        self.validate_certs = validate_certs;
        self
    }
}

/// HTTP client for the monitoring service
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client
    ///
    /// # Errors
    /// Returns an error if the endpoint is not a valid base URL or the
    /// underlying client cannot be built.
    ///
    /// # Example
    /// ```no_run
    /// use nmsync_client::{ClientConfig, HttpClient};
    ///
    /// let client = HttpClient::new(ClientConfig::new("https://nms.example.net/api/v0", "token"))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.validate_certs)
            .build()?;
        Self::with_client(config, client)
    }

    /// Create a new HTTP client with custom `reqwest::Client`
    ///
    /// The client's own timeout and TLS settings take precedence over `config`.
    ///
    /// # Errors
    /// Returns an error if the endpoint is not a valid base URL.
    pub fn with_client(config: ClientConfig, client: Client) -> Result<Self> {
        let base_url = Url::parse(&config.endpoint)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Url(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        Ok(Self {
            client,
            base_url,
            token: config.token,
        })
    }

    /// Build a full URL by appending percent-encoded path segments
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut full = self.base_url.clone();
        full.path_segments_mut()
            .map_err(|()| ClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(full)
    }

    /// Perform an authenticated GET of a path relative to the endpoint
    ///
    /// Each segment is percent-encoded on its own, so a group name
    /// containing `/` stays one segment.
    ///
    /// # Errors
    /// Returns an error on transport failure or an unclassifiable reply.
    /// Application-level errors are returned as [`Reply::Error`].
    #[instrument(skip(self))]
    pub async fn fetch(&self, segments: &[&str]) -> Result<Reply<Value>> {
        let url = self.url(segments)?;
        debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .header(AUTH_HEADER, self.token.as_str())
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        classify_response(status, &text)
    }

    async fn get_typed<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Reply<T>> {
        match self.fetch(segments).await? {
            Reply::Data(body) => Ok(Reply::Data(serde_json::from_value(body)?)),
            Reply::Empty => Ok(Reply::Empty),
            Reply::Error(message) => Ok(Reply::Error(message)),
        }
    }
}

/// Classify a decoded response body by its `status` field
///
/// # Errors
/// Returns an error if the body carries no `status` field.
pub fn classify(body: Value) -> Result<Reply<Value>> {
    let envelope = Envelope::deserialize(&body)?;
    Ok(envelope.classify().map(|()| body))
}

/// Classify a raw response by HTTP status and body
///
/// Non-success replies carrying an error envelope are classified like any
/// other body. Any other non-success reply becomes [`ClientError::Api`] with
/// the body's `message` field, or the raw body when there is none.
///
/// # Errors
/// Returns an error for a non-success reply without an error envelope, or a
/// success reply that is not a valid envelope.
pub fn classify_response(status: StatusCode, text: &str) -> Result<Reply<Value>> {
    if status.is_success() {
        return classify(serde_json::from_str(text)?);
    }

    let body = serde_json::from_str::<Value>(text).ok();
    if let Some(envelope) = body.as_ref().and_then(|b| Envelope::deserialize(b).ok())
        && envelope.status == ApiStatus::Error
    {
        return Ok(envelope.classify().map(|()| Value::Null));
    }

    let message = body
        .as_ref()
        .and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .map_or_else(|| text.to_string(), str::to_string);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl MonitoringApi for HttpClient {
    async fn list_groups(&self) -> Result<Vec<RemoteGroup>> {
        match self.get_typed::<GroupsResponse>(&["devicegroups"]).await? {
            Reply::Data(response) => Ok(response.groups),
            Reply::Empty => Ok(Vec::new()),
            Reply::Error(message) => Err(ClientError::Remote(message)),
        }
    }

    async fn group_members(&self, group: &str) -> Result<Vec<DeviceRef>> {
        match self
            .get_typed::<GroupMembersResponse>(&["devicegroups", group])
            .await?
        {
            Reply::Data(response) => Ok(response.devices),
            Reply::Empty => {
                debug!(group, "group has no devices");
                Ok(Vec::new())
            }
            Reply::Error(message) => Err(ClientError::Remote(message)),
        }
    }

    async fn device(&self, device_id: u64) -> Result<RemoteDevice> {
        let id = device_id.to_string();
        match self.get_typed::<DeviceResponse>(&["devices", &id]).await? {
            Reply::Data(response) => {
                let fields = response.devices.into_iter().next().ok_or_else(|| {
                    ClientError::InvalidResponse(format!("no record for device {device_id}"))
                })?;
                Ok(RemoteDevice::from_fields(fields)?)
            }
            Reply::Empty => Err(ClientError::InvalidResponse(format!(
                "no record for device {device_id}"
            ))),
            Reply::Error(message) => Err(ClientError::Remote(message)),
        }
    }
}
