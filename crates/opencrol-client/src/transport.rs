//! Transport seam and the pooled reqwest implementation

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::error::TransportError;

/// User agent sent on every request
pub const USER_AGENT: &str = "HomeAssistant-OpenCtrol/2.0";

/// Header carrying the shared secret
pub const PASSWORD_HEADER: &str = "x-password";

/// Idle connections kept per host
pub const POOL_MAX_IDLE_PER_HOST: usize = 10;

/// How long an idle pooled connection (and its resolved address) is reused
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default total request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP method used by the agent API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// A request against the agent, relative to the base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body,
        }
    }
}

/// A fully read response
///
/// Transports read the whole body before returning, so the underlying
/// connection is handed back to the pool on every exit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Response with a JSON body
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// Executes single requests against one agent
///
/// Implementations perform exactly one attempt per call; retrying is the
/// client's job.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and read the full response
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, TransportError>;

    /// Release pooled connections
    async fn close(&self) {}
}

/// Connection settings for [`ReqwestTransport`]
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Shared secret sent as `X-Password`
    pub password: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

/// Transport backed by one pooled `reqwest::Client`
///
/// The client is created on first use and dropped by [`Transport::close`];
/// the next request after a close creates a fresh pool.
pub struct ReqwestTransport {
    config: TransportConfig,
    session: Mutex<Option<reqwest::Client>>,
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Whether a pooled session currently exists
    pub fn has_session(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Get or create the pooled session
    fn session(&self) -> Result<reqwest::Client, TransportError> {
        let mut guard = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = self.build_client()?;
        debug!(base_url = %self.config.base_url, "Created HTTP session");
        *guard = Some(client.clone());
        Ok(client)
    }

    fn build_client(&self) -> Result<reqwest::Client, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(password) = &self.config.password {
            let mut value = HeaderValue::from_str(password)
                .map_err(|e| TransportError::Setup(format!("invalid password header: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(PASSWORD_HEADER), value);
        }

        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.request_timeout)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let client = self.session()?;
        let url = format!("{}{}", self.config.base_url, request.path);

        let mut builder = match request.method {
            Method::Get => client.get(&url),
            Method::Post => client.post(&url),
        };
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }

    async fn close(&self) {
        let previous = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if previous.is_some() {
            debug!(base_url = %self.config.base_url, "Closed HTTP session");
        }
    }
}
