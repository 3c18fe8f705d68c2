//! HTTP client for the OpenCtrol agent
//!
//! [`HttpClient`] owns one transport to one agent and exposes a typed method
//! per remote operation. Read operations propagate [`ClientError`]; command
//! operations log the failure and return `false` so a failed command never
//! crashes the caller.

use opencrol_core::{endpoints, AudioApp, AudioDevice, MouseButton};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::{ClientError, ClientResult};
use crate::responses::{MonitorsResponse, StatusResponse};
use crate::retry::RetryPolicy;
use crate::transport::{
    ApiRequest, Method, RawResponse, ReqwestTransport, Transport, TransportConfig,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT,
};

/// Everything needed to talk to one agent
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Shared secret; `None` when the agent is unprotected
    pub password: Option<String>,
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ClientSettings {
    /// Settings with default retry and timeouts
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            password: None,
            retry: RetryPolicy::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the shared secret; an empty string means no secret
    pub fn with_password(mut self, password: Option<impl Into<String>>) -> Self {
        self.password = password.map(Into::into).filter(|p: &String| !p.is_empty());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, total: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = total;
        self
    }

    pub(crate) fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            base_url: self.base_url.clone(),
            password: self.password.clone(),
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
        }
    }
}

/// Client for one OpenCtrol agent
pub struct HttpClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Create a client backed by a pooled reqwest transport
    pub fn new(settings: ClientSettings) -> Self {
        let transport = Arc::new(ReqwestTransport::new(settings.transport_config()));
        Self {
            base_url: settings.base_url,
            transport,
            retry: settings.retry,
        }
    }

    /// Create a client over an arbitrary transport
    pub fn with_transport(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport,
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// MJPEG stream of the selected monitor
    pub fn stream_url(&self) -> String {
        format!("{}{}", self.base_url, endpoints::SCREEN_STREAM)
    }

    /// Single JPEG frame of the selected monitor
    pub fn frame_url(&self) -> String {
        format!("{}{}", self.base_url, endpoints::SCREEN_FRAME)
    }

    /// Close pooled connections; in-flight requests fail on their own
    pub async fn close(&self) {
        self.transport.close().await;
    }

    /// Execute a request, retrying transport failures and 5xx responses
    ///
    /// Responses below 500 are returned on the first attempt. After the last
    /// attempt the final 5xx response or transport error is returned as-is.
    pub async fn execute(&self, request: &ApiRequest) -> ClientResult<RawResponse> {
        let attempts = self.retry.attempts();
        let mut attempt = 0;

        loop {
            debug!(
                method = %request.method,
                path = %request.path,
                attempt = attempt + 1,
                "Sending request"
            );

            let is_last = attempt + 1 >= attempts;
            let failure = match self.transport.execute(request).await {
                Ok(response) if !response.is_server_error() || is_last => return Ok(response),
                Ok(response) => format!("HTTP {}", response.status),
                Err(err) if is_last => {
                    error!(
                        path = %request.path,
                        "Request failed after {} attempts: {}", attempts, err
                    );
                    return Err(err.into());
                }
                Err(err) => err.to_string(),
            };

            let delay = self.retry.delay_for(attempt);
            warn!(
                path = %request.path,
                "Request failed (attempt {}/{}): {}. Retrying in {:.1}s...",
                attempt + 1,
                attempts,
                failure,
                delay.as_secs_f64()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Execute a request and parse the JSON body of a 2xx response
    ///
    /// An empty 2xx body parses as `null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ClientResult<Value> {
        let request = ApiRequest {
            method,
            path: path.to_string(),
            body,
        };
        let response = self.execute(&request).await?;

        if response.is_server_error() {
            return Err(ClientError::RemoteServer {
                status: response.status,
            });
        }
        if !response.is_success() {
            return Err(ClientError::RemoteClient {
                status: response.status,
            });
        }

        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&response.body).map_err(|e| ClientError::MalformedResponse {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, operation: &str) -> ClientResult<T> {
        let result = self
            .request(Method::Get, path, None)
            .await
            .and_then(|value| {
                serde_json::from_value(value).map_err(|e| ClientError::MalformedResponse {
                    path: path.to_string(),
                    reason: e.to_string(),
                })
            });

        if let Err(err) = &result {
            error!("Error {}: {}", operation, err);
        }
        result
    }

    /// POST and read the boolean `success` field
    async fn post_for_success(&self, path: &str, body: Option<Value>) -> ClientResult<bool> {
        match self.request(Method::Post, path, body).await? {
            Value::Object(map) => Ok(map.get("success").and_then(Value::as_bool).unwrap_or(false)),
            other => Err(ClientError::MalformedResponse {
                path: path.to_string(),
                reason: format!("expected an object, got {}", other),
            }),
        }
    }

    /// Best-effort command: every failure becomes `false`
    async fn command(&self, operation: &str, path: &str, body: Option<Value>) -> bool {
        match self.post_for_success(path, body).await {
            Ok(success) => {
                debug!(path = %path, success, "Command {} completed", operation);
                success
            }
            Err(err) => {
                error!("Error {}: {}", operation, err);
                false
            }
        }
    }

    // ==================== Reads ====================

    /// Agent health; served without authentication
    pub async fn health(&self) -> ClientResult<Value> {
        self.get(endpoints::HEALTH, "checking health").await
    }

    pub async fn get_status(&self) -> ClientResult<StatusResponse> {
        self.get(endpoints::STATUS, "getting status").await
    }

    pub async fn get_monitors(&self) -> ClientResult<MonitorsResponse> {
        self.get(endpoints::MONITORS, "getting monitors").await
    }

    pub async fn get_audio_apps(&self) -> ClientResult<Vec<AudioApp>> {
        self.get(endpoints::AUDIO_APPS, "getting audio apps").await
    }

    pub async fn get_audio_devices(&self) -> ClientResult<Vec<AudioDevice>> {
        self.get(endpoints::AUDIO_DEVICES, "getting audio devices")
            .await
    }

    // ==================== Mouse ====================

    pub async fn move_mouse(&self, x: i32, y: i32, relative: bool) -> bool {
        let mut body = json!({"x": x, "y": y});
        if relative {
            body["relative"] = json!(true);
        }
        self.command("moving mouse", endpoints::MOUSE_MOVE, Some(body))
            .await
    }

    pub async fn click(&self, button: MouseButton, x: Option<i32>, y: Option<i32>) -> bool {
        let mut body = json!({"button": button.as_str()});
        if let Some(x) = x {
            body["x"] = json!(x);
        }
        if let Some(y) = y {
            body["y"] = json!(y);
        }
        self.command("clicking", endpoints::MOUSE_CLICK, Some(body))
            .await
    }

    /// Vertical wheel scroll
    pub async fn scroll(&self, delta: i32) -> bool {
        self.command(
            "scrolling",
            endpoints::MOUSE_SCROLL,
            Some(json!({"delta": delta})),
        )
        .await
    }

    // ==================== Keyboard ====================

    pub async fn type_text(&self, text: &str) -> bool {
        self.command(
            "typing text",
            endpoints::KEYBOARD_TYPE,
            Some(json!({"text": text})),
        )
        .await
    }

    /// Send a single key (`key`) or a combination such as `ctrl+c` (`keys`)
    pub async fn send_key(&self, key: Option<&str>, keys: Option<&str>) -> bool {
        let mut body = json!({});
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            body["key"] = json!(key);
        }
        if let Some(keys) = keys.filter(|k| !k.is_empty()) {
            body["keys"] = json!(keys);
        }
        self.command("sending key", endpoints::KEYBOARD_KEY, Some(body))
            .await
    }

    /// Ctrl+Alt+Del
    pub async fn send_secure_attention(&self) -> bool {
        self.command("sending secure attention", endpoints::SECURE_ATTENTION, None)
            .await
    }

    pub async fn send_to_secure_desktop(&self, text: &str) -> bool {
        self.command(
            "sending text to secure desktop",
            endpoints::SECURE_DESKTOP_TEXT,
            Some(json!({"text": text})),
        )
        .await
    }

    // ==================== Audio ====================

    /// Set master volume (0.0-1.0)
    pub async fn set_volume(&self, volume: f64) -> bool {
        if let Err(err) = validate_volume(volume) {
            error!("Error setting volume: {}", err);
            return false;
        }
        self.command(
            "setting volume",
            endpoints::AUDIO_VOLUME,
            Some(json!({"volume": volume})),
        )
        .await
    }

    pub async fn set_app_volume(&self, process_id: i64, volume: f64) -> bool {
        if let Err(err) = validate_process_id(process_id).and_then(|_| validate_volume(volume)) {
            error!("Error setting app volume: {}", err);
            return false;
        }
        self.command(
            "setting app volume",
            endpoints::AUDIO_APP_VOLUME,
            Some(json!({"process_id": process_id, "volume": volume})),
        )
        .await
    }

    /// Route an application's audio to another output device
    pub async fn set_app_device(&self, process_id: i64, device_id: &str) -> bool {
        if let Err(err) = validate_process_id(process_id) {
            error!("Error setting app device: {}", err);
            return false;
        }
        self.command(
            "setting app device",
            endpoints::AUDIO_APP_DEVICE,
            Some(json!({"process_id": process_id, "device_id": device_id})),
        )
        .await
    }

    pub async fn set_default_device(&self, device_id: &str) -> bool {
        self.command(
            "setting default device",
            endpoints::AUDIO_DEFAULT_DEVICE,
            Some(json!({"device_id": device_id})),
        )
        .await
    }

    // ==================== Screen ====================

    /// Select the monitor used for screen capture
    pub async fn select_monitor(&self, index: usize) -> bool {
        self.command(
            "selecting monitor",
            &endpoints::select_monitor(index),
            None,
        )
        .await
    }

    pub async fn start_screen_capture(&self) -> bool {
        self.command("starting screen capture", endpoints::SCREEN_START, None)
            .await
    }

    pub async fn stop_screen_capture(&self) -> bool {
        self.command("stopping screen capture", endpoints::SCREEN_STOP, None)
            .await
    }

    /// Take a screenshot; `None` on any failure
    pub async fn take_screenshot(&self) -> Option<Value> {
        match self.request(Method::Post, endpoints::SCREENSHOT, None).await {
            Ok(value) => Some(value),
            Err(err) => {
                error!("Error taking screenshot: {}", err);
                None
            }
        }
    }

    // ==================== System ====================

    /// Restart the agent process
    pub async fn restart_client(&self) -> bool {
        self.command("restarting client", endpoints::SYSTEM_RESTART, None)
            .await
    }

    pub async fn lock_workstation(&self) -> bool {
        self.command("locking workstation", endpoints::SYSTEM_LOCK, None)
            .await
    }
}

/// Process IDs identify audio sessions and must be positive
pub fn validate_process_id(process_id: i64) -> ClientResult<()> {
    if process_id <= 0 {
        return Err(ClientError::InvalidInput(format!(
            "invalid process_id: {}",
            process_id
        )));
    }
    Ok(())
}

pub fn validate_volume(volume: f64) -> ClientResult<()> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(ClientError::InvalidInput(format!(
            "volume must be between 0.0 and 1.0, got {}",
            volume
        )));
    }
    Ok(())
}
