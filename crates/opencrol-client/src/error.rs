//! Error types for the OpenCtrol client

use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Failures below HTTP: the request never produced a status code
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Could not establish a connection
    #[error("connection failed: {0}")]
    Connect(String),

    /// Connect or total timeout elapsed
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Any other failure while sending the request or reading the body
    #[error("request failed: {0}")]
    Request(String),

    /// The pooled session could not be created
    #[error("failed to create HTTP session: {0}")]
    Setup(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Errors surfaced by [`HttpClient`](crate::HttpClient)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Network or timeout failure, after retries
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// 5xx response, after retries
    #[error("agent returned server error: HTTP {status}")]
    RemoteServer { status: u16 },

    /// Non-2xx response below 500, never retried
    #[error("agent rejected request: HTTP {status}")]
    RemoteClient { status: u16 },

    /// Body was not JSON or lacked an expected field
    #[error("malformed response from {path}: {reason}")]
    MalformedResponse { path: String, reason: String },

    /// Rejected locally before any request was sent
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// Whether the agent requires (or rejected) the shared secret
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ClientError::RemoteClient { status: 401 })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport(t) if t.is_timeout())
    }

    /// Whether the failure happened below HTTP
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
