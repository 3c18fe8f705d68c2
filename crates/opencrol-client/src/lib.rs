//! HTTP client for the OpenCtrol remote control agent
//!
//! # Key Types
//!
//! - [`HttpClient`] - One typed method per remote operation, with retry
//! - [`RetryPolicy`] - Bounded attempts with capped exponential backoff
//! - [`Transport`] - Single-attempt request execution; [`ReqwestTransport`]
//!   keeps one pooled session per agent
//! - [`ClientError`] - Transport, remote and local validation failures
//!
//! Reads (`get_status`, `get_monitors`, audio lists) propagate errors.
//! Commands return `bool` and never fail the caller.

mod client;
mod error;
mod probe;
mod responses;
mod retry;
mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{validate_process_id, validate_volume, ClientSettings, HttpClient};
pub use error::{ClientError, ClientResult, TransportError};
pub use probe::{probe, probe_with, ProbeOutcome, PROBE_CONNECT_TIMEOUT, PROBE_REQUEST_TIMEOUT};
pub use responses::{MonitorsResponse, StatusResponse};
pub use retry::{RetryPolicy, INITIAL_RETRY_DELAY, MAX_RETRIES, MAX_RETRY_DELAY};
pub use transport::{
    ApiRequest, Method, RawResponse, ReqwestTransport, Transport, TransportConfig,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, PASSWORD_HEADER, POOL_IDLE_TIMEOUT,
    POOL_MAX_IDLE_PER_HOST, USER_AGENT,
};
