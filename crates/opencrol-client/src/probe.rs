//! Connection probe used before an agent is configured
//!
//! Mirrors the checks a setup flow performs: the unauthenticated health
//! endpoint must answer, then the status endpoint tells whether the shared
//! secret is missing or wrong.

use opencrol_core::endpoints;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::client::ClientSettings;
use crate::transport::{ApiRequest, ReqwestTransport, Transport};

/// Connect timeout while probing
pub const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total timeout while probing
pub const PROBE_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of probing an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// Reachable and authorized
    Ready { client_id: Option<String> },
    /// The agent needs a secret and none was supplied
    AuthRequired,
    /// The supplied secret was rejected
    InvalidAuth,
    CannotConnect { reason: String },
    Timeout,
}

impl ProbeOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProbeOutcome::Ready { .. })
    }
}

/// Probe the agent described by `settings`, without retries
pub async fn probe(settings: &ClientSettings) -> ProbeOutcome {
    let transport = ReqwestTransport::new(
        settings
            .clone()
            .with_timeouts(PROBE_CONNECT_TIMEOUT, PROBE_REQUEST_TIMEOUT)
            .transport_config(),
    );
    let outcome = probe_with(&transport, settings.password.is_some()).await;
    transport.close().await;
    outcome
}

/// Probe over an arbitrary transport
pub async fn probe_with(transport: &dyn Transport, has_password: bool) -> ProbeOutcome {
    match transport.execute(&ApiRequest::get(endpoints::HEALTH)).await {
        Ok(response) if response.status == 200 => {
            info!("Health endpoint accessible");
        }
        Ok(response) => {
            warn!("Health endpoint returned status: {}", response.status);
            return ProbeOutcome::CannotConnect {
                reason: format!("health endpoint returned HTTP {}", response.status),
            };
        }
        Err(err) if err.is_timeout() => return ProbeOutcome::Timeout,
        Err(err) => {
            warn!("Connection error: {}", err);
            return ProbeOutcome::CannotConnect {
                reason: err.to_string(),
            };
        }
    }

    match transport.execute(&ApiRequest::get(endpoints::STATUS)).await {
        Ok(response) if response.status == 200 => {
            let client_id = serde_json::from_slice::<serde_json::Value>(&response.body)
                .ok()
                .and_then(|v| v.get("client_id").and_then(|c| c.as_str()).map(String::from));
            info!(
                "Connection successful. Client ID: {}",
                client_id.as_deref().unwrap_or("unknown")
            );
            ProbeOutcome::Ready { client_id }
        }
        Ok(response) if response.status == 401 => {
            if has_password {
                warn!("Password validation failed: invalid password");
                ProbeOutcome::InvalidAuth
            } else {
                info!("Password required");
                ProbeOutcome::AuthRequired
            }
        }
        Ok(response) => {
            warn!("Unexpected status code: {}", response.status);
            ProbeOutcome::CannotConnect {
                reason: format!("status endpoint returned HTTP {}", response.status),
            }
        }
        Err(err) if err.is_timeout() => ProbeOutcome::Timeout,
        // A reachable agent that drops the status request usually wants a secret
        Err(_) if !has_password => ProbeOutcome::AuthRequired,
        Err(err) => ProbeOutcome::CannotConnect {
            reason: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::mock::MockTransport;
    use crate::transport::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_ready_with_client_id() {
        let mock = MockTransport::new();
        mock.json(Method::Get, endpoints::HEALTH, 200, json!({"status": "ok"}))
            .json(
                Method::Get,
                endpoints::STATUS,
                200,
                json!({"online": true, "client_id": "office-pc"}),
            );

        assert_eq!(
            probe_with(&mock, false).await,
            ProbeOutcome::Ready {
                client_id: Some("office-pc".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_unauthorized_status() {
        let mock = MockTransport::new();
        mock.status(Method::Get, endpoints::HEALTH, 200)
            .status(Method::Get, endpoints::STATUS, 401);

        assert_eq!(probe_with(&mock, false).await, ProbeOutcome::AuthRequired);
        assert_eq!(probe_with(&mock, true).await, ProbeOutcome::InvalidAuth);
    }

    #[tokio::test]
    async fn test_health_failures() {
        let mock = MockTransport::new();
        mock.status(Method::Get, endpoints::HEALTH, 500);
        assert!(matches!(
            probe_with(&mock, false).await,
            ProbeOutcome::CannotConnect { .. }
        ));
        assert_eq!(mock.count(Method::Get, endpoints::STATUS), 0);

        let mock = MockTransport::new();
        mock.fail(
            Method::Get,
            endpoints::HEALTH,
            TransportError::Timeout("deadline".to_string()),
        );
        assert_eq!(probe_with(&mock, false).await, ProbeOutcome::Timeout);
    }

    #[test]
    fn test_outcome_serialization() {
        let value = serde_json::to_value(ProbeOutcome::InvalidAuth).unwrap();
        assert_eq!(value, json!({"outcome": "invalid_auth"}));
    }
}
