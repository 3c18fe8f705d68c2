//! Poll cycle failures

use opencrol_client::ClientError;
use thiserror::Error;

/// Why a refresh cycle did not publish a snapshot
#[derive(Debug, Clone, Error)]
pub enum UpdateFailed {
    /// The agent could not be reached
    #[error("cannot connect to agent: {0}")]
    CannotConnect(#[source] ClientError),

    /// A required request timed out after all retries
    #[error("timeout communicating with agent: {0}")]
    Timeout(#[source] ClientError),

    /// The agent answered with an error status or an unreadable body
    #[error("error communicating with agent: {0}")]
    Communication(#[source] ClientError),
}

impl UpdateFailed {
    pub fn cause(&self) -> &ClientError {
        match self {
            UpdateFailed::CannotConnect(e)
            | UpdateFailed::Timeout(e)
            | UpdateFailed::Communication(e) => e,
        }
    }
}

impl From<ClientError> for UpdateFailed {
    fn from(err: ClientError) -> Self {
        if err.is_timeout() {
            UpdateFailed::Timeout(err)
        } else if err.is_transport() {
            UpdateFailed::CannotConnect(err)
        } else {
            UpdateFailed::Communication(err)
        }
    }
}
