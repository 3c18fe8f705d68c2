//! Poll cycle state machine
//!
//! ```text
//! Idle → Polling → Updated ─┐
//!              ↘ Failed  ───┤→ Polling (next cycle)
//!                           └→ Idle (shutdown)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Where the coordinator is in its poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    /// No cycle has run yet, or the coordinator was shut down
    #[default]
    Idle,
    /// A refresh is in flight
    Polling,
    /// The last cycle published a snapshot
    Updated,
    /// The last cycle failed; the previous snapshot is kept
    Failed,
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid poll state transition from {from} to {to}: {reason}")]
pub struct InvalidTransition {
    pub from: PollState,
    pub to: PollState,
    pub reason: &'static str,
}

impl PollState {
    /// Attempt a transition to a new state
    pub fn try_transition(self, to: PollState) -> Result<PollState, InvalidTransition> {
        use PollState::*;

        let valid = matches!(
            (self, to),
            (Idle, Polling)
                | (Updated, Polling)
                | (Failed, Polling)
                | (Polling, Updated)
                | (Polling, Failed)
                | (Updated, Idle)
                | (Failed, Idle)
        );

        if valid {
            Ok(to)
        } else {
            Err(InvalidTransition {
                from: self,
                to,
                reason: Self::transition_error_reason(self, to),
            })
        }
    }

    pub fn can_transition_to(self, to: PollState) -> bool {
        self.try_transition(to).is_ok()
    }

    /// Whether a refresh is currently running
    pub fn is_polling(self) -> bool {
        self == PollState::Polling
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PollState::Idle => "idle",
            PollState::Polling => "polling",
            PollState::Updated => "updated",
            PollState::Failed => "failed",
        }
    }

    fn transition_error_reason(from: PollState, to: PollState) -> &'static str {
        use PollState::*;

        match (from, to) {
            (Polling, Polling) => "a refresh is already in flight",
            (Polling, Idle) => "refresh in progress - must complete first",
            (Idle, Updated) | (Idle, Failed) => "must go through Polling",
            (Updated, Failed) | (Failed, Updated) => "outcome changes only through a new cycle",
            _ => "Invalid state transition",
        }
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
