//! Polling coordinator for the OpenCtrol agent
//!
//! The [`Coordinator`] is the single source of truth for one agent: a
//! scheduler calls [`Coordinator::refresh`] (or lets
//! [`Coordinator::spawn_polling`] do it), consumers read the published
//! [`Snapshot`](opencrol_core::Snapshot) and issue commands through
//! [`Coordinator::send_command`].

mod coordinator;
mod error;
mod state;

pub use coordinator::{Coordinator, SnapshotReceiver, UpdateHealth, DEFAULT_UPDATE_INTERVAL};
pub use error::UpdateFailed;
pub use state::{InvalidTransition, PollState};
