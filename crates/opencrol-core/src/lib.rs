//! Core types for OpenCtrol
//!
//! This crate provides the data model shared by the HTTP client, the polling
//! coordinator and the host binary: the published [`Snapshot`], the entities
//! it aggregates ([`Monitor`], [`AudioApp`], [`AudioDevice`]) and the typed
//! [`Command`] set that can be sent to a remote agent.

mod audio;
mod command;
mod monitor;
mod snapshot;

pub use audio::{AudioApp, AudioDevice};
pub use command::{Command, CommandError, MouseButton};
pub use monitor::Monitor;
pub use snapshot::{ConnectionStatus, Snapshot};

/// Default agent port
pub const DEFAULT_PORT: u16 = 8080;

/// Agent REST endpoints consumed by the client
pub mod endpoints {
    pub const HEALTH: &str = "/api/v1/health";
    pub const STATUS: &str = "/api/v1/status";
    pub const MONITORS: &str = "/api/v1/status/monitors";

    pub const MOUSE_MOVE: &str = "/api/v1/remotecontrol/mouse/move";
    pub const MOUSE_CLICK: &str = "/api/v1/remotecontrol/mouse/click";
    pub const MOUSE_SCROLL: &str = "/api/v1/remotecontrol/mouse/scroll";

    pub const KEYBOARD_TYPE: &str = "/api/v1/remotecontrol/keyboard/type";
    pub const KEYBOARD_KEY: &str = "/api/v1/remotecontrol/keyboard/key";
    pub const SECURE_ATTENTION: &str = "/api/v1/remotecontrol/keyboard/secure-attention";
    pub const SECURE_DESKTOP_TEXT: &str =
        "/api/v1/remotecontrol/keyboard/secure-desktop/send-text";

    pub const AUDIO_VOLUME: &str = "/api/v1/remotecontrol/audio/volume";
    pub const AUDIO_APP_VOLUME: &str = "/api/v1/remotecontrol/audio/app-volume";
    pub const AUDIO_APP_DEVICE: &str = "/api/v1/remotecontrol/audio/app-device";
    pub const AUDIO_DEFAULT_DEVICE: &str = "/api/v1/remotecontrol/audio/default-device";
    pub const AUDIO_APPS: &str = "/api/v1/remotecontrol/audio/apps";
    pub const AUDIO_DEVICES: &str = "/api/v1/remotecontrol/audio/devices";

    pub const SCREEN_START: &str = "/api/v1/screen/start";
    pub const SCREEN_STOP: &str = "/api/v1/screen/stop";
    pub const SCREENSHOT: &str = "/api/v1/screenstream/screenshot";
    pub const SCREEN_STREAM: &str = "/api/v1/screenstream/stream";
    pub const SCREEN_FRAME: &str = "/api/v1/screenstream/frame";

    pub const SYSTEM_RESTART: &str = "/api/v1/system/restart";
    pub const SYSTEM_LOCK: &str = "/api/v1/system/lock";

    /// Path selecting the capture monitor by index
    pub fn select_monitor(index: usize) -> String {
        format!("/api/v1/screen/monitor/{}", index)
    }
}
