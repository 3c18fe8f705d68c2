//! Commands that can be sent to a remote agent
//!
//! Every command the coordinator can dispatch is a variant of [`Command`],
//! so the dispatch table is a single exhaustive `match`. Host-facing callers
//! that only have a command name and a JSON argument object go through
//! [`Command::from_name`], which rejects unknown names instead of guessing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors when building a command from a name and arguments
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("invalid arguments for {name}: {reason}")]
    InvalidArguments { name: String, reason: String },
}

/// Mouse button for click commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
        }
    }
}

/// A command for the remote agent
///
/// Serialized as `{"command": "<name>", ...arguments}`. Omitted arguments
/// take the same defaults the host integration always passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    MoveMouse {
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
        #[serde(default)]
        relative: bool,
    },
    Click {
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        x: Option<i32>,
        #[serde(default)]
        y: Option<i32>,
    },
    Scroll {
        #[serde(default)]
        delta: i32,
    },
    TypeText {
        #[serde(default)]
        text: String,
    },
    SendKey {
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        keys: Option<String>,
    },
    SecureAttention,
    SetVolume {
        #[serde(default)]
        volume: f64,
    },
    SetAppVolume {
        #[serde(default)]
        process_id: i64,
        #[serde(default)]
        volume: f64,
    },
    SetAppDevice {
        #[serde(default)]
        process_id: i64,
        #[serde(default)]
        device_id: String,
    },
    SetDefaultDevice {
        #[serde(default)]
        device_id: String,
    },
    SelectMonitor {
        #[serde(default)]
        monitor_index: usize,
    },
    StartScreenCapture,
    StopScreenCapture,
    SendToSecureDesktop {
        #[serde(default)]
        text: String,
    },
    TakeScreenshot,
    Restart,
    Lock,
}

impl Command {
    /// Every command name accepted by [`Command::from_name`]
    pub const NAMES: &'static [&'static str] = &[
        "move_mouse",
        "click",
        "scroll",
        "type_text",
        "send_key",
        "secure_attention",
        "set_volume",
        "set_app_volume",
        "set_app_device",
        "set_default_device",
        "select_monitor",
        "start_screen_capture",
        "stop_screen_capture",
        "send_to_secure_desktop",
        "take_screenshot",
        "restart",
        "lock",
    ];

    /// Build a command from its name and a JSON argument object
    ///
    /// `args` may be `null` or an object; any `command` key inside it is
    /// overwritten by `name`.
    pub fn from_name(name: &str, args: serde_json::Value) -> Result<Self, CommandError> {
        if !Self::NAMES.contains(&name) {
            return Err(CommandError::Unknown(name.to_string()));
        }

        let mut fields = match args {
            serde_json::Value::Null => serde_json::Map::new(),
            serde_json::Value::Object(map) => map,
            other => {
                return Err(CommandError::InvalidArguments {
                    name: name.to_string(),
                    reason: format!("expected an object, got {}", other),
                })
            }
        };
        fields.insert(
            "command".to_string(),
            serde_json::Value::String(name.to_string()),
        );

        serde_json::from_value(serde_json::Value::Object(fields)).map_err(|e| {
            CommandError::InvalidArguments {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// The command's wire name
    pub fn name(&self) -> &'static str {
        match self {
            Command::MoveMouse { .. } => "move_mouse",
            Command::Click { .. } => "click",
            Command::Scroll { .. } => "scroll",
            Command::TypeText { .. } => "type_text",
            Command::SendKey { .. } => "send_key",
            Command::SecureAttention => "secure_attention",
            Command::SetVolume { .. } => "set_volume",
            Command::SetAppVolume { .. } => "set_app_volume",
            Command::SetAppDevice { .. } => "set_app_device",
            Command::SetDefaultDevice { .. } => "set_default_device",
            Command::SelectMonitor { .. } => "select_monitor",
            Command::StartScreenCapture => "start_screen_capture",
            Command::StopScreenCapture => "stop_screen_capture",
            Command::SendToSecureDesktop { .. } => "send_to_secure_desktop",
            Command::TakeScreenshot => "take_screenshot",
            Command::Restart => "restart",
            Command::Lock => "lock",
        }
    }
}
