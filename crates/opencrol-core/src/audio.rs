//! Audio session and endpoint types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An application with an audio session on the remote machine
///
/// Deserialization never fails on the identity: `process_id` is read
/// first, then the older `id` key, and anything missing or non-numeric
/// becomes 0 so the entry can be filtered out on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireAudioApp")]
pub struct AudioApp {
    /// Process ID, the identity of the session
    pub process_id: i64,

    /// Display name of the application
    pub name: String,

    /// Session volume (0.0-1.0)
    pub volume: f64,

    /// Output device the session is routed to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

#[derive(Deserialize)]
struct WireAudioApp {
    #[serde(default)]
    process_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default)]
    device_id: Option<String>,
}

impl From<WireAudioApp> for AudioApp {
    fn from(wire: WireAudioApp) -> Self {
        let process_id = wire
            .process_id
            .as_ref()
            .and_then(numeric_id)
            .or_else(|| wire.id.as_ref().and_then(numeric_id))
            .unwrap_or(0);

        Self {
            process_id,
            name: wire.name.unwrap_or_default(),
            volume: wire.volume.unwrap_or_default(),
            device_id: wire.device_id,
        }
    }
}

/// Integers, or strings holding one
fn numeric_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl AudioApp {
    /// Whether the process ID can be used for app-scoped calls
    pub fn has_valid_process_id(&self) -> bool {
        self.process_id > 0
    }
}

/// An audio output device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    /// Endpoint ID
    pub id: String,

    /// Friendly name
    #[serde(default)]
    pub name: String,

    /// Whether this is the current default output
    #[serde(default)]
    pub is_default: bool,
}
