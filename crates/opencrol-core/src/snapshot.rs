//! Snapshot of remote agent state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AudioApp, AudioDevice, Monitor};

/// Reachability reported by the agent's status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Online,
    #[default]
    Offline,
}

impl ConnectionStatus {
    /// Map the agent's `online` flag
    pub fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One consistent view of the remote agent, produced by a single poll cycle
///
/// A snapshot is never mutated after construction. The coordinator replaces
/// it wholesale on every successful cycle and keeps the previous one when a
/// cycle fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Reachability reported by the agent
    pub status: ConnectionStatus,

    /// Monitors in the order the agent listed them
    pub monitors: Vec<Monitor>,

    /// Index of the monitor selected for capture
    pub current_monitor: usize,

    /// Applications with audio sessions
    pub audio_apps: Vec<AudioApp>,

    /// Output devices
    pub audio_devices: Vec<AudioDevice>,

    /// Feature flags advertised by the agent
    pub capabilities: serde_json::Map<String, serde_json::Value>,

    /// Master volume (0.0-1.0)
    pub master_volume: f64,

    /// Whether screen capture is running
    pub screen_capture_active: bool,

    /// Client ID reported by the agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// When the cycle that produced this snapshot completed
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Whether the agent reported itself online
    pub fn is_online(&self) -> bool {
        self.status == ConnectionStatus::Online
    }

    pub fn total_monitors(&self) -> usize {
        self.monitors.len()
    }

    /// Look up a monitor by index
    pub fn monitor(&self, index: usize) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.index == index)
    }

    /// The monitor currently selected for capture
    pub fn current(&self) -> Option<&Monitor> {
        self.monitor(self.current_monitor)
    }

    /// The default output device
    ///
    /// `None` is a valid transient state while the agent switches devices.
    pub fn default_device(&self) -> Option<&AudioDevice> {
        self.audio_devices.iter().find(|d| d.is_default)
    }

    /// Look up an audio session by process ID
    pub fn app(&self, process_id: i64) -> Option<&AudioApp> {
        self.audio_apps.iter().find(|a| a.process_id == process_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        Snapshot {
            status: ConnectionStatus::Online,
            monitors: vec![Monitor::new(0, 1920, 1080).primary(), Monitor::new(1, 1280, 1024)],
            current_monitor: 1,
            audio_apps: vec![AudioApp {
                process_id: 77,
                name: "Firefox".to_string(),
                volume: 0.8,
                device_id: None,
            }],
            audio_devices: vec![
                AudioDevice {
                    id: "speakers".to_string(),
                    name: "Speakers".to_string(),
                    is_default: false,
                },
                AudioDevice {
                    id: "headset".to_string(),
                    name: "Headset".to_string(),
                    is_default: true,
                },
            ],
            capabilities: serde_json::Map::new(),
            master_volume: 0.5,
            screen_capture_active: false,
            client_id: Some("office-pc".to_string()),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_accessors() {
        let snap = snapshot();
        assert!(snap.is_online());
        assert_eq!(snap.total_monitors(), 2);
        assert_eq!(snap.current().map(|m| m.width), Some(1280));
        assert_eq!(snap.default_device().map(|d| d.id.as_str()), Some("headset"));
        assert_eq!(snap.app(77).map(|a| a.name.as_str()), Some("Firefox"));
        assert!(snap.app(78).is_none());
    }

    #[test]
    fn test_no_default_device() {
        let mut snap = snapshot();
        snap.audio_devices.iter_mut().for_each(|d| d.is_default = false);
        assert!(snap.default_device().is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ConnectionStatus::Online).unwrap(), json!("online"));
        assert_eq!(ConnectionStatus::from_online(false).to_string(), "offline");
    }
}
