//! Monitor type reported by the agent

use serde::{Deserialize, Serialize};

/// A display attached to the remote machine
///
/// Monitors are identified by their `index`; the agent only guarantees
/// that field; dimensions and the primary flag default to zero/false
/// when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    /// Index used by the screen endpoints
    pub index: usize,

    /// Width in pixels
    #[serde(default)]
    pub width: u32,

    /// Height in pixels
    #[serde(default)]
    pub height: u32,

    /// Whether this is the primary display
    #[serde(default)]
    pub is_primary: bool,

    /// Device name (e.g., "\\\\.\\DISPLAY1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Monitor {
    /// Create a monitor with the given index and dimensions
    pub fn new(index: usize, width: u32, height: u32) -> Self {
        Self {
            index,
            width,
            height,
            is_primary: false,
            name: None,
        }
    }

    /// Mark this monitor as primary
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_only_monitor() {
        let monitor: Monitor = serde_json::from_value(json!({"index": 0})).unwrap();
        assert_eq!(monitor, Monitor::new(0, 0, 0));
    }

    #[test]
    fn test_full_monitor() {
        let monitor: Monitor = serde_json::from_value(json!({
            "index": 1,
            "width": 2560,
            "height": 1440,
            "is_primary": true,
            "name": "DISPLAY2"
        }))
        .unwrap();

        assert_eq!(monitor.index, 1);
        assert_eq!(monitor.width, 2560);
        assert!(monitor.is_primary);
        assert_eq!(monitor.name.as_deref(), Some("DISPLAY2"));
    }
}
