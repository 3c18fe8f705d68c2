//! Typed bodies of the agent's read endpoints

use opencrol_core::Monitor;
use serde::{Deserialize, Serialize};

/// Body of `GET /api/v1/status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub online: bool,

    #[serde(default)]
    pub capabilities: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub master_volume: f64,

    #[serde(default)]
    pub screen_capture_active: bool,

    /// Only some agent versions report this here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_monitor: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// Body of `GET /api/v1/status/monitors`
///
/// Agents answer either with a bare list or with an object that also
/// carries the selected monitor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MonitorsResponse {
    List(Vec<Monitor>),
    Wrapped {
        #[serde(default)]
        monitors: Vec<Monitor>,
        #[serde(default)]
        current_monitor: Option<usize>,
        #[serde(default)]
        total_monitors: Option<usize>,
    },
}

impl MonitorsResponse {
    /// Normalize into the monitor list and the selected index
    ///
    /// The object form's own `current_monitor` wins; otherwise `fallback`
    /// (typically the status endpoint's value) is used, then 0.
    pub fn into_parts(self, fallback: Option<usize>) -> (Vec<Monitor>, usize) {
        match self {
            MonitorsResponse::List(monitors) => (monitors, fallback.unwrap_or(0)),
            MonitorsResponse::Wrapped {
                monitors,
                current_monitor,
                ..
            } => (monitors, current_monitor.or(fallback).unwrap_or(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_defaults() {
        let status: StatusResponse = serde_json::from_value(json!({})).unwrap();
        assert!(!status.online);
        assert!(status.capabilities.is_empty());
        assert_eq!(status.current_monitor, None);
    }

    #[test]
    fn test_both_monitor_shapes_normalize_alike() {
        let list: MonitorsResponse = serde_json::from_value(json!([
            {"index": 0, "width": 1920, "height": 1080, "is_primary": true},
            {"index": 1, "width": 1280, "height": 720},
            {"index": 2, "width": 800, "height": 600}
        ]))
        .unwrap();
        let wrapped: MonitorsResponse = serde_json::from_value(json!({
            "monitors": [
                {"index": 0, "width": 1920, "height": 1080, "is_primary": true},
                {"index": 1, "width": 1280, "height": 720},
                {"index": 2, "width": 800, "height": 600}
            ],
            "current_monitor": 2,
            "total_monitors": 3
        }))
        .unwrap();

        assert!(matches!(list, MonitorsResponse::List(_)));
        assert!(matches!(wrapped, MonitorsResponse::Wrapped { .. }));
        assert_eq!(list.into_parts(Some(2)), wrapped.into_parts(None));
    }

    #[test]
    fn test_wrapped_current_wins_over_fallback() {
        let wrapped: MonitorsResponse =
            serde_json::from_value(json!({"monitors": [{"index": 0}], "current_monitor": 0}))
                .unwrap();
        let (monitors, current) = wrapped.into_parts(Some(3));
        assert_eq!(monitors.len(), 1);
        assert_eq!(current, 0);
    }

    #[test]
    fn test_bare_list_without_fallback() {
        let list: MonitorsResponse = serde_json::from_value(json!([{"index": 0}])).unwrap();
        assert_eq!(list.into_parts(None).1, 0);
    }
}
