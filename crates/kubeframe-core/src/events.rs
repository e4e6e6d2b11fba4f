//! App-level telemetry events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::ClusterId;

/// A telemetry event published on the app event bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppEvent {
    /// Event family, e.g. `cluster`.
    pub name: String,
    /// What happened, e.g. `open`.
    pub action: String,
    /// Free-form parameters.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl AppEvent {
    /// Build an event with no parameters.
    pub fn new(name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: action.into(),
            params: Map::new(),
        }
    }

    /// Attach a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.params.insert(key.into(), value.into());
        self
    }

    /// The event emitted once each time a cluster frame opens.
    pub fn cluster_open(cluster_id: &ClusterId) -> Self {
        Self::new("cluster", "open").with_param("clusterId", cluster_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_open_shape() {
        let evt = AppEvent::cluster_open(&ClusterId::from_raw("c-9"));
        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "cluster",
                "action": "open",
                "params": { "clusterId": "c-9" }
            })
        );
    }

    #[test]
    fn empty_params_are_omitted() {
        let json = serde_json::to_string(&AppEvent::new("app", "start")).unwrap();
        assert_eq!(json, r#"{"name":"app","action":"start"}"#);
        let parsed: AppEvent = serde_json::from_str(&json).unwrap();
        assert!(parsed.params.is_empty());
    }
}
