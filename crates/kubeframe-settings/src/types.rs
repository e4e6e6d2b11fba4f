//! Settings type definitions.
//!
//! Field names are camelCase on the wire. Every section is `#[serde(default)]`
//! so a partial JSON file only needs the keys it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Catalog deadline used when nothing overrides it.
pub const DEFAULT_CATALOG_TIMEOUT_MS: u64 = 15_000;

/// Root settings type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KubeframeSettings {
    /// Cluster-frame lifecycle settings.
    pub frame: FrameSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Cluster-frame lifecycle settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameSettings {
    /// How long to wait for the entity catalog to become non-empty before
    /// giving up on loading extensions.
    pub catalog_timeout_ms: u64,
}

impl FrameSettings {
    /// The catalog deadline as a [`Duration`].
    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_millis(self.catalog_timeout_ms)
    }
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            catalog_timeout_ms: DEFAULT_CATALOG_TIMEOUT_MS,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level directive (`RUST_LOG` takes precedence).
    pub level: String,
    /// Emit JSON on stdout instead of human-readable lines.
    pub json: bool,
    /// Optional JSON-lines log file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_path: None,
        }
    }
}
