//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a settings file could not be turned into [`crate::KubeframeSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read settings file {}: {source}", path.display())]
    Read {
        /// Settings file that was being loaded.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The settings file is not JSON.
    #[error("settings file {} is not valid JSON: {source}", path.display())]
    Syntax {
        /// Settings file that was being loaded.
        path: PathBuf,
        /// Parser error, with line and column.
        source: serde_json::Error,
    },
    /// The file is JSON but a key has the wrong type, e.g. a string
    /// `frame.catalogTimeoutMs`.
    #[error("settings file {} has an invalid value: {source}", path.display())]
    Schema {
        /// Settings file that was being loaded.
        path: PathBuf,
        /// Deserialization error naming the offending key.
        source: serde_json::Error,
    },
}

impl SettingsError {
    /// The settings file the error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. } | Self::Syntax { path, .. } | Self::Schema { path, .. } => {
                path
            }
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
