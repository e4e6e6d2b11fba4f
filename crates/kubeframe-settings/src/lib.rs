//! # kubeframe-settings
//!
//! Configuration with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`KubeframeSettings::default()`]
//! 2. **User file** — `~/.kubeframe/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `KUBEFRAME_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, merge_layer, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<KubeframeSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// The first call loads from disk and the environment; a failed load falls
/// back to compiled defaults.
pub fn get_settings() -> &'static KubeframeSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: KubeframeSettings) -> std::result::Result<(), KubeframeSettings> {
    SETTINGS.set(settings)
}
