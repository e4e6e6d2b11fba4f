//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`KubeframeSettings::default()`]
//! 2. If `~/.kubeframe/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::KubeframeSettings;

/// Upper bound accepted for `KUBEFRAME_CATALOG_TIMEOUT_MS` (one hour).
const MAX_CATALOG_TIMEOUT_MS: u64 = 3_600_000;

/// Resolve the path to the settings file (`~/.kubeframe/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".kubeframe").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<KubeframeSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<KubeframeSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<KubeframeSettings> {
    let schema = |source| SettingsError::Schema {
        path: path.to_path_buf(),
        source,
    };
    let mut layered = serde_json::to_value(KubeframeSettings::default()).map_err(schema)?;

    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(?path, "loading settings from file");
            let user: Value =
                serde_json::from_str(&content).map_err(|source| SettingsError::Syntax {
                    path: path.to_path_buf(),
                    source,
                })?;
            merge_layer(&mut layered, user);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(?path, "settings file not found, using defaults");
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    serde_json::from_value(layered).map_err(schema)
}

/// Merge a user settings layer into `base` in place.
///
/// Objects merge key by key, `null` leaves the base value untouched, and
/// anything else (arrays included) replaces it.
pub fn merge_layer(base: &mut Value, layer: Value) {
    match (base, layer) {
        (_, Value::Null) => {}
        (Value::Object(base_map), Value::Object(entries)) => {
            for (key, value) in entries {
                match base_map.get_mut(&key) {
                    Some(slot) => merge_layer(slot, value),
                    None if value.is_null() => {}
                    None => {
                        let _ = base_map.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are logged and ignored.
pub fn apply_env_overrides(settings: &mut KubeframeSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable lookup.
fn apply_overrides(settings: &mut KubeframeSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = read_u64(&lookup, "KUBEFRAME_CATALOG_TIMEOUT_MS", 0, MAX_CATALOG_TIMEOUT_MS) {
        settings.frame.catalog_timeout_ms = v;
    }
    if let Some(v) = read_string(&lookup, "KUBEFRAME_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_string(&lookup, "KUBEFRAME_LOG_FILE") {
        settings.logging.file_path = Some(v);
    }
    if let Some(v) = read_bool(&lookup, "KUBEFRAME_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse an env flag. Accepts `1`/`0`, `true`/`false`, `yes`/`no` and
/// `on`/`off`, ignoring case and surrounding whitespace.
pub fn parse_bool(val: &str) -> Option<bool> {
    const TRUTHY: [&str; 4] = ["1", "true", "yes", "on"];
    const FALSY: [&str; 4] = ["0", "false", "no", "off"];
    let val = val.trim();
    if TRUTHY.iter().any(|t| val.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if FALSY.iter().any(|f| val.eq_ignore_ascii_case(f)) {
        Some(false)
    } else {
        None
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Variable readers ────────────────────────────────────────────────────────

fn read_string(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.is_empty())
}

fn read_bool(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<bool> {
    let val = lookup(name)?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    min: u64,
    max: u64,
) -> Option<u64> {
    let val = lookup(name)?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── merge_layer ─────────────────────────────────────────────────

    #[test]
    fn user_timeout_overrides_default_and_keeps_logging() {
        let mut base = serde_json::to_value(KubeframeSettings::default()).unwrap();
        merge_layer(&mut base, serde_json::json!({"frame": {"catalogTimeoutMs": 500}}));
        assert_eq!(base["frame"]["catalogTimeoutMs"], 500);
        assert_eq!(base["logging"]["level"], "info");
    }

    #[test]
    fn null_timeout_keeps_default() {
        let mut base = serde_json::to_value(KubeframeSettings::default()).unwrap();
        merge_layer(&mut base, serde_json::json!({"frame": {"catalogTimeoutMs": null}}));
        assert_eq!(base["frame"]["catalogTimeoutMs"], 15_000);
    }

    #[test]
    fn non_object_section_is_replaced() {
        let mut base = serde_json::json!({"frame": {"catalogTimeoutMs": 15000}, "tags": ["a", "b"]});
        merge_layer(&mut base, serde_json::json!({"tags": ["c"], "extra": {"k": 1}}));
        assert_eq!(base["tags"], serde_json::json!(["c"]));
        assert_eq!(base["extra"]["k"], 1);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_file_layer(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, KubeframeSettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"frame": {"catalogTimeoutMs": 2500}}"#).unwrap();

        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.frame.catalog_timeout_ms, 2500);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn malformed_file_is_a_syntax_error_with_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{\"frame\": ").unwrap();

        let err = load_file_layer(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Syntax { .. }));
        assert_eq!(err.path(), path);
    }

    #[test]
    fn string_timeout_is_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"frame": {"catalogTimeoutMs": "15s"}}"#).unwrap();

        let err = load_file_layer(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Schema { .. }));
    }

    #[test]
    fn directory_in_place_of_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file_layer(dir.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn overrides_apply() {
        let mut settings = KubeframeSettings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[
                ("KUBEFRAME_CATALOG_TIMEOUT_MS", "100"),
                ("KUBEFRAME_LOG_LEVEL", "debug"),
                ("KUBEFRAME_LOG_FILE", "/var/log/frame.log"),
                ("KUBEFRAME_LOG_JSON", "yes"),
            ]),
        );
        assert_eq!(settings.frame.catalog_timeout_ms, 100);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.file_path.as_deref(), Some("/var/log/frame.log"));
        assert!(settings.logging.json);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut settings = KubeframeSettings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[
                ("KUBEFRAME_CATALOG_TIMEOUT_MS", "forever"),
                ("KUBEFRAME_LOG_LEVEL", ""),
                ("KUBEFRAME_LOG_JSON", "maybe"),
            ]),
        );
        assert_eq!(settings, KubeframeSettings::default());
    }

    #[test]
    fn timeout_override_out_of_range_is_ignored() {
        let mut settings = KubeframeSettings::default();
        apply_overrides(
            &mut settings,
            lookup_from(&[("KUBEFRAME_CATALOG_TIMEOUT_MS", "3600001")]),
        );
        assert_eq!(settings.frame.catalog_timeout_ms, 15_000);
    }

    #[test]
    fn zero_timeout_is_allowed() {
        let mut settings = KubeframeSettings::default();
        apply_overrides(&mut settings, lookup_from(&[("KUBEFRAME_CATALOG_TIMEOUT_MS", "0")]));
        assert_eq!(settings.frame.catalog_timeout_ms, 0);
    }

    #[test]
    fn log_json_flag_spellings() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("OFF"), Some(false));
        assert_eq!(parse_bool("enabled"), None);
    }

    #[test]
    fn parse_u64_range_bounds() {
        assert_eq!(parse_u64_range("10", 0, 10), Some(10));
        assert_eq!(parse_u64_range("11", 0, 10), None);
        assert_eq!(parse_u64_range("-1", 0, 10), None);
    }
}
