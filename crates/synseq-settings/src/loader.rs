//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SynseqSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::SynseqSettings;

/// Resolve the path to the settings file (`~/.synseq/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".synseq").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SynseqSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or the result fails validation, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<SynseqSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Like [`load_settings_from_path`], but the file must exist.
///
/// For paths given explicitly by the operator, where falling back to the
/// compiled defaults would run the default pipelines against the default
/// workspace.
pub fn load_required_settings(path: &Path) -> Result<SynseqSettings> {
    if !path.is_file() {
        return Err(SettingsError::NotFound(path.to_path_buf()));
    }
    load_settings_from_path(path)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn read_settings_file(path: &Path) -> Result<SynseqSettings> {
    let defaults = serde_json::to_value(SynseqSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut SynseqSettings) {
    apply_env_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides using `lookup` as the environment.
///
/// Invalid numeric values are ignored with a warning (falling back to
/// file/default). Empty strings count as unset.
pub fn apply_env_overrides_from<F>(settings: &mut SynseqSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let number = |name: &str, min: u64, max: u64| {
        let val = lookup(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid numeric env var, ignoring");
        }
        result
    };

    // ── Endpoint ────────────────────────────────────────────────────
    if let Some(v) = string("SYNSEQ_WORKSPACE") {
        settings.workspace = v;
    }
    if let Some(v) = string("SYNSEQ_API_VERSION") {
        settings.api_version = v;
    }
    if let Some(v) = string("SYNSEQ_ENDPOINT") {
        settings.endpoint = Some(v);
    }

    // ── Launch / poll ───────────────────────────────────────────────
    if let Some(v) = number("SYNSEQ_LAUNCH_MAX_ATTEMPTS", 1, 100) {
        settings.launch.max_attempts = u32::try_from(v).unwrap_or(u32::MAX);
    }
    if let Some(v) = number("SYNSEQ_LAUNCH_DELAY_MS", 0, 3_600_000) {
        settings.launch.delay_ms = v;
    }
    if let Some(v) = number("SYNSEQ_POLL_INTERVAL_MS", 1, 3_600_000) {
        settings.poll.interval_ms = v;
    }
    if let Some(v) = number("SYNSEQ_MAX_WAIT_MS", 1, u64::MAX) {
        settings.poll.max_wait_ms = Some(v);
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = string("SYNSEQ_LOG_LEVEL") {
        settings.logging.level = v;
    }

    // ── Auth ────────────────────────────────────────────────────────
    if let Some(v) = string("SYNSEQ_ACCESS_TOKEN") {
        settings.auth.access_token = Some(v);
    }
    if let Some(v) = string("AZURE_TENANT_ID") {
        settings.auth.tenant_id = v;
    }
    if let Some(v) = string("AZURE_CLIENT_ID") {
        settings.auth.client_id = v;
    }
    if let Some(v) = string("AZURE_CLIENT_SECRET") {
        settings.auth.client_secret = Some(v);
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
