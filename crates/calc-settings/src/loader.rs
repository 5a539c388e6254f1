//! Layered settings: compiled defaults, then `~/.calc/settings.json`, then
//! `CALC_*` variables. Command-line flags are applied later by the binary.
//!
//! The file is merged key by key into the serialized defaults, so a file
//! that only sets `{"relay": {"port": 9000}}` keeps every other default.
//! `null` in the file leaves the default in place.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{CalcSettings, LogLevel, SessionMode};

/// Resolve the path to the settings file (`~/.calc/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".calc").join("settings.json")
}

/// [`load_settings_from_path`] on [`settings_path`].
pub fn load_settings() -> Result<CalcSettings> {
    load_settings_from_path(&settings_path())
}

/// Defaults merged with `path` (a missing file is fine, malformed JSON is
/// not), then environment overrides, then validation.
pub fn load_settings_from_path(path: &Path) -> Result<CalcSettings> {
    let mut settings = load_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn load_file(path: &Path) -> Result<CalcSettings> {
    let defaults = serde_json::to_value(CalcSettings::default())?;

    if !path.exists() {
        debug!(?path, "no settings file");
        return Ok(serde_json::from_value(defaults)?);
    }

    debug!(?path, "reading settings file");
    let file: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    Ok(serde_json::from_value(deep_merge(defaults, file))?)
}

/// Overlay `upper` onto `base`: objects merge per key, anything else in
/// `upper` replaces `base` wholesale, and `null` in `upper` is skipped.
pub fn deep_merge(base: Value, upper: Value) -> Value {
    let (mut base, upper) = match (base, upper) {
        (Value::Object(base), Value::Object(upper)) => (base, upper),
        (_, upper) => return upper,
    };
    for (key, value) in upper.into_iter().filter(|(_, v)| !v.is_null()) {
        let merged = match base.remove(&key) {
            Some(existing) => deep_merge(existing, value),
            None => value,
        };
        let _ = base.insert(key, merged);
    }
    Value::Object(base)
}

/// Apply `CALC_*` environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (file/default value wins).
pub fn apply_env_overrides(settings: &mut CalcSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
///
/// Split out from [`apply_env_overrides`] so the mapping is testable without
/// mutating the process environment.
pub fn apply_overrides_from(settings: &mut CalcSettings, var: impl Fn(&str) -> Option<String>) {
    let env = EnvSource { var };

    // ── Stream server ───────────────────────────────────────────────
    if let Some(v) = env.string("CALC_SERVER_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.ranged("CALC_SERVER_PORT", 0u16, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = env.ranged("CALC_MAX_FRAME_BYTES", 64usize, 64 * 1024 * 1024) {
        settings.server.max_frame_bytes = v;
    }

    // ── Relay ───────────────────────────────────────────────────────
    if let Some(v) = env.string("CALC_RELAY_HOST") {
        settings.relay.host = v;
    }
    if let Some(v) = env.ranged("CALC_RELAY_PORT", 0u16, 65535) {
        settings.relay.port = v;
    }
    if let Some(v) = env.string("CALC_BACKEND_HOST") {
        settings.relay.backend_host = v;
    }
    if let Some(v) = env.ranged("CALC_BACKEND_PORT", 1u16, 65535) {
        settings.relay.backend_port = v;
    }
    if let Some(v) = env.ranged("CALC_BACKEND_TIMEOUT_MS", 1u64, 600_000) {
        settings.relay.backend_timeout_ms = v;
    }
    if let Some(v) = env.parsed("CALC_RELAY_SESSION_MODE", |s| s.parse::<SessionMode>().ok()) {
        settings.relay.session_mode = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.parsed("CALC_LOG_LEVEL", LogLevel::parse) {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("CALC_LOG_JSON", parse_bool) {
        settings.logging.json = v;
    }
}

// ── Value parsing ───────────────────────────────────────────────────────────

/// `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`, any case.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `val` and keep it only if it lies in `min..=max`.
pub fn parse_in_range<T>(val: &str, min: T, max: T) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    val.parse().ok().filter(|n| (min..=max).contains(n))
}

// ── Variable readers ────────────────────────────────────────────────────────

struct EnvSource<F> {
    var: F,
}

impl<F: Fn(&str) -> Option<String>> EnvSource<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.var)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }

    fn ranged<T: FromStr + PartialOrd + Copy>(&self, name: &str, min: T, max: T) -> Option<T> {
        self.parsed(name, |v| parse_in_range(v, min, max))
    }
}
