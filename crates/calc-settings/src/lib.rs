//! # calc-settings
//!
//! Layered configuration for the calculator server and relay.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`CalcSettings::default()`]
//! 2. **User file**: `~/.calc/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `CALC_*` overrides
//!
//! Command-line flags of the `calc` binary are applied on top by the caller.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_defaults() {
        let settings = CalcSettings::default();
        assert_eq!(settings.server.host, "localhost");
        assert_eq!(settings.server.port, 8888);
        assert_eq!(settings.server.max_frame_bytes, 65_536);
        assert_eq!(settings.relay.host, "localhost");
        assert_eq!(settings.relay.port, 8080);
        assert_eq!(settings.relay.backend_host, "localhost");
        assert_eq!(settings.relay.backend_port, 8888);
        assert_eq!(settings.relay.backend_timeout_ms, 10_000);
        assert_eq!(settings.relay.probe_timeout_ms, 5_000);
        assert_eq!(settings.relay.ping_interval_secs, 30);
        assert_eq!(settings.relay.session_mode, SessionMode::PerMessage);
        assert_eq!(settings.logging.level, LogLevel::Info);
        assert!(!settings.logging.json);
    }
}
