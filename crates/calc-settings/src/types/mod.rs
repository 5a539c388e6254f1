//! Settings type definitions.
//!
//! Every type uses `#[serde(rename_all = "camelCase", default)]`, so a
//! partial JSON file only needs the keys it changes.

mod logging;
mod relay;
mod server;

pub use logging::*;
pub use relay::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9999 },
///   "relay": { "sessionMode": "persistent" },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalcSettings {
    /// Stream server settings.
    pub server: ServerSettings,
    /// WebSocket relay settings.
    pub relay: RelaySettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl CalcSettings {
    /// Reject combinations that cannot work at runtime.
    pub fn validate(&self) -> crate::Result<()> {
        if self.relay.backend_port == 0 {
            return Err(crate::SettingsError::InvalidValue(
                "relay.backendPort must be non-zero".into(),
            ));
        }
        if self.server.max_frame_bytes == 0 {
            return Err(crate::SettingsError::InvalidValue(
                "server.maxFrameBytes must be non-zero".into(),
            ));
        }
        if self.relay.backend_timeout_ms == 0 {
            return Err(crate::SettingsError::InvalidValue(
                "relay.backendTimeoutMs must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
