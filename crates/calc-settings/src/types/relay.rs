//! WebSocket relay settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the relay maps message clients onto stream connections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Fresh stream connection, and so fresh calculator state, per message.
    #[default]
    PerMessage,
    /// One stream connection per message client, kept until it detaches.
    Persistent,
}

impl SessionMode {
    /// Configuration name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PerMessage => "per_message",
            Self::Persistent => "persistent",
        }
    }
}

impl FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "per_message" => Ok(Self::PerMessage),
            "persistent" => Ok(Self::Persistent),
            other => Err(format!(
                "unknown session mode '{other}' (expected per_message or persistent)"
            )),
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WebSocket relay settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Stream server host the relay forwards to.
    pub backend_host: String,
    /// Stream server port the relay forwards to.
    pub backend_port: u16,
    /// Bound on one connect + write + read cycle, in milliseconds.
    pub backend_timeout_ms: u64,
    /// Bound on the startup reachability probe, in milliseconds.
    pub probe_timeout_ms: u64,
    /// Interval between server-initiated WebSocket pings, in seconds.
    pub ping_interval_secs: u64,
    /// Largest accepted inbound WebSocket message in bytes.
    pub max_message_bytes: usize,
    /// Backend connection strategy.
    pub session_mode: SessionMode,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            backend_host: "localhost".to_string(),
            backend_port: 8888,
            backend_timeout_ms: 10_000,
            probe_timeout_ms: 5_000,
            ping_interval_secs: 30,
            max_message_bytes: 64 * 1024,
            session_mode: SessionMode::PerMessage,
        }
    }
}
