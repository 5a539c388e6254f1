//! Relay configuration.

use std::time::Duration;

use calc_settings::{RelaySettings, SessionMode};

/// Configuration for the WebSocket relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` auto-assigns).
    pub port: u16,
    /// Stream server host.
    pub backend_host: String,
    /// Stream server port.
    pub backend_port: u16,
    /// Bound on one backend connect + write + read cycle.
    pub backend_timeout: Duration,
    /// Bound on the startup probe.
    pub probe_timeout: Duration,
    /// Interval between server-initiated WebSocket pings.
    pub ping_interval: Duration,
    /// Largest accepted inbound WebSocket message.
    pub max_message_bytes: usize,
    /// Backend connection strategy.
    pub session_mode: SessionMode,
}

impl RelayConfig {
    /// Listen address as `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Stream server address as `host:port`.
    pub fn backend_addr(&self) -> String {
        format!("{}:{}", self.backend_host, self.backend_port)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from(&RelaySettings::default())
    }
}

impl From<&RelaySettings> for RelayConfig {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            backend_host: settings.backend_host.clone(),
            backend_port: settings.backend_port,
            backend_timeout: Duration::from_millis(settings.backend_timeout_ms),
            probe_timeout: Duration::from_millis(settings.probe_timeout_ms),
            ping_interval: Duration::from_secs(settings.ping_interval_secs.max(1)),
            max_message_bytes: settings.max_message_bytes,
            session_mode: settings.session_mode,
        }
    }
}
