//! Stream server configuration.

use calc_settings::ServerSettings;
use serde::{Deserialize, Serialize};

use crate::codec::DEFAULT_MAX_FRAME_BYTES;

/// Configuration for the stream server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"localhost"`).
    pub host: String,
    /// Port to bind (default `8888`; `0` auto-assigns).
    pub port: u16,
    /// Largest accepted request frame in bytes.
    pub max_frame_bytes: usize,
}

impl ServerConfig {
    /// `host:port` as given, for logs and error messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8888,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_frame_bytes: settings.max_frame_bytes,
        }
    }
}
