//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the relay is serving.
    pub status: String,
    /// Seconds since the relay started.
    pub uptime_secs: u64,
    /// Attached WebSocket clients.
    pub connections: usize,
    /// Configured stream server address.
    pub backend: String,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, connections: usize, backend: &str) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        backend: backend.to_owned(),
    }
}
