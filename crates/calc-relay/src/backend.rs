//! The relay's link to the stream server.
//!
//! In `per_message` mode every forwarded message opens, uses and closes its
//! own stream connection, so the backend sees a fresh session each time. In
//! `persistent` mode the first message opens a connection that is kept for
//! the lifetime of the message client; if that connection turns out to be
//! dead it is replaced once for the same message.

use std::future::Future;
use std::time::Duration;

use calc_server::{ClientError, StreamClient};
use calc_settings::SessionMode;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::RelayConfig;

/// Failure of a backend round trip, phrased for the message client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Connection refused or host unreachable.
    #[error("Calculator server not running. Start the calculator server first.")]
    Unreachable,
    /// The round trip exceeded the configured bound.
    #[error("Calculator server timeout")]
    Timeout,
    /// The backend answered with something that is not a JSON response.
    #[error("Invalid response from calculator server")]
    InvalidResponse,
    /// Any other transport failure.
    #[error("Communication error: {0}")]
    Communication(String),
}

impl From<ClientError> for BackendError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Connect { .. } => Self::Unreachable,
            ClientError::Json(_) | ClientError::Oversized { .. } | ClientError::NotUtf8 => {
                Self::InvalidResponse
            }
            ClientError::Closed | ClientError::Frame(_) => Self::Communication(err.to_string()),
        }
    }
}

async fn bounded<T>(
    limit: Duration,
    round_trip: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, BackendError> {
    match tokio::time::timeout(limit, round_trip).await {
        Ok(result) => result.map_err(BackendError::from),
        Err(_) => Err(BackendError::Timeout),
    }
}

/// One message client's handle on the stream server.
#[derive(Debug)]
pub struct BackendLink {
    addr: String,
    timeout: Duration,
    mode: SessionMode,
    conn: Option<StreamClient>,
}

impl BackendLink {
    /// Link to `addr` with the given per-round-trip bound and mode.
    pub fn new(addr: impl Into<String>, timeout: Duration, mode: SessionMode) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            mode,
            conn: None,
        }
    }

    /// Link configured from the relay settings.
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.backend_addr(),
            config.backend_timeout,
            config.session_mode,
        )
    }

    /// Whether a persistent connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Forward one request and return the backend's answer verbatim.
    pub async fn forward(&mut self, request: &Value) -> Result<Value, BackendError> {
        match self.mode {
            SessionMode::PerMessage => self.one_shot(request).await,
            SessionMode::Persistent => self.reuse(request).await,
        }
    }

    async fn one_shot(&self, request: &Value) -> Result<Value, BackendError> {
        bounded(self.timeout, async {
            let mut client = StreamClient::connect(&self.addr).await?;
            let reply = client.send_value(request).await?;
            let _ = client.close().await;
            Ok::<_, ClientError>(reply)
        })
        .await
    }

    async fn reuse(&mut self, request: &Value) -> Result<Value, BackendError> {
        if let Some(mut client) = self.conn.take() {
            match bounded(self.timeout, client.send_value(request)).await {
                Ok(reply) => {
                    self.conn = Some(client);
                    return Ok(reply);
                }
                Err(BackendError::Communication(detail)) => {
                    debug!(%detail, "backend connection went stale, reconnecting");
                }
                Err(e) => return Err(e),
            }
        }

        let (client, reply) = bounded(self.timeout, async {
            let mut client = StreamClient::connect(&self.addr).await?;
            let reply = client.send_value(request).await?;
            Ok::<_, ClientError>((client, reply))
        })
        .await?;
        self.conn = Some(client);
        Ok(reply)
    }
}

/// Ping the backend once; used at startup to report reachability.
pub async fn probe(addr: &str, limit: Duration) -> Result<(), BackendError> {
    let reply = bounded(limit, async {
        let mut client = StreamClient::connect(addr).await?;
        let reply = client.ping().await?;
        let _ = client.close().await;
        Ok::<_, ClientError>(reply)
    })
    .await?;

    if reply.success {
        Ok(())
    } else {
        Err(BackendError::InvalidResponse)
    }
}
