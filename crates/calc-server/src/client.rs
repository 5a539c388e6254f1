//! Async client for the stream protocol.
//!
//! Used by the relay to reach its backend and by the `calc console`
//! subcommand. One request is in flight at a time; each call writes a frame
//! and waits for exactly one response line.

use calc_core::{MemoryOp, Number, Request, Response};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::codec::{Frame, FrameError, JsonLinesCodec};

/// Largest response line the client will accept.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Errors from [`StreamClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// TCP connect failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Address that was dialed.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },
    /// Read or write on the established connection failed.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// The server answered with something that is not a JSON response.
    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),
    /// The server closed the connection before answering.
    #[error("connection closed by server")]
    Closed,
    /// The response line exceeded the configured limit.
    #[error("response exceeded {max} bytes")]
    Oversized {
        /// Configured limit.
        max: usize,
    },
    /// The response line was not UTF-8.
    #[error("response was not valid UTF-8")]
    NotUtf8,
}

/// A connected stream-protocol client.
pub struct StreamClient {
    framed: Framed<TcpStream, JsonLinesCodec>,
    addr: String,
}

impl StreamClient {
    /// Connect to `addr` (`host:port`).
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        let _ = stream.set_nodelay(true);
        debug!(%addr, "connected to stream server");
        Ok(Self {
            framed: Framed::new(
                stream,
                JsonLinesCodec::new_with_max_length(DEFAULT_MAX_RESPONSE_BYTES),
            ),
            addr: addr.to_string(),
        })
    }

    /// Replace the response size limit.
    #[must_use]
    pub fn with_max_response_bytes(mut self, max: usize) -> Self {
        *self.framed.codec_mut() = JsonLinesCodec::new_with_max_length(max);
        self
    }

    /// Address this client dialed.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send a raw JSON value and return the raw JSON answer.
    ///
    /// The value is forwarded as-is, so the server decides whether it is a
    /// valid request.
    pub async fn send_value(&mut self, value: &Value) -> Result<Value, ClientError> {
        self.framed.send(value).await?;
        let line = self.read_line().await?;
        Ok(serde_json::from_str(&line)?)
    }

    /// Send a typed request and decode the typed response.
    pub async fn request(&mut self, request: &Request) -> Result<Response, ClientError> {
        self.framed.send(request).await?;
        let line = self.read_line().await?;
        Ok(serde_json::from_str(&line)?)
    }

    /// `calculate` shortcut.
    pub async fn calculate(&mut self, expression: &str) -> Result<Response, ClientError> {
        self.request(&Request::Calculate {
            expression: expression.to_string(),
        })
        .await
    }

    /// `memory` shortcut.
    pub async fn memory(
        &mut self,
        operation: MemoryOp,
        value: Option<Number>,
    ) -> Result<Response, ClientError> {
        self.request(&Request::Memory { operation, value }).await
    }

    /// `ping` shortcut.
    pub async fn ping(&mut self) -> Result<Response, ClientError> {
        self.request(&Request::Ping).await
    }

    /// Flush and shut down the write side.
    pub async fn close(self) -> Result<(), ClientError> {
        let mut stream = self.framed.into_inner();
        stream.shutdown().await.map_err(FrameError::from)?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, ClientError> {
        match self.framed.next().await {
            None => Err(ClientError::Closed),
            Some(Err(e)) => Err(e.into()),
            Some(Ok(Frame::Line(line))) => Ok(line),
            Some(Ok(Frame::Oversized)) => Err(ClientError::Oversized {
                max: self.framed.codec().max_length(),
            }),
            Some(Ok(Frame::NotUtf8)) => Err(ClientError::NotUtf8),
        }
    }
}

impl std::fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamClient").field("addr", &self.addr).finish_non_exhaustive()
    }
}
