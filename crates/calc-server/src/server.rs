//! `CalcServer`: the TCP accept loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::connection::handle_connection;
use crate::shutdown::ShutdownCoordinator;

/// Pause after a failed `accept` so a persistent error (e.g. fd exhaustion)
/// does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The stream server.
pub struct CalcServer {
    config: ServerConfig,
    shutdown: Arc<ShutdownCoordinator>,
    connections: TaskTracker,
}

impl CalcServer {
    /// Create a server with its own shutdown coordinator.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_shutdown(config, Arc::new(ShutdownCoordinator::new()))
    }

    /// Create a server sharing an existing shutdown coordinator.
    pub fn with_shutdown(config: ServerConfig, shutdown: Arc<ShutdownCoordinator>) -> Self {
        Self {
            config,
            shutdown,
            connections: TaskTracker::new(),
        }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Number of connection handlers still running.
    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }

    /// Bind the configured address and start accepting in the background.
    ///
    /// Returns the bound address and a handle that completes once the
    /// accept loop has stopped and every connection handler has finished.
    pub async fn listen(&self) -> io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .inspect_err(|e| error!(address = %self.config.address(), error = %e, "bind failed"))?;
        let addr = listener.local_addr()?;
        info!(%addr, max_frame_bytes = self.config.max_frame_bytes, "stream server listening");

        let handle = tokio::spawn(accept_loop(
            listener,
            self.config.max_frame_bytes,
            self.shutdown.clone(),
            self.connections.clone(),
        ));
        Ok((addr, handle))
    }

    /// Stop accepting; open connections close after their current request.
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }
}

async fn accept_loop(
    listener: TcpListener,
    max_frame_bytes: usize,
    shutdown: Arc<ShutdownCoordinator>,
    connections: TaskTracker,
) {
    let token = shutdown.token();
    loop {
        let accepted = tokio::select! {
            biased;
            () = token.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                let _ = stream.set_nodelay(true);
                let _ = connections.spawn(handle_connection(
                    stream,
                    peer,
                    max_frame_bytes,
                    token.clone(),
                ));
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }

    drop(listener);
    connections.close();
    info!(open = connections.len(), "stream server stopped accepting, draining connections");
    connections.wait().await;
    info!("stream server stopped");
}
