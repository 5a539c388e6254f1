//! Process-wide stop signal for the stream server and the relay.
//!
//! Accept loops stop as soon as the token fires. Stream handlers look at it
//! only between requests, so an expression already being evaluated still
//! gets its reply; relay sessions answer with a Close frame.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long [`ShutdownCoordinator::graceful_shutdown`] waits by default.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared stop signal plus a bounded wait for listener tasks.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token handed to accept loops and connection handlers.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fire the stop signal. Calling it again is harmless.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fire the stop signal, then give the listener tasks behind `handles`
    /// up to `timeout` (default [`DEFAULT_SHUTDOWN_TIMEOUT`]) to drain.
    ///
    /// Returns `false` when some listener was still running at the deadline.
    pub async fn graceful_shutdown(
        &self,
        handles: Vec<JoinHandle<()>>,
        timeout: Option<Duration>,
    ) -> bool {
        let limit = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
        self.shutdown();
        info!(
            listeners = handles.len(),
            limit_secs = limit.as_secs(),
            "draining listeners"
        );

        match tokio::time::timeout(limit, futures::future::join_all(handles)).await {
            Ok(results) => {
                for err in results.into_iter().filter_map(Result::err) {
                    warn!(error = %err, "listener task ended abnormally");
                }
                true
            }
            Err(_) => {
                warn!(?limit, "listeners still busy at shutdown deadline");
                false
            }
        }
    }
}
