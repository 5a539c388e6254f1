//! `RelayServer`: axum HTTP + WebSocket front end.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use calc_server::ShutdownCoordinator;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::backend::{self, BackendLink};
use crate::config::RelayConfig;
use crate::health::{self, HealthResponse};
use crate::registry::ClientRegistry;
use crate::session::run_relay_session;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Relay configuration.
    pub config: Arc<RelayConfig>,
    /// Attached clients.
    pub registry: Arc<ClientRegistry>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Tracks running client sessions.
    pub sessions: TaskTracker,
    /// When the relay started.
    pub start_time: Instant,
}

/// The WebSocket relay.
pub struct RelayServer {
    state: AppState,
}

impl RelayServer {
    /// Create a relay with its own shutdown coordinator.
    pub fn new(config: RelayConfig) -> Self {
        Self::with_shutdown(config, Arc::new(ShutdownCoordinator::new()))
    }

    /// Create a relay sharing an existing shutdown coordinator.
    pub fn with_shutdown(config: RelayConfig, shutdown: Arc<ShutdownCoordinator>) -> Self {
        Self {
            state: AppState {
                config: Arc::new(config),
                registry: Arc::new(ClientRegistry::new()),
                shutdown,
                sessions: TaskTracker::new(),
                start_time: Instant::now(),
            },
        }
    }

    /// Build the axum router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(ws_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.state.config
    }

    /// Get the client registry.
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.state.registry
    }

    /// Get the shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Stop accepting and close attached clients between messages.
    pub fn shutdown(&self) {
        self.state.shutdown.shutdown();
    }

    /// Ping the backend once and log the outcome. An unreachable backend
    /// is reported, not treated as fatal.
    pub async fn probe_backend(&self) -> bool {
        let addr = self.state.config.backend_addr();
        match backend::probe(&addr, self.state.config.probe_timeout).await {
            Ok(()) => {
                info!(backend = %addr, "calculator server reachable");
                true
            }
            Err(e) => {
                warn!(backend = %addr, error = %e, "calculator server not reachable yet");
                false
            }
        }
    }

    /// Bind the configured address and start serving in the background.
    ///
    /// The returned handle completes after shutdown once every client
    /// session has ended.
    pub async fn listen(&self) -> io::Result<(SocketAddr, JoinHandle<()>)> {
        let config = &self.state.config;
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .inspect_err(|e| error!(address = %config.address(), error = %e, "bind failed"))?;
        let addr = listener.local_addr()?;
        info!(
            %addr,
            backend = %config.backend_addr(),
            session_mode = %config.session_mode,
            "relay listening"
        );

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let token = self.state.shutdown.token();
        let sessions = self.state.sessions.clone();

        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "relay server error");
            }
            sessions.close();
            sessions.wait().await;
            info!("relay stopped");
        });
        Ok((addr, handle))
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.registry.len(),
        &state.config.backend_addr(),
    ))
}

/// GET / and GET /ws: upgrade and hand the socket to a relay session.
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let AppState {
        config,
        registry,
        shutdown,
        sessions,
        ..
    } = state;

    // The configured cap is enforced per message with an in-band reply;
    // the WebSocket layer keeps only its own default limits.
    ws.on_upgrade(move |socket| {
        let client_id = registry.register(peer);
        sessions.track_future(run_relay_session(
            socket,
            client_id,
            peer,
            BackendLink::from_config(&config),
            config.clone(),
            registry.clone(),
            shutdown.token(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn make_server() -> RelayServer {
        RelayServer::new(RelayConfig::default())
    }

    async fn fetch(server: &RelayServer, uri: &str) -> (StatusCode, axum::body::Bytes) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let server = make_server();
        let (status, body) = fetch(&server, "/health").await;
        assert_eq!(status, StatusCode::OK);

        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["backend"], "localhost:8888");
    }

    #[tokio::test]
    async fn health_counts_registered_clients() {
        let server = make_server();
        let _id = server
            .registry()
            .register(SocketAddr::from(([127, 0, 0, 1], 1)));
        let (_, body) = fetch(&server, "/health").await;
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["connections"], 1);
    }

    #[tokio::test]
    async fn websocket_routes_exist() {
        let server = make_server();
        for uri in ["/", "/ws"] {
            let (status, _) = fetch(&server, uri).await;
            assert_ne!(status, StatusCode::NOT_FOUND, "{uri}");
            assert!(status.is_client_error() || status.is_server_error(), "{uri}");
        }
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (status, _) = fetch(&make_server(), "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn shutdown_propagates_to_coordinator() {
        let server = make_server();
        assert!(!server.shutdown_coordinator().is_shutting_down());
        server.shutdown();
        assert!(server.shutdown_coordinator().is_shutting_down());
    }

    #[tokio::test]
    async fn probe_against_closed_port_is_false() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let server = RelayServer::new(RelayConfig {
            backend_host: "127.0.0.1".into(),
            backend_port: port,
            ..RelayConfig::default()
        });
        assert!(!server.probe_backend().await);
    }
}
