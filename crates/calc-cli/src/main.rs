//! # calc
//!
//! Scientific calculator service binary: runs the stream server, the
//! WebSocket relay, or both, and offers an interactive console client.

#![deny(unsafe_code)]

mod console;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use calc_relay::{RelayConfig, RelayServer};
use calc_server::{CalcServer, ServerConfig, ShutdownCoordinator};
use calc_settings::{
    CalcSettings, LogLevel, LoggingSettings, RelaySettings, ServerSettings, SessionMode,
};
use clap::{Args, Parser, Subcommand};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Scientific calculator stream server and WebSocket relay.
#[derive(Parser, Debug)]
#[command(name = "calc", version, about)]
struct Cli {
    /// Settings file (default `~/.calc/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error).
    #[arg(long, global = true, value_parser = parse_log_level)]
    log_level: Option<LogLevel>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the line-delimited JSON stream server.
    Server(ServerArgs),
    /// Run the WebSocket relay in front of a stream server.
    Relay(RelayArgs),
    /// Run the stream server and a relay targeting it.
    Run(RunArgs),
    /// Interactive console against a stream server.
    Console(ConsoleArgs),
}

#[derive(Args, Debug, Default)]
struct ServerArgs {
    /// Host to bind.
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,
    /// Largest accepted request line in bytes.
    #[arg(long)]
    max_frame_bytes: Option<usize>,
}

#[derive(Args, Debug, Default)]
struct RelayArgs {
    /// Host to bind.
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,
    /// Stream server host.
    #[arg(long)]
    backend_host: Option<String>,
    /// Stream server port.
    #[arg(long)]
    backend_port: Option<u16>,
    /// Bound on one backend round trip, in milliseconds.
    #[arg(long)]
    backend_timeout_ms: Option<u64>,
    /// `per_message` (fresh calculator per message) or `persistent`.
    #[arg(long)]
    session_mode: Option<SessionMode>,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Host both listeners bind to.
    #[arg(long)]
    host: Option<String>,
    /// Stream server port.
    #[arg(long)]
    server_port: Option<u16>,
    /// Relay port.
    #[arg(long)]
    relay_port: Option<u16>,
    /// Relay session mode.
    #[arg(long)]
    session_mode: Option<SessionMode>,
}

#[derive(Args, Debug, Default)]
struct ConsoleArgs {
    /// Stream server host.
    #[arg(long)]
    host: Option<String>,
    /// Stream server port.
    #[arg(long)]
    port: Option<u16>,
}

fn parse_log_level(value: &str) -> Result<LogLevel, String> {
    LogLevel::parse(value).ok_or_else(|| format!("unknown log level '{value}'"))
}

impl Cli {
    fn apply_logging(&self, logging: &mut LoggingSettings) {
        if let Some(level) = self.log_level {
            logging.level = level;
        }
        if self.log_json {
            logging.json = true;
        }
    }
}

impl ServerArgs {
    fn apply(&self, server: &mut ServerSettings) {
        if let Some(host) = &self.host {
            server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            server.port = port;
        }
        if let Some(max) = self.max_frame_bytes {
            server.max_frame_bytes = max;
        }
    }
}

impl RelayArgs {
    fn apply(&self, relay: &mut RelaySettings) {
        if let Some(host) = &self.host {
            relay.host.clone_from(host);
        }
        if let Some(port) = self.port {
            relay.port = port;
        }
        if let Some(host) = &self.backend_host {
            relay.backend_host.clone_from(host);
        }
        if let Some(port) = self.backend_port {
            relay.backend_port = port;
        }
        if let Some(ms) = self.backend_timeout_ms {
            relay.backend_timeout_ms = ms;
        }
        if let Some(mode) = self.session_mode {
            relay.session_mode = mode;
        }
    }
}

impl RunArgs {
    fn apply(&self, settings: &mut CalcSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
            settings.relay.host.clone_from(host);
        }
        if let Some(port) = self.server_port {
            settings.server.port = port;
        }
        if let Some(port) = self.relay_port {
            settings.relay.port = port;
        }
        if let Some(mode) = self.session_mode {
            settings.relay.session_mode = mode;
        }
    }
}

impl ConsoleArgs {
    fn address(&self, server: &ServerSettings) -> String {
        format!(
            "{}:{}",
            self.host.as_deref().unwrap_or(&server.host),
            self.port.unwrap_or(server.port)
        )
    }
}

fn load_settings(cli: &Cli) -> Result<CalcSettings> {
    let mut settings = match &cli.settings {
        Some(path) => calc_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => calc_settings::load_settings().context("Failed to load settings")?,
    };
    cli.apply_logging(&mut settings.logging);
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli)?;
    calc_core::logging::init_subscriber(
        settings.logging.level.as_filter_str(),
        settings.logging.json,
    );

    match &cli.command {
        Command::Server(args) => args.apply(&mut settings.server),
        Command::Relay(args) => args.apply(&mut settings.relay),
        Command::Run(args) => args.apply(&mut settings),
        Command::Console(_) => {}
    }
    settings.validate().context("Invalid settings")?;

    match &cli.command {
        Command::Server(_) => run_server(&settings.server).await,
        Command::Relay(_) => run_relay(&settings.relay).await,
        Command::Run(_) => run_both(&settings).await,
        Command::Console(args) => console::run(&args.address(&settings.server)).await,
    }
}

async fn run_server(settings: &ServerSettings) -> Result<()> {
    let coordinator = Arc::new(ShutdownCoordinator::new());
    let server = CalcServer::with_shutdown(ServerConfig::from(settings), coordinator.clone());
    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to bind stream server")?;
    info!("calculator server listening on {addr}");

    wait_for_shutdown(&coordinator, vec![handle]).await
}

async fn run_relay(settings: &RelaySettings) -> Result<()> {
    let coordinator = Arc::new(ShutdownCoordinator::new());
    let relay = RelayServer::with_shutdown(RelayConfig::from(settings), coordinator.clone());
    let _ = relay.probe_backend().await;
    let (addr, handle) = relay.listen().await.context("Failed to bind relay")?;
    info!("relay listening on ws://{addr}/ws");

    wait_for_shutdown(&coordinator, vec![handle]).await
}

async fn run_both(settings: &CalcSettings) -> Result<()> {
    let coordinator = Arc::new(ShutdownCoordinator::new());

    let server =
        CalcServer::with_shutdown(ServerConfig::from(&settings.server), coordinator.clone());
    let (server_addr, server_handle) = server
        .listen()
        .await
        .context("Failed to bind stream server")?;
    info!("calculator server listening on {server_addr}");

    let relay = RelayServer::with_shutdown(
        relay_config_for(&settings.relay, server_addr),
        coordinator.clone(),
    );
    let _ = relay.probe_backend().await;
    let (relay_addr, relay_handle) = match relay.listen().await {
        Ok(bound) => bound,
        Err(e) => {
            coordinator.shutdown();
            let _ = server_handle.await;
            return Err(e).context("Failed to bind relay");
        }
    };
    info!("relay listening on ws://{relay_addr}/ws");

    wait_for_shutdown(&coordinator, vec![server_handle, relay_handle]).await
}

/// Relay settings pointed at an in-process stream server.
fn relay_config_for(settings: &RelaySettings, backend: SocketAddr) -> RelayConfig {
    RelayConfig {
        backend_host: backend.ip().to_string(),
        backend_port: backend.port(),
        ..RelayConfig::from(settings)
    }
}

async fn wait_for_shutdown(
    coordinator: &ShutdownCoordinator,
    handles: Vec<JoinHandle<()>>,
) -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    info!("shutting down");
    if !coordinator.graceful_shutdown(handles, None).await {
        warn!("some connections did not finish before the shutdown timeout");
    }
    info!("shutdown complete");
    Ok(())
}
