//! End-to-end tests: real stream server, real relay, real WebSocket clients.

use std::net::SocketAddr;
use std::time::Duration;

use calc_relay::{RelayConfig, RelayServer};
use calc_server::{CalcServer, ServerConfig};
use calc_settings::SessionMode;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn boot_backend() -> (SocketAddr, CalcServer) {
    let server = CalcServer::new(ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..ServerConfig::default()
    });
    let (addr, _handle) = server.listen().await.unwrap();
    (addr, server)
}

async fn boot_relay(backend: SocketAddr, mode: SessionMode) -> (SocketAddr, RelayServer) {
    let relay = RelayServer::new(RelayConfig {
        host: "127.0.0.1".into(),
        port: 0,
        backend_host: backend.ip().to_string(),
        backend_port: backend.port(),
        session_mode: mode,
        ..RelayConfig::default()
    });
    let (addr, _handle) = relay.listen().await.unwrap();
    (addr, relay)
}

async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn next_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next()).await.unwrap().unwrap().unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Connect and consume the greeting.
async fn attach(relay: SocketAddr, path: &str) -> WsStream {
    let (mut ws, _) = connect_async(format!("ws://{relay}{path}")).await.unwrap();
    let greeting = next_json(&mut ws).await;
    assert_eq!(
        greeting,
        json!({"success": true, "message": "Connected to calculator server", "type": "connection"})
    );
    ws
}

async fn ask(ws: &mut WsStream, request: Value) -> Value {
    ws.send(Message::Text(request.to_string().into())).await.unwrap();
    next_json(ws).await
}

// ── Relaying ──

#[tokio::test]
async fn greeting_then_ping() {
    let (backend, _server) = boot_backend().await;
    let (relay, _relay) = boot_relay(backend, SessionMode::PerMessage).await;

    let mut ws = attach(relay, "/ws").await;
    let reply = ask(&mut ws, json!({"command": "ping"})).await;
    assert_eq!(reply, json!({"success": true, "message": "Server is running"}));
}

#[tokio::test]
async fn root_path_also_upgrades() {
    let (backend, _server) = boot_backend().await;
    let (relay, _relay) = boot_relay(backend, SessionMode::PerMessage).await;

    let mut ws = attach(relay, "/").await;
    let reply = ask(&mut ws, json!({"command": "calculate", "expression": "2^8"})).await;
    assert_eq!(reply["result"], 256);
    assert_eq!(reply["expression"], "2**8");
}

#[tokio::test]
async fn binary_utf8_frames_are_relayed() {
    let (backend, _server) = boot_backend().await;
    let (relay, _relay) = boot_relay(backend, SessionMode::PerMessage).await;

    let mut ws = attach(relay, "/ws").await;
    ws.send(Message::Binary(br#"{"command":"ping"}"#.to_vec().into()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut ws).await["success"], true);
}

#[tokio::test]
async fn non_utf8_binary_frame_gets_error_reply() {
    let (backend, _server) = boot_backend().await;
    let (relay, _relay) = boot_relay(backend, SessionMode::PerMessage).await;

    let mut ws = attach(relay, "/ws").await;
    ws.send(Message::Binary(vec![0xff, 0xfe, b'{'].into()))
        .await
        .unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["success"], false);
    assert!(
        reply["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid JSON format: ")
    );

    let reply = ask(&mut ws, json!({"command": "ping"})).await;
    assert_eq!(reply["success"], true);
}

#[tokio::test]
async fn oversized_message_gets_error_reply_and_client_stays() {
    let (backend, _server) = boot_backend().await;
    let relay = RelayServer::new(RelayConfig {
        host: "127.0.0.1".into(),
        port: 0,
        backend_host: backend.ip().to_string(),
        backend_port: backend.port(),
        max_message_bytes: 64,
        ..RelayConfig::default()
    });
    let (addr, _handle) = relay.listen().await.unwrap();

    let mut ws = attach(addr, "/ws").await;
    let expression = "1+".repeat(100) + "1";
    let reply = ask(&mut ws, json!({"command": "calculate", "expression": expression})).await;
    assert_eq!(
        reply,
        json!({"success": false, "error": "Request too large (max 64 bytes)"})
    );

    let reply = ask(&mut ws, json!({"command": "ping"})).await;
    assert_eq!(reply["message"], "Server is running");
}

#[tokio::test]
async fn concurrent_clients_get_their_own_replies() {
    let (backend, _server) = boot_backend().await;
    let (relay, _relay) = boot_relay(backend, SessionMode::PerMessage).await;

    let tasks: Vec<_> = (0..10i64)
        .map(|i| {
            tokio::spawn(async move {
                let mut ws = attach(relay, "/ws").await;
                let reply = ask(
                    &mut ws,
                    json!({"command": "calculate", "expression": format!("{i} + 1000")}),
                )
                .await;
                assert_eq!(reply["result"], i + 1000);
            })
        })
        .collect();

    for task in tasks {
        timeout(TIMEOUT, task).await.unwrap().unwrap();
    }
}

// ── Errors ──

#[tokio::test]
async fn malformed_message_keeps_client_attached() {
    let (backend, _server) = boot_backend().await;
    let (relay, _relay) = boot_relay(backend, SessionMode::PerMessage).await;

    let mut ws = attach(relay, "/ws").await;
    ws.send(Message::Text("{oops".into())).await.unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["success"], false);
    assert!(
        reply["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid JSON format: ")
    );

    let reply = ask(&mut ws, json!({"command": "ping"})).await;
    assert_eq!(reply["success"], true);
}

#[tokio::test]
async fn invalid_request_is_answered_by_backend() {
    let (backend, _server) = boot_backend().await;
    let (relay, _relay) = boot_relay(backend, SessionMode::PerMessage).await;

    let mut ws = attach(relay, "/ws").await;
    let reply = ask(&mut ws, json!({"command": "explode"})).await;
    assert_eq!(reply, json!({"success": false, "error": "Unknown command"}));
}

#[tokio::test]
async fn unreachable_backend_is_reported_in_band() {
    let (relay, _relay) = boot_relay(closed_port().await, SessionMode::PerMessage).await;

    let mut ws = attach(relay, "/ws").await;
    let reply = ask(&mut ws, json!({"command": "ping"})).await;
    assert_eq!(
        reply,
        json!({
            "success": false,
            "error": "Calculator server not running. Start the calculator server first."
        })
    );
}

#[tokio::test]
async fn silent_backend_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = listener.local_addr().unwrap();
    let _ = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let relay = RelayServer::new(RelayConfig {
        host: "127.0.0.1".into(),
        port: 0,
        backend_host: backend.ip().to_string(),
        backend_port: backend.port(),
        backend_timeout: Duration::from_millis(200),
        ..RelayConfig::default()
    });
    let (addr, _handle) = relay.listen().await.unwrap();

    let mut ws = attach(addr, "/ws").await;
    let reply = ask(&mut ws, json!({"command": "ping"})).await;
    assert_eq!(reply["error"], "Calculator server timeout");
}

// ── Session modes ──

#[tokio::test]
async fn per_message_mode_has_no_memory_continuity() {
    let (backend, _server) = boot_backend().await;
    let (relay, _relay) = boot_relay(backend, SessionMode::PerMessage).await;

    let mut ws = attach(relay, "/ws").await;
    let _ = ask(&mut ws, json!({"command": "memory", "operation": "store", "value": 5})).await;
    let reply = ask(&mut ws, json!({"command": "memory", "operation": "recall"})).await;
    assert_eq!(reply["memory"], 0);
}

#[tokio::test]
async fn persistent_mode_keeps_memory_per_client() {
    let (backend, _server) = boot_backend().await;
    let (relay, _relay) = boot_relay(backend, SessionMode::Persistent).await;

    let mut a = attach(relay, "/ws").await;
    let mut b = attach(relay, "/ws").await;

    let _ = ask(&mut a, json!({"command": "memory", "operation": "store", "value": 5})).await;
    let reply = ask(&mut a, json!({"command": "memory", "operation": "add", "value": 3})).await;
    assert_eq!(reply["memory"], 8);

    let reply = ask(&mut b, json!({"command": "memory", "operation": "recall"})).await;
    assert_eq!(reply["memory"], 0);
}

// ── Lifecycle ──

#[tokio::test]
async fn health_reports_attached_clients() {
    let (backend, _server) = boot_backend().await;
    let (relay, server) = boot_relay(backend, SessionMode::PerMessage).await;

    let _ws = attach(relay, "/ws").await;
    assert_eq!(server.registry().len(), 1);

    let mut stream = TcpStream::connect(relay).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut raw = String::new();
    let _ = timeout(TIMEOUT, stream.read_to_string(&mut raw))
        .await
        .unwrap()
        .unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    assert!(head.starts_with("HTTP/1.1 200"), "{head}");
    let health: Value = serde_json::from_str(body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["connections"], 1);
    assert_eq!(health["backend"], backend.to_string());
}

#[tokio::test]
async fn detached_clients_leave_the_registry() {
    let (backend, _server) = boot_backend().await;
    let (relay, server) = boot_relay(backend, SessionMode::PerMessage).await;

    let mut ws = attach(relay, "/ws").await;
    assert_eq!(server.registry().len(), 1);
    ws.close(None).await.unwrap();

    timeout(TIMEOUT, async {
        while !server.registry().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn shutdown_sends_close_frame() {
    let (backend, _server) = boot_backend().await;
    let relay = RelayServer::new(RelayConfig {
        host: "127.0.0.1".into(),
        port: 0,
        backend_host: backend.ip().to_string(),
        backend_port: backend.port(),
        ..RelayConfig::default()
    });
    let (addr, handle) = relay.listen().await.unwrap();

    let mut ws = attach(addr, "/ws").await;
    relay.shutdown();

    let closed = timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok());
    drop(ws);
    timeout(TIMEOUT, handle).await.unwrap().unwrap();
}
