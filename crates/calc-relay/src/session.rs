//! One attached WebSocket client, from upgrade to detach.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use calc_core::Response;
use chrono::Utc;
use futures::{Sink, SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::backend::BackendLink;
use crate::config::RelayConfig;
use crate::handler::handle_payload;
use crate::registry::{ClientId, ClientRegistry};

/// Run the relay loop for one client.
///
/// Sends the greeting, then answers each text or binary message with exactly
/// one text reply, including messages that are too large or not UTF-8.
/// Pings go out every `config.ping_interval`. When `shutdown` fires between
/// messages the client gets a Close frame.
#[instrument(skip_all, fields(client_id = %client_id, peer = %peer))]
pub async fn run_relay_session(
    ws: WebSocket,
    client_id: ClientId,
    peer: SocketAddr,
    mut link: BackendLink,
    config: Arc<RelayConfig>,
    registry: Arc<ClientRegistry>,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    info!("client attached");

    let mut relayed = 0u64;
    if send_json(&mut ws_tx, &Response::greeting()).await {
        let mut ping = tokio::time::interval(config.ping_interval);
        // Skip the immediate first tick
        let _ = ping.tick().await;

        loop {
            let msg = tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("closing client for shutdown");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
                _ = ping.tick() => {
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                    continue;
                }
                msg = ws_rx.next() => msg,
            };

            let max = config.max_message_bytes;
            let reply = match msg {
                None => break,
                Some(Err(e)) => {
                    warn!(error = %e, "websocket error");
                    break;
                }
                Some(Ok(Message::Text(t))) => handle_payload(t.as_bytes(), max, &mut link).await,
                Some(Ok(Message::Binary(data))) => handle_payload(&data, max, &mut link).await,
                Some(Ok(Message::Close(_))) => {
                    debug!("client sent close frame");
                    break;
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            };

            if ws_tx.send(Message::Text(reply.to_string().into())).await.is_err() {
                debug!("client went away before reply");
                break;
            }
            relayed += 1;
        }
    }

    if let Some(client) = registry.unregister(&client_id) {
        let attached_secs = (Utc::now() - client.connected_at).num_seconds();
        info!(relayed, attached_secs, "client detached");
    }
}

async fn send_json<S>(ws_tx: &mut S, response: &Response) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(response) {
        Ok(json) => ws_tx.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "failed to encode message");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    // The loop itself needs a real upgraded socket; it is covered by
    // tests/integration.rs. This checks the greeting it sends.
    use calc_core::Response;

    #[test]
    fn greeting_shape() {
        let greeting = serde_json::to_value(Response::greeting()).unwrap();
        assert_eq!(greeting["success"], true);
        assert_eq!(greeting["type"], "connection");
        assert_eq!(greeting["message"], "Connected to calculator server");
    }
}
