//! Turn one inbound WebSocket message into one outbound reply.

use calc_core::RequestError;
use serde_json::{Value, json};
use tracing::debug;

use crate::backend::BackendLink;

/// Failure reply in the shape of a stream-protocol error response.
pub fn failure(message: impl Into<String>) -> Value {
    json!({"success": false, "error": message.into()})
}

/// Check the raw message against `max_bytes` and UTF-8, then hand it to
/// [`handle_message`].
///
/// Oversized and non-UTF-8 messages are answered in-band like any other
/// malformed request, so the client stays attached.
pub async fn handle_payload(payload: &[u8], max_bytes: usize, link: &mut BackendLink) -> Value {
    if payload.len() > max_bytes {
        debug!(len = payload.len(), max_bytes, "rejecting oversized message");
        return failure(RequestError::FrameTooLarge { max: max_bytes }.to_string());
    }
    match std::str::from_utf8(payload) {
        Ok(text) => handle_message(text, link).await,
        Err(e) => {
            debug!(len = payload.len(), "rejecting non-UTF-8 message");
            failure(format!("Invalid JSON format: {e}"))
        }
    }
}

/// Parse `text` as JSON and forward it through `link`.
///
/// Only JSON syntax is checked here; the stream server decides whether the
/// document is a valid request. Every outcome is a reply for the client.
pub async fn handle_message(text: &str, link: &mut BackendLink) -> Value {
    let request: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "rejecting malformed message");
            return failure(format!("Invalid JSON format: {e}"));
        }
    };

    let command = request
        .get("command")
        .and_then(Value::as_str)
        .unwrap_or("<none>")
        .to_owned();
    match link.forward(&request).await {
        Ok(reply) => {
            debug!(%command, "relayed");
            reply
        }
        Err(e) => {
            debug!(%command, error = %e, "backend round trip failed");
            failure(e.to_string())
        }
    }
}
