//! Per-connection request loop.

use std::net::SocketAddr;

use calc_core::{RequestError, Response, Session};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::codec::{Frame, JsonLinesCodec};

/// Serve one stream connection until the peer closes, the transport fails,
/// or shutdown is requested.
///
/// The connection owns a fresh [`Session`]. Requests are handled strictly
/// one at a time; shutdown is only observed while waiting for the next
/// frame, never between reading a request and writing its response.
/// Returns the number of responses written.
#[instrument(skip_all, fields(peer = %peer))]
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    max_frame_bytes: usize,
    shutdown: CancellationToken,
) -> u64
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, JsonLinesCodec::new_with_max_length(max_frame_bytes));
    let mut session = Session::new();
    let mut served = 0u64;
    info!("connection opened");

    loop {
        let frame = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!(served, "closing connection for shutdown");
                break;
            }
            frame = framed.next() => frame,
        };

        let response = match frame {
            None => {
                info!(served, "peer closed connection");
                break;
            }
            Some(Err(e)) => {
                warn!(error = %e, served, "transport error, dropping connection");
                break;
            }
            Some(Ok(Frame::Line(line))) => session.handle_line(&line),
            Some(Ok(Frame::Oversized)) => {
                debug!(max = max_frame_bytes, "oversized frame discarded");
                Response::from(RequestError::FrameTooLarge {
                    max: max_frame_bytes,
                })
            }
            Some(Ok(Frame::NotUtf8)) => {
                debug!("non-UTF-8 frame discarded");
                Response::from(RequestError::NotUtf8)
            }
        };

        if let Err(e) = framed.send(&response).await {
            warn!(error = %e, served, "failed to write response");
            break;
        }
        served += 1;
    }

    served
}
