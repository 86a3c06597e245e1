//! WebSocket delivery channel
//!
//! `GET /ws/stream` upgrades to a one-way stream of JSON text frames. Frames
//! from the client are read only so that a close or a broken connection
//! cancels the delivery loop.

use crate::api::server::AppContext;
use crate::claim::Claim;
use crate::delivery::{DeliveryError, DeliverySink};
use crate::session::Session;
use aistream_common::StreamMessage;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outbound half of a WebSocket as a [`DeliverySink`]
pub struct WsSink {
    sender: SplitSink<WebSocket, Message>,
}

#[async_trait::async_trait]
impl DeliverySink for WsSink {
    async fn send(&mut self, message: &StreamMessage) -> Result<(), DeliveryError> {
        let json = message
            .to_json()
            .map_err(|e| DeliveryError::Serialize(e.to_string()))?;

        self.sender
            .send(Message::Text(json))
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))
    }
}

/// GET /ws/stream - Attach a client to the session
///
/// Refused with 409 while another client is attached.
pub async fn stream_socket(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> Response {
    let Some(claim) = ctx.session.attach_consumer() else {
        warn!("Rejected WebSocket connection: session already has a client");
        return (StatusCode::CONFLICT, "session already has a connected client").into_response();
    };

    let session = Arc::clone(&ctx.session);
    ws.on_upgrade(move |socket| handle_socket(socket, session, claim))
}

async fn handle_socket(socket: WebSocket, session: Arc<Session>, _claim: Claim) {
    info!("WebSocket client connected");

    let (sender, receiver) = socket.split();
    let closed = CancellationToken::new();
    let watcher = tokio::spawn(watch_for_close(receiver, closed.clone()));

    let exit = session
        .delivery_loop(WsSink { sender }, closed.clone())
        .run()
        .await;

    closed.cancel();
    watcher.abort();
    info!("WebSocket client disconnected ({:?})", exit);
}

/// Drain client frames until the peer closes, then cancel `closed`
async fn watch_for_close(mut receiver: SplitStream<WebSocket>, closed: CancellationToken) {
    loop {
        tokio::select! {
            _ = closed.cancelled() => return,
            frame = receiver.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket receive error: {}", e);
                    break;
                }
            },
        }
    }
    closed.cancel();
}
