//! Delivery loop
//!
//! Owns one live connection and feeds it from the session playlist at
//! real-time cadence:
//!
//! ```text
//! AwaitItem ──item──▶ Sending ──ok──▶ Pacing ──▶ AwaitItem
//!     │                  └──error──▶ Closed (item restored at head)
//!     └──empty × threshold──▶ Refilling ──▶ AwaitItem
//! ```
//!
//! The peer going away cancels the loop's token; every suspension point
//! (poll wait, refill wait, pacing, send) races against it.

use crate::config::{AudioEncoding, StreamConfig};
use crate::playlist::{AudioItem, PlaylistStore};
use crate::refill::RefillCoordinator;
use crate::session::Session;
use aistream_common::events::{EventBus, StreamEvent};
use aistream_common::StreamMessage;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Delivery channel failures
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("connection closed")]
    Closed,

    #[error("failed to serialize message: {0}")]
    Serialize(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Outbound half of a client connection
#[async_trait::async_trait]
pub trait DeliverySink: Send {
    async fn send(&mut self, message: &StreamMessage) -> Result<(), DeliveryError>;
}

/// Why a delivery loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Peer disconnected while the loop was waiting
    PeerDisconnected,
    /// Sending an item failed; the item went back to the playlist head
    SendFailed,
}

/// Delivery loop timing
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub poll_interval: Duration,
    pub refill_threshold: u32,
    pub refill_timeout: Duration,
    pub audio_encoding: AudioEncoding,
}

impl From<&StreamConfig> for DeliverySettings {
    fn from(config: &StreamConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            refill_threshold: config.refill_threshold.max(1),
            refill_timeout: config.refill_timeout(),
            audio_encoding: config.audio_encoding,
        }
    }
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self::from(&StreamConfig::default())
    }
}

/// Per-connection delivery state machine
pub struct DeliveryLoop<S> {
    session_id: Uuid,
    store: Arc<PlaylistStore>,
    coordinator: RefillCoordinator,
    events: EventBus,
    settings: DeliverySettings,
    sink: S,
    closed: CancellationToken,
    empty_checks: u32,
}

impl<S: DeliverySink> DeliveryLoop<S> {
    /// Bind a connection to a session
    ///
    /// `closed` must be cancelled by the transport when the peer goes away.
    pub fn new(session: &Session, sink: S, closed: CancellationToken) -> Self {
        Self {
            session_id: session.id(),
            store: session.store(),
            coordinator: session.coordinator().clone(),
            events: session.events().clone(),
            settings: session.delivery_settings().clone(),
            sink,
            closed,
            empty_checks: 0,
        }
    }

    /// Run until the connection closes
    pub async fn run(mut self) -> LoopExit {
        info!("Delivery loop started for session {}", self.session_id);

        let exit = loop {
            if self.closed.is_cancelled() {
                break LoopExit::PeerDisconnected;
            }

            let Some(item) = self.store.pop() else {
                match self.on_empty().await {
                    Some(exit) => break exit,
                    None => continue,
                }
            };
            self.empty_checks = 0;

            if let Some(exit) = self.deliver(item).await {
                break exit;
            }
        };

        info!("Delivery loop for session {} ended: {:?}", self.session_id, exit);
        exit
    }

    /// Sending + Pacing for one item
    async fn deliver(&mut self, item: AudioItem) -> Option<LoopExit> {
        let message = self.to_message(&item);

        let sent = tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(DeliveryError::Closed),
            result = self.sink.send(&message) => result,
        };

        if let Err(e) = sent {
            warn!("Failed to send audio chunk, restoring item to playlist head: {}", e);
            self.store.push_front(item);
            return Some(match e {
                DeliveryError::Closed => LoopExit::PeerDisconnected,
                _ => LoopExit::SendFailed,
            });
        }

        debug!("Sent audio chunk: {}", item.text());
        self.events.emit_lossy(StreamEvent::ItemDelivered {
            session_id: self.session_id,
            text: item.text().to_string(),
            duration_ms: item.duration_ms(),
            remaining: self.store.size(),
            timestamp: Utc::now(),
        });

        // Real-time pacing: the next item goes out once this one has played
        wait(&self.closed, Duration::from_millis(item.duration_ms())).await
    }

    /// AwaitItem with an empty playlist
    async fn on_empty(&mut self) -> Option<LoopExit> {
        self.empty_checks = self.empty_checks.saturating_add(1);

        if self.empty_checks >= self.settings.refill_threshold {
            if self.store.is_streaming() {
                match self.refill().await {
                    Err(exit) => return Some(exit),
                    Ok(true) => {
                        self.empty_checks = 0;
                        return None;
                    }
                    Ok(false) => {}
                }
            } else {
                debug!("Streaming not active, waiting");
            }
        }

        wait(&self.closed, self.settings.poll_interval).await
    }

    /// Refilling: run a detached refill and wait for it, bounded
    ///
    /// Returns `Ok(true)` when items were added. A refill that outlives the
    /// timeout keeps running in the background and still commits its batch.
    async fn refill(&mut self) -> Result<bool, LoopExit> {
        info!("Playlist empty, triggering auto-refill");

        // A dead peer surfaces on the next item send
        let notice = StreamMessage::refilling();
        let sent = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(LoopExit::PeerDisconnected),
            result = self.sink.send(&notice) => result,
        };
        if let Err(e) = sent {
            debug!("Could not send refilling status: {}", e);
        }

        let coordinator = self.coordinator.clone();
        let task = tokio::spawn(async move { coordinator.attempt_refill().await });

        let waited = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(LoopExit::PeerDisconnected),
            waited = tokio::time::timeout(self.settings.refill_timeout, task) => waited,
        };

        match waited {
            Ok(Ok(outcome)) if outcome.is_success() => {
                info!("Auto-refill completed successfully: {}", outcome);
                Ok(true)
            }
            Ok(Ok(outcome)) => {
                warn!("Auto-refill added no items: {}", outcome);
                Ok(false)
            }
            Ok(Err(e)) => {
                error!("Auto-refill task failed: {}", e);
                Ok(false)
            }
            Err(_) => {
                warn!(
                    "Auto-refill timed out after {:?}, continuing",
                    self.settings.refill_timeout
                );
                Ok(false)
            }
        }
    }

    fn to_message(&self, item: &AudioItem) -> StreamMessage {
        StreamMessage::AudioChunk {
            text: item.text().to_string(),
            audio_data: self.settings.audio_encoding.encode(item.audio_data()),
            visemes: item.visemes().to_vec(),
            duration_ms: item.duration_ms(),
            timestamp: item.created_at(),
        }
    }
}

/// Sleep unless the peer disconnects first
async fn wait(closed: &CancellationToken, duration: Duration) -> Option<LoopExit> {
    tokio::select! {
        biased;
        _ = closed.cancelled() => Some(LoopExit::PeerDisconnected),
        _ = tokio::time::sleep(duration) => None,
    }
}
