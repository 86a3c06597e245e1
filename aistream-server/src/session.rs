//! Streaming session
//!
//! One session per process: a playlist, its refill coordinator, the event
//! bus and the delivery timing. HTTP handlers and WebSocket connections share
//! it through an `Arc`.

use crate::claim::{Claim, ClaimFlag};
use crate::config::{StreamConfig, VoiceConfig};
use crate::delivery::{DeliveryLoop, DeliverySettings, DeliverySink};
use crate::error::{Error, Result};
use crate::generation::GenerationPort;
use crate::playlist::{PlaylistStore, StatusSnapshot};
use crate::refill::RefillCoordinator;
use aistream_common::events::{EventBus, StreamEvent};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// Result of starting a stream
#[derive(Debug, Clone, Serialize)]
pub struct StartReport {
    pub topic: String,
    pub scripts_generated: usize,
    pub audio_items_created: usize,
    pub playlist_size: usize,
}

pub struct Session {
    id: Uuid,
    store: Arc<PlaylistStore>,
    coordinator: RefillCoordinator,
    events: EventBus,
    delivery: DeliverySettings,
    consumer: ClaimFlag,
}

impl Session {
    pub fn new(port: Arc<dyn GenerationPort>, voice: VoiceConfig, stream: &StreamConfig) -> Self {
        let id = Uuid::new_v4();
        let store = Arc::new(PlaylistStore::new());
        let events = EventBus::new(stream.event_capacity);
        let coordinator = RefillCoordinator::new(
            id,
            Arc::clone(&store),
            port,
            voice,
            stream.batch_size,
            events.clone(),
        );

        Self {
            id,
            store,
            coordinator,
            events,
            delivery: DeliverySettings::from(stream),
            consumer: ClaimFlag::new(),
        }
    }

    /// Set the topic, enable streaming and generate a first batch
    ///
    /// Items already queued are kept; the new batch is appended after them.
    pub async fn start(&self, topic: &str) -> Result<StartReport> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(Error::BadRequest("topic must not be empty".to_string()));
        }

        info!("Starting stream for topic: {}", topic);
        self.store.start(topic);

        let report = self.coordinator.run_cycle(topic).await;
        let playlist_size = self.store.size();

        self.events.emit_lossy(StreamEvent::SessionStarted {
            session_id: self.id,
            topic: topic.to_string(),
            items_created: report.items_created,
            timestamp: Utc::now(),
        });

        Ok(StartReport {
            topic: topic.to_string(),
            scripts_generated: report.scripts_generated,
            audio_items_created: report.items_created,
            playlist_size,
        })
    }

    /// Disable streaming, optionally dropping queued items
    ///
    /// The topic is kept so a later start or refill can reuse it.
    pub fn stop(&self, clear: bool) -> StatusSnapshot {
        self.store.set_streaming(false);
        if clear {
            self.store.clear();
        }
        info!("Stream stopped (cleared: {})", clear);

        self.events.emit_lossy(StreamEvent::StreamStopped {
            session_id: self.id,
            cleared: clear,
            timestamp: Utc::now(),
        });

        self.store.snapshot()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.store.snapshot()
    }

    /// Reserve the session for one delivery connection
    ///
    /// `None` while another connection holds it.
    pub fn attach_consumer(&self) -> Option<Claim> {
        self.consumer.try_claim()
    }

    pub fn delivery_loop<S: DeliverySink>(&self, sink: S, closed: CancellationToken) -> DeliveryLoop<S> {
        DeliveryLoop::new(self, sink, closed)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> Arc<PlaylistStore> {
        Arc::clone(&self.store)
    }

    pub fn coordinator(&self) -> &RefillCoordinator {
        &self.coordinator
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn delivery_settings(&self) -> &DeliverySettings {
        &self.delivery
    }
}
