//! Refill coordinator
//!
//! Turns the session topic into a batch of playable items. At most one cycle
//! runs at a time: a call made while another is in flight returns
//! immediately with [`SkipReason::InFlight`] instead of queueing.

use crate::claim::ClaimFlag;
use crate::config::VoiceConfig;
use crate::generation::GenerationPort;
use crate::playlist::{AudioItem, PlaylistStore};
use aistream_common::events::{EventBus, StreamEvent};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Why a refill attempt did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another cycle holds the guard
    InFlight,
    /// No topic has been set for the session
    NoTopic,
    /// Streaming is disabled for the session
    NotStreaming,
}

/// Result of one `attempt_refill` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillOutcome {
    Skipped(SkipReason),
    /// Cycle ran; number of items appended (0 is a soft failure)
    Refilled(usize),
}

impl RefillOutcome {
    pub fn items_added(&self) -> usize {
        match self {
            RefillOutcome::Refilled(n) => *n,
            RefillOutcome::Skipped(_) => 0,
        }
    }

    /// True only when at least one item reached the playlist
    pub fn is_success(&self) -> bool {
        self.items_added() > 0
    }
}

impl fmt::Display for RefillOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefillOutcome::Skipped(SkipReason::InFlight) => write!(f, "skipped"),
            RefillOutcome::Skipped(SkipReason::NoTopic) => write!(f, "skipped: no topic"),
            RefillOutcome::Skipped(SkipReason::NotStreaming) => write!(f, "skipped: not streaming"),
            RefillOutcome::Refilled(n) => write!(f, "refilled: {} items", n),
        }
    }
}

/// Counts from one generate + synthesize + push cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub scripts_generated: usize,
    pub items_created: usize,
}

/// Single-flight refill of one session's playlist
///
/// Cheap to clone; clones share the playlist, the port and the in-flight
/// flag, so a clone moved into a spawned task still excludes the original.
#[derive(Clone)]
pub struct RefillCoordinator {
    session_id: Uuid,
    store: Arc<PlaylistStore>,
    port: Arc<dyn GenerationPort>,
    voice: Arc<VoiceConfig>,
    batch_size: usize,
    in_flight: ClaimFlag,
    events: EventBus,
}

impl RefillCoordinator {
    pub fn new(
        session_id: Uuid,
        store: Arc<PlaylistStore>,
        port: Arc<dyn GenerationPort>,
        voice: VoiceConfig,
        batch_size: usize,
        events: EventBus,
    ) -> Self {
        Self {
            session_id,
            store,
            port,
            voice: Arc::new(voice),
            batch_size: batch_size.max(1),
            in_flight: ClaimFlag::new(),
            events,
        }
    }

    /// Whether a cycle currently holds the guard
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_claimed()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Run one refill cycle unless one is already running
    ///
    /// Order: claim the guard, check topic, check streaming, generate,
    /// synthesize each line, append the batch.
    pub async fn attempt_refill(&self) -> RefillOutcome {
        let Some(_claim) = self.in_flight.try_claim() else {
            debug!("Refill already in progress, skipping");
            return RefillOutcome::Skipped(SkipReason::InFlight);
        };

        let outcome = match self.store.topic() {
            None => {
                warn!("No topic set, cannot refill playlist");
                RefillOutcome::Skipped(SkipReason::NoTopic)
            }
            Some(_) if !self.store.is_streaming() => {
                debug!("Streaming is not active, skipping refill");
                RefillOutcome::Skipped(SkipReason::NotStreaming)
            }
            Some(topic) => {
                info!("Refilling playlist with topic: {}", topic);
                self.events.emit_lossy(StreamEvent::RefillStarted {
                    session_id: self.session_id,
                    topic: topic.clone(),
                    timestamp: Utc::now(),
                });

                let report = self.run_cycle(&topic).await;
                RefillOutcome::Refilled(report.items_created)
            }
        };

        self.events.emit_lossy(StreamEvent::RefillCompleted {
            session_id: self.session_id,
            outcome: outcome.to_string(),
            items_added: outcome.items_added(),
            timestamp: Utc::now(),
        });

        outcome
    }

    /// Generate, synthesize and append one batch for `topic`
    ///
    /// Does not touch the in-flight guard; the session-start path calls this
    /// directly. Lines that fail synthesis, or whose output is not a valid
    /// item, are logged and skipped.
    pub async fn run_cycle(&self, topic: &str) -> CycleReport {
        let mut scripts = self.port.generate_scripts(topic, self.batch_size).await;
        scripts.truncate(self.batch_size);
        info!("Generated {} scripts", scripts.len());

        let total = scripts.len();
        let mut items = Vec::with_capacity(total);

        for (i, script) in scripts.iter().enumerate() {
            let script = script.trim();
            if script.is_empty() {
                warn!("Skipping empty script {}/{}", i + 1, total);
                continue;
            }

            debug!("Synthesizing audio {}/{}: {}", i + 1, total, script);
            let output = match self.port.synthesize(script, &self.voice).await {
                Ok(output) => output,
                Err(e) => {
                    error!("Failed to synthesize audio for script {}/{}: {}", i + 1, total, e);
                    continue;
                }
            };

            match AudioItem::new(script, output.audio, output.visemes, output.duration_ms) {
                Ok(item) => items.push(item),
                Err(e) => warn!("Discarding synthesized script {}/{}: {}", i + 1, total, e),
            }
        }

        let items_created = items.len();
        if items_created > 0 {
            self.store.push_batch(items);
            info!("Added {} audio items to playlist", items_created);
        } else {
            warn!("No audio items were generated");
        }

        CycleReport {
            scripts_generated: total,
            items_created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(RefillOutcome::Skipped(SkipReason::InFlight).to_string(), "skipped");
        assert_eq!(RefillOutcome::Skipped(SkipReason::NoTopic).to_string(), "skipped: no topic");
        assert_eq!(
            RefillOutcome::Skipped(SkipReason::NotStreaming).to_string(),
            "skipped: not streaming"
        );
        assert_eq!(RefillOutcome::Refilled(2).to_string(), "refilled: 2 items");
        assert_eq!(RefillOutcome::Refilled(0).to_string(), "refilled: 0 items");
    }

    #[test]
    fn test_outcome_success() {
        assert!(RefillOutcome::Refilled(1).is_success());
        assert!(!RefillOutcome::Refilled(0).is_success());
        assert!(!RefillOutcome::Skipped(SkipReason::NoTopic).is_success());
        assert_eq!(RefillOutcome::Skipped(SkipReason::InFlight).items_added(), 0);
    }
}
