//! Delivery sink that records what it is sent
//!
//! Clones share the same record, so a test keeps one handle while the
//! delivery loop owns the other.

use aistream_common::StreamMessage;
use aistream_server::delivery::{DeliveryError, DeliverySink};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// One message as seen by the client
#[derive(Debug, Clone)]
pub struct Recorded {
    pub at: Instant,
    pub message: StreamMessage,
}

impl Recorded {
    pub fn is_audio(&self) -> bool {
        matches!(self.message, StreamMessage::AudioChunk { .. })
    }

    pub fn is_status(&self) -> bool {
        matches!(self.message, StreamMessage::Status { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.message {
            StreamMessage::AudioChunk { text, .. } => Some(text),
            StreamMessage::Status { .. } => None,
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<Recorded>>>,
    /// 1-based index of the audio chunk send that fails
    fail_audio_send: Option<usize>,
    audio_attempts: Arc<Mutex<usize>>,
    /// Status sends never complete
    stall_status: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th audio chunk send with a transport error
    pub fn failing_audio_send(n: usize) -> Self {
        Self {
            fail_audio_send: Some(n),
            ..Self::default()
        }
    }

    /// Block forever on status sends, like a peer that stopped reading
    pub fn stalling_status() -> Self {
        Self {
            stall_status: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<Recorded> {
        self.sent.lock().unwrap().clone()
    }

    pub fn audio(&self) -> Vec<Recorded> {
        self.messages().into_iter().filter(Recorded::is_audio).collect()
    }

    pub fn statuses(&self) -> Vec<Recorded> {
        self.messages().into_iter().filter(Recorded::is_status).collect()
    }
}

#[async_trait::async_trait]
impl DeliverySink for RecordingSink {
    async fn send(&mut self, message: &StreamMessage) -> Result<(), DeliveryError> {
        if self.stall_status && matches!(message, StreamMessage::Status { .. }) {
            std::future::pending::<()>().await;
        }

        if matches!(message, StreamMessage::AudioChunk { .. }) {
            let mut attempts = self.audio_attempts.lock().unwrap();
            *attempts += 1;
            if Some(*attempts) == self.fail_audio_send {
                return Err(DeliveryError::Transport("injected send failure".to_string()));
            }
        }

        self.sent.lock().unwrap().push(Recorded {
            at: Instant::now(),
            message: message.clone(),
        });
        Ok(())
    }
}
