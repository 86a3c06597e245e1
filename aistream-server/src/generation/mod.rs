//! Content generation port
//!
//! The refill coordinator only sees the [`GenerationPort`] trait: one call
//! turning a topic into candidate lines, one call turning a line into audio.
//! [`dashscope::DashScopeClient`] is the production implementation.

pub mod dashscope;
pub mod scripts;
pub mod visemes;

use crate::config::VoiceConfig;
use aistream_common::Viseme;
use thiserror::Error;

pub use dashscope::DashScopeClient;

/// Speech synthesis result for one line of text
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutput {
    pub audio: Vec<u8>,
    pub duration_ms: u64,
    pub visemes: Vec<Viseme>,
}

/// Generation failures (per call, never fatal to a refill cycle)
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with an error status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response carried no audio in any known location
    #[error("No audio in synthesis response")]
    MissingAudio,

    /// Failed to decode response or payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// Output cannot be turned into a playable item
    #[error("Invalid output: {0}")]
    InvalidOutput(String),
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => GenerationError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => GenerationError::Network(err.to_string()),
        }
    }
}

/// The two external calls a refill cycle depends on
///
/// # Contract
/// - `generate_scripts` never fails: on total failure it returns a
///   non-empty fallback list. It may return fewer than `count` lines.
/// - `synthesize` reports failures as errors; callers skip that line.
#[async_trait::async_trait]
pub trait GenerationPort: Send + Sync {
    /// Produce up to `count` short lines of text about `topic`
    async fn generate_scripts(&self, topic: &str, count: usize) -> Vec<String>;

    /// Turn one line of text into audio plus a lip-sync track
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<SynthesisOutput, GenerationError>;
}
