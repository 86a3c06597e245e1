//! Scripted generation backend
//!
//! Returns a fixed list of scripts, synthesizes every line to a clip of a
//! fixed duration, and fails the lines it was told to fail. Synthesis can be
//! slowed down with a tokio sleep so paused-clock tests control timing.

use aistream_server::config::VoiceConfig;
use aistream_server::generation::visemes::placeholder_track;
use aistream_server::generation::{GenerationError, GenerationPort, SynthesisOutput};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct MockGenerationPort {
    scripts: Vec<String>,
    failing: HashSet<String>,
    duration_ms: u64,
    synth_delay: Duration,
    generate_calls: AtomicUsize,
    synth_calls: AtomicUsize,
}

impl MockGenerationPort {
    pub fn new<S: Into<String>>(scripts: impl IntoIterator<Item = S>) -> Self {
        Self {
            scripts: scripts.into_iter().map(Into::into).collect(),
            failing: HashSet::new(),
            duration_ms: 1000,
            synth_delay: Duration::ZERO,
            generate_calls: AtomicUsize::new(0),
            synth_calls: AtomicUsize::new(0),
        }
    }

    /// Make synthesis of `line` fail
    pub fn failing_on(mut self, line: &str) -> Self {
        self.failing.insert(line.to_string());
        self
    }

    /// Make every synthesis call fail
    pub fn failing_all(mut self) -> Self {
        self.failing.extend(self.scripts.iter().cloned());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_synth_delay(mut self, delay: Duration) -> Self {
        self.synth_delay = delay;
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn synth_calls(&self) -> usize {
        self.synth_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl GenerationPort for MockGenerationPort {
    async fn generate_scripts(&self, _topic: &str, count: usize) -> Vec<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.scripts.iter().take(count).cloned().collect()
    }

    async fn synthesize(
        &self,
        text: &str,
        _voice: &VoiceConfig,
    ) -> Result<SynthesisOutput, GenerationError> {
        self.synth_calls.fetch_add(1, Ordering::SeqCst);
        if !self.synth_delay.is_zero() {
            tokio::time::sleep(self.synth_delay).await;
        }

        if self.failing.contains(text) {
            return Err(GenerationError::Api {
                status: 500,
                message: format!("synthesis failed for {}", text),
            });
        }

        Ok(SynthesisOutput {
            audio: vec![0u8; 48],
            duration_ms: self.duration_ms,
            visemes: placeholder_track(text, self.duration_ms),
        })
    }
}
