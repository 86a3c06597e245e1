//! Test helper modules for aistream-server integration tests
//!
//! - MockGenerationPort: scripted generation backend with failure injection
//! - RecordingSink: delivery sink that timestamps everything it is sent

#![allow(dead_code)]

pub mod mock_port;
pub mod recording_sink;

pub use mock_port::MockGenerationPort;
pub use recording_sink::{Recorded, RecordingSink};

use aistream_server::config::{StreamConfig, VoiceConfig};
use aistream_server::Session;
use std::sync::Arc;

/// Session over `port` with default voice and stream settings
pub fn session_with(port: Arc<MockGenerationPort>) -> Arc<Session> {
    session_with_config(port, StreamConfig::default())
}

pub fn session_with_config(port: Arc<MockGenerationPort>, stream: StreamConfig) -> Arc<Session> {
    Arc::new(Session::new(port, VoiceConfig::default(), &stream))
}
