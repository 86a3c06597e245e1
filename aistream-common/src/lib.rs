//! # AI Streamer Common Library
//!
//! Shared code for the AI Streamer service including:
//! - Error types
//! - Wire messages pushed over the delivery channel
//! - Session event types (StreamEvent enum) and the EventBus
//! - Configuration file discovery

pub mod config;
pub mod error;
pub mod events;
pub mod messages;

pub use error::{Error, Result};
pub use messages::{StreamMessage, Viseme};
