//! # AI Streamer Server Library (aistream-server)
//!
//! Keeps a playlist of generated speech clips topped up and streams it to a
//! connected client at real-time cadence.
//!
//! **Architecture:** one [`Session`] owns the playlist, a single-flight
//! refill coordinator backed by a [`generation::GenerationPort`], and the
//! event bus. Each WebSocket connection runs a [`delivery::DeliveryLoop`]
//! over the session; HTTP handlers start, stop and inspect it.

pub mod api;
pub mod claim;
pub mod config;
pub mod delivery;
pub mod error;
pub mod generation;
pub mod playlist;
pub mod refill;
pub mod session;

pub use error::{Error, Result};
pub use session::Session;
