//! Playlist of ready-to-play items and per-session state

pub mod item;
pub mod store;

pub use item::{AudioItem, ItemError};
pub use store::{PlaylistStore, StatusSnapshot};
