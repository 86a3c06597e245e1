//! Playlist store
//!
//! FIFO queue of ready-to-play items plus the session scalars (topic,
//! streaming flag). Every operation runs inside one critical section of a
//! synchronous mutex; none of them awaits, so the lock is never held across
//! a suspension point.

use super::item::AudioItem;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Session status read in one critical section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub is_streaming: bool,
    pub playlist_size: usize,
    pub current_topic: Option<String>,
}

#[derive(Debug, Default)]
struct SessionRecord {
    playlist: VecDeque<AudioItem>,
    current_topic: Option<String>,
    is_streaming: bool,
}

/// Task-safe playlist plus session state
///
/// All operations are total: they never fail and never block beyond the
/// short critical section.
#[derive(Debug, Default)]
pub struct PlaylistStore {
    inner: Mutex<SessionRecord>,
}

impl PlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A panic elsewhere must not make the store unusable; every mutation
    /// leaves the record consistent, so the poisoned guard is still valid.
    fn lock(&self) -> MutexGuard<'_, SessionRecord> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one item at the tail
    pub fn push(&self, item: AudioItem) {
        self.lock().playlist.push_back(item);
    }

    /// Append all items in order, atomically
    pub fn push_batch(&self, items: Vec<AudioItem>) {
        self.lock().playlist.extend(items);
    }

    /// Re-insert an item at the head (failed-send recovery)
    pub fn push_front(&self, item: AudioItem) {
        self.lock().playlist.push_front(item);
    }

    /// Remove and return the head, or `None` when empty
    pub fn pop(&self) -> Option<AudioItem> {
        self.lock().playlist.pop_front()
    }

    pub fn size(&self) -> usize {
        self.lock().playlist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().playlist.is_empty()
    }

    pub fn clear(&self) {
        self.lock().playlist.clear();
    }

    pub fn set_topic(&self, topic: impl Into<String>) {
        self.lock().current_topic = Some(topic.into());
    }

    pub fn topic(&self) -> Option<String> {
        self.lock().current_topic.clone()
    }

    pub fn set_streaming(&self, is_streaming: bool) {
        self.lock().is_streaming = is_streaming;
    }

    pub fn is_streaming(&self) -> bool {
        self.lock().is_streaming
    }

    /// Set topic and enable streaming in one step
    pub fn start(&self, topic: impl Into<String>) {
        let mut record = self.lock();
        record.current_topic = Some(topic.into());
        record.is_streaming = true;
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let record = self.lock();
        StatusSnapshot {
            is_streaming: record.is_streaming,
            playlist_size: record.playlist.len(),
            current_topic: record.current_topic.clone(),
        }
    }
}
