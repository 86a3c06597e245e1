//! Playable audio item

use aistream_common::Viseme;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Reasons an item cannot be constructed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ItemError {
    #[error("item text is empty")]
    EmptyText,

    #[error("item audio is empty")]
    EmptyAudio,

    #[error("item duration must be positive")]
    ZeroDuration,

    #[error("viseme {index} has negative offset {offset}")]
    NegativeOffset { index: usize, offset: f64 },

    #[error("viseme {index} offset {offset} precedes previous offset {previous}")]
    DecreasingOffset {
        index: usize,
        offset: f64,
        previous: f64,
    },

    #[error("viseme {index} has {actual} coefficients, expected {expected}")]
    CoefficientWidth {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// One unit of synthesized speech ready for playback
///
/// Immutable once constructed. Fields are private so the invariants checked
/// in [`AudioItem::new`] hold for the item's whole life.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioItem {
    text: String,
    audio_data: Vec<u8>,
    visemes: Vec<Viseme>,
    duration_ms: u64,
    created_at: DateTime<Utc>,
}

impl AudioItem {
    /// Validate and build an item stamped with the current time
    pub fn new(
        text: impl Into<String>,
        audio_data: Vec<u8>,
        visemes: Vec<Viseme>,
        duration_ms: u64,
    ) -> Result<Self, ItemError> {
        Self::with_created_at(text, audio_data, visemes, duration_ms, Utc::now())
    }

    /// Validate and build an item with an explicit creation time
    pub fn with_created_at(
        text: impl Into<String>,
        audio_data: Vec<u8>,
        visemes: Vec<Viseme>,
        duration_ms: u64,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ItemError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ItemError::EmptyText);
        }
        if audio_data.is_empty() {
            return Err(ItemError::EmptyAudio);
        }
        if duration_ms == 0 {
            return Err(ItemError::ZeroDuration);
        }
        validate_visemes(&visemes)?;

        Ok(Self {
            text,
            audio_data,
            visemes,
            duration_ms,
            created_at,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn audio_data(&self) -> &[u8] {
        &self.audio_data
    }

    pub fn visemes(&self) -> &[Viseme] {
        &self.visemes
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Offsets non-negative and non-decreasing, one coefficient width per track
fn validate_visemes(visemes: &[Viseme]) -> Result<(), ItemError> {
    let Some(first) = visemes.first() else {
        return Ok(());
    };
    let expected = first.coefficients.len();
    let mut previous = 0.0_f64;

    for (index, viseme) in visemes.iter().enumerate() {
        if viseme.offset.is_nan() || viseme.offset < 0.0 {
            return Err(ItemError::NegativeOffset {
                index,
                offset: viseme.offset,
            });
        }
        if viseme.offset < previous {
            return Err(ItemError::DecreasingOffset {
                index,
                offset: viseme.offset,
                previous,
            });
        }
        if viseme.coefficients.len() != expected {
            return Err(ItemError::CoefficientWidth {
                index,
                expected,
                actual: viseme.coefficients.len(),
            });
        }
        previous = viseme.offset;
    }

    Ok(())
}
