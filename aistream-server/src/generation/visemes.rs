//! Placeholder lip-sync track
//!
//! Real phoneme timing is not available from the synthesis backend, so the
//! track is a fixed cadence of alternating mouth-open frames spread over the
//! clip. Consumers only rely on the track shape (non-decreasing offsets,
//! fixed width), not on this heuristic.

use aistream_common::Viseme;

/// Blend-shape coefficients per frame
pub const COEFFICIENT_COUNT: usize = 52;

/// Minimum frames per clip
const MIN_FRAMES: usize = 10;

/// Characters of text per frame
const CHARS_PER_FRAME: usize = 3;

/// Mouth-open values the frames alternate between
const MOUTH_CLOSED: f32 = 0.3;
const MOUTH_OPEN: f32 = 0.6;

/// Evenly spaced frames over `duration_ms`, count scaled with text length
pub fn placeholder_track(text: &str, duration_ms: u64) -> Vec<Viseme> {
    let frames = MIN_FRAMES.max(text.chars().count() / CHARS_PER_FRAME);
    let interval_secs = duration_ms as f64 / 1000.0 / frames as f64;

    (0..frames)
        .map(|i| {
            let mut coefficients = vec![0.0_f32; COEFFICIENT_COUNT];
            coefficients[0] = if i % 2 == 0 { MOUTH_CLOSED } else { MOUTH_OPEN };
            Viseme::new(i as f64 * interval_secs, coefficients)
        })
        .collect()
}
