//! Messages pushed to a client over the delivery channel
//!
//! The channel is one-way: the server sends JSON text frames, the client
//! only connects and disconnects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One frame of a lip-sync animation track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viseme {
    /// Offset from the start of playback, in seconds
    pub offset: f64,
    /// Blend-shape coefficients; every frame of a track has the same width
    pub coefficients: Vec<f32>,
}

impl Viseme {
    pub fn new(offset: f64, coefficients: Vec<f32>) -> Self {
        Self {
            offset,
            coefficients,
        }
    }
}

/// Delivery status reported to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Playlist ran dry and new content is being generated
    Refilling,
}

/// Server → client message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Out-of-band status notice
    Status {
        message: String,
        status: DeliveryStatus,
    },

    /// One playable item
    AudioChunk {
        text: String,
        /// Audio bytes, hex or base64 encoded
        audio_data: String,
        visemes: Vec<Viseme>,
        duration_ms: u64,
        /// Item creation time (ISO-8601)
        timestamp: DateTime<Utc>,
    },
}

impl StreamMessage {
    /// Status notice sent when the delivery loop starts a refill
    pub fn refilling() -> Self {
        StreamMessage::Status {
            message: "Playlist empty, generating new content...".to_string(),
            status: DeliveryStatus::Refilling,
        }
    }

    /// Serialize to the JSON text frame sent on the wire
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_status_message_shape() {
        let json: Value = serde_json::from_str(&StreamMessage::refilling().to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "status");
        assert_eq!(json["status"], "refilling");
        assert!(json["message"].as_str().unwrap().contains("generating"));
    }

    #[test]
    fn test_audio_chunk_shape() {
        let msg = StreamMessage::AudioChunk {
            text: "hello".to_string(),
            audio_data: "0a0b".to_string(),
            visemes: vec![Viseme::new(0.0, vec![0.3, 0.0]), Viseme::new(0.5, vec![0.6, 0.0])],
            duration_ms: 1000,
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };

        let json: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "audio_chunk");
        assert_eq!(json["text"], "hello");
        assert_eq!(json["audio_data"], "0a0b");
        assert_eq!(json["duration_ms"], 1000);
        assert_eq!(json["visemes"][1]["offset"], 0.5);
        assert_eq!(json["visemes"][0]["coefficients"].as_array().unwrap().len(), 2);
        assert!(json["timestamp"].as_str().unwrap().starts_with("2024-05-01T12:00:00"));
    }
}
