//! DashScope generation client
//!
//! Implements [`GenerationPort`] against the DashScope HTTP API:
//! text generation for scripts, multimodal generation for speech.
//!
//! # API Reference
//! - Text: `POST {base}/services/aigc/text-generation/generation`
//! - Speech: `POST {base}/services/aigc/multimodal-generation/generation`

use super::scripts::{build_prompt, fallback_scripts, parse_scripts};
use super::visemes::placeholder_track;
use super::{GenerationError, GenerationPort, SynthesisOutput};
use crate::config::{DashScopeConfig, VoiceConfig};
use base64::Engine as _;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const TEXT_GENERATION_PATH: &str = "/services/aigc/text-generation/generation";
const SPEECH_GENERATION_PATH: &str = "/services/aigc/multimodal-generation/generation";

/// Sampling parameters for script generation
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.8;

/// 16-bit mono PCM
const BYTES_PER_SAMPLE: u64 = 2;
const CHANNELS: u64 = 1;

/// Bare message content shorter than this is not treated as audio
const MIN_INLINE_CONTENT_LEN: usize = 100;

/// Where a synthesis response put its audio
#[derive(Debug, Clone, PartialEq)]
pub enum AudioLocation {
    /// Download from this URL
    Url(String),
    /// Base64 payload inline in the response
    Inline(String),
}

/// DashScope client
pub struct DashScopeClient {
    http_client: Client,
    api_key: Option<String>,
    base_url: String,
    text_model: String,
}

impl DashScopeClient {
    pub fn new(config: &DashScopeConfig) -> Result<Self, GenerationError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GenerationError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, GenerationError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| GenerationError::Api {
                status: 401,
                message: "no API key configured".to_string(),
            })
    }

    /// POST a JSON body and return the parsed JSON response
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, GenerationError> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(self.api_key()?)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GenerationError::Decode(format!("Invalid JSON response: {}", e)))
    }

    async fn request_scripts(&self, topic: &str, count: usize) -> Result<String, GenerationError> {
        let body = json!({
            "model": self.text_model,
            "input": { "prompt": build_prompt(topic, count) },
            "parameters": {
                "max_tokens": MAX_TOKENS,
                "temperature": TEMPERATURE,
            },
        });

        let response = self.post_json(TEXT_GENERATION_PATH, &body).await?;
        response["output"]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GenerationError::Decode("response has no output.text".to_string()))
    }

    async fn fetch_audio(&self, location: AudioLocation) -> Result<Vec<u8>, GenerationError> {
        match location {
            AudioLocation::Url(url) => {
                debug!("Fetching audio from {}", url);
                let response = self.http_client.get(&url).send().await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
            AudioLocation::Inline(data) => base64::engine::general_purpose::STANDARD
                .decode(data.trim())
                .map_err(|e| GenerationError::Decode(format!("Invalid base64 audio: {}", e))),
        }
    }
}

#[async_trait::async_trait]
impl GenerationPort for DashScopeClient {
    async fn generate_scripts(&self, topic: &str, count: usize) -> Vec<String> {
        info!("Generating {} scripts for topic: {}", count, topic);

        match self.request_scripts(topic, count).await {
            Ok(text) => {
                let scripts = parse_scripts(&text, topic, count);
                info!("Generated {} scripts", scripts.len());
                scripts
            }
            Err(e) => {
                error!("Script generation failed, using fallback: {}", e);
                fallback_scripts(topic, count)
            }
        }
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceConfig,
    ) -> Result<SynthesisOutput, GenerationError> {
        debug!("Synthesizing speech for: {}", text);

        let body = json!({
            "model": voice.model,
            "input": {
                "text": text,
                "voice": voice.voice,
                "language_type": voice.language,
            },
        });

        let response = self.post_json(SPEECH_GENERATION_PATH, &body).await?;
        let location = locate_audio(&response).ok_or(GenerationError::MissingAudio)?;
        let audio = self.fetch_audio(location).await?;
        if audio.is_empty() {
            return Err(GenerationError::MissingAudio);
        }

        let duration_ms = pcm_duration_ms(audio.len(), voice.sample_rate);
        if duration_ms == 0 {
            warn!("Synthesized clip too short to play ({} bytes)", audio.len());
            return Err(GenerationError::InvalidOutput(format!(
                "{} bytes is shorter than 1ms at {} Hz",
                audio.len(),
                voice.sample_rate
            )));
        }

        info!("Synthesized audio: {}ms, {} bytes", duration_ms, audio.len());
        Ok(SynthesisOutput {
            visemes: placeholder_track(text, duration_ms),
            audio,
            duration_ms,
        })
    }
}

/// Find the audio in a synthesis response
///
/// Checked in order: `output.audio.url`, `output.audio.data` (base64),
/// `output.audio` as a bare base64 string, `output.audio_url`, the first
/// choice's message content (an `{"type": "audio"}` part, or a long bare
/// string), `output.audio_data` (base64).
pub fn locate_audio(response: &Value) -> Option<AudioLocation> {
    let output = response.get("output")?;
    let non_empty = |v: &Value| v.as_str().filter(|s| !s.is_empty()).map(str::to_string);

    match output.get("audio") {
        Some(Value::Object(audio)) => {
            if let Some(url) = audio.get("url").and_then(non_empty) {
                return Some(AudioLocation::Url(url));
            }
            if let Some(data) = audio.get("data").and_then(non_empty) {
                return Some(AudioLocation::Inline(data));
            }
        }
        Some(Value::String(data)) if !data.is_empty() => {
            return Some(AudioLocation::Inline(data.clone()));
        }
        _ => {}
    }

    if let Some(url) = output.get("audio_url").and_then(non_empty) {
        return Some(AudioLocation::Url(url));
    }

    if let Some(data) = choice_audio(output) {
        return Some(AudioLocation::Inline(data));
    }

    output
        .get("audio_data")
        .and_then(non_empty)
        .map(AudioLocation::Inline)
}

/// Audio carried in `output.choices[0].message.content`
fn choice_audio(output: &Value) -> Option<String> {
    let content = output.pointer("/choices/0/message/content")?;

    match content {
        Value::Array(parts) => parts
            .iter()
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("audio"))
            .find_map(|part| part.get("audio").and_then(Value::as_str))
            .filter(|audio| !audio.is_empty())
            .map(str::to_string),
        // Short strings are text replies, not payloads
        Value::String(data) if data.len() > MIN_INLINE_CONTENT_LEN => Some(data.clone()),
        _ => None,
    }
}

/// Playback length of 16-bit mono PCM at `sample_rate`
pub fn pcm_duration_ms(byte_len: usize, sample_rate: u32) -> u64 {
    let bytes_per_second = u64::from(sample_rate) * CHANNELS * BYTES_PER_SAMPLE;
    if bytes_per_second == 0 {
        return 0;
    }
    byte_len as u64 * 1000 / bytes_per_second
}
