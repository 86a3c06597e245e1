//! Configuration management for aistream-server
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--port, --host, --log-level, --api-key,
//!    --audio-encoding, --static-dir)
//! 2. Environment variables (each CLI argument has one)
//! 3. TOML configuration file (--config, AISTREAM_CONFIG, or the platform default)
//! 4. Built-in defaults (code constants)

use crate::error::{Error, Result};
use aistream_common::config::{load_toml, resolve_config_path};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "AISTREAM_CONFIG";

/// Command-line arguments for aistream-server
#[derive(Parser, Debug, Default)]
#[command(name = "aistream-server")]
#[command(about = "Streams generated speech clips to a connected client")]
#[command(version)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "AISTREAM_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "AISTREAM_PORT")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "AISTREAM_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// DashScope API key
    #[arg(long, env = "DASHSCOPE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Encoding of audio bytes in audio_chunk messages
    #[arg(long, value_enum, env = "AISTREAM_AUDIO_ENCODING")]
    pub audio_encoding: Option<AudioEncoding>,

    /// Directory holding the browser client (index.html and assets)
    #[arg(long, env = "AISTREAM_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address to bind
    pub host: String,

    /// HTTP server port
    ///
    /// Default: 8000
    pub port: u16,

    /// Browser client directory, served under /static
    pub static_dir: Option<PathBuf>,

    pub logging: LoggingConfig,
    pub dashscope: DashScopeConfig,
    pub voice: VoiceConfig,
    pub stream: StreamConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

/// Generation backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashScopeConfig {
    /// API key; synthesis fails per item when missing
    pub api_key: Option<String>,
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Text-generation model used for scripts
    pub text_model: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

/// Speech synthesis parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub voice: String,
    pub model: String,
    /// PCM sample rate used to derive clip duration
    pub sample_rate: u32,
    pub language: String,
}

/// Delivery loop and refill tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Scripts requested per refill cycle
    pub batch_size: usize,
    /// Delay between empty playlist checks
    pub poll_interval_ms: u64,
    /// Consecutive empty checks before a refill is attempted
    pub refill_threshold: u32,
    /// Upper bound the delivery loop waits for one refill
    pub refill_timeout_secs: u64,
    /// Encoding of audio bytes in `audio_chunk` messages
    pub audio_encoding: AudioEncoding,
    /// Session event buffer size
    pub event_capacity: usize,
}

/// Text encoding for audio bytes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    #[default]
    Hex,
    Base64,
}

impl AudioEncoding {
    pub fn encode(&self, bytes: &[u8]) -> String {
        use base64::Engine as _;

        match self {
            AudioEncoding::Hex => hex::encode(bytes),
            AudioEncoding::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            static_dir: None,
            logging: LoggingConfig::default(),
            dashscope: DashScopeConfig::default(),
            voice: VoiceConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for DashScopeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://dashscope.aliyuncs.com/api/v1".to_string(),
            text_model: "qwen-turbo".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice: "Cherry".to_string(),
            model: "qwen3-tts-flash".to_string(),
            sample_rate: 24_000,
            language: "Chinese".to_string(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            poll_interval_ms: 1000,
            refill_threshold: 2,
            refill_timeout_secs: 30,
            audio_encoding: AudioEncoding::Hex,
            event_capacity: 100,
        }
    }
}

impl StreamConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn refill_timeout(&self) -> Duration {
        Duration::from_secs(self.refill_timeout_secs)
    }
}

impl Config {
    /// Build the effective configuration from CLI arguments, the TOML file and defaults
    pub fn load(args: &CliArgs) -> Result<Self> {
        let mut config = match resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR) {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                load_toml::<Config>(&path)?
            }
            None => {
                info!("No configuration file found, using built-in defaults");
                Config::default()
            }
        };

        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Overlay command-line / environment values
    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(host) = &args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if let Some(key) = &args.api_key {
            self.dashscope.api_key = Some(key.clone());
        }
        if let Some(encoding) = args.audio_encoding {
            self.stream.audio_encoding = encoding;
        }
        if let Some(dir) = &args.static_dir {
            self.static_dir = Some(dir.clone());
        }
    }

    /// Reject values the delivery loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.stream.batch_size == 0 {
            return Err(Error::Config("stream.batch_size must be at least 1".to_string()));
        }
        if self.stream.refill_threshold == 0 {
            return Err(Error::Config(
                "stream.refill_threshold must be at least 1".to_string(),
            ));
        }
        if self.stream.poll_interval_ms == 0 {
            return Err(Error::Config(
                "stream.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.voice.sample_rate == 0 {
            return Err(Error::Config("voice.sample_rate must be positive".to_string()));
        }
        if self.stream.event_capacity == 0 {
            return Err(Error::Config(
                "stream.event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Address string for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_match_delivery_contract() {
        let config = Config::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.stream.batch_size, 5);
        assert_eq!(config.stream.refill_threshold, 2);
        assert_eq!(config.stream.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.stream.refill_timeout(), Duration::from_secs(30));
        assert_eq!(config.stream.audio_encoding, AudioEncoding::Hex);
        assert_eq!(config.voice.sample_rate, 24_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let file = write_config(
            r#"
port = 9100

[stream]
batch_size = 3
audio_encoding = "base64"
"#,
        );
        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        let config = Config::load(&args).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.stream.batch_size, 3);
        assert_eq!(config.stream.refill_threshold, 2);
        assert_eq!(config.stream.audio_encoding, AudioEncoding::Base64);
        assert_eq!(config.dashscope.text_model, "qwen-turbo");
    }

    #[test]
    fn test_cli_args_override_file() {
        let file = write_config("port = 9100\n[logging]\nlevel = \"warn\"\n");
        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            port: Some(9200),
            log_level: Some("debug".to_string()),
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };

        let config = Config::load(&args).unwrap();
        assert_eq!(config.port, 9200);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.dashscope.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.bind_addr(), "0.0.0.0:9200");
    }

    #[test]
    fn test_audio_encoding_and_static_dir_overrides() {
        let file = write_config(
            "static_dir = \"/srv/aistream/web\"\n[stream]\naudio_encoding = \"hex\"\n",
        );
        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            audio_encoding: Some(AudioEncoding::Base64),
            ..Default::default()
        };

        let config = Config::load(&args).unwrap();
        assert_eq!(config.stream.audio_encoding, AudioEncoding::Base64);
        assert_eq!(config.static_dir, Some(PathBuf::from("/srv/aistream/web")));

        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            static_dir: Some(PathBuf::from("client")),
            ..Default::default()
        };
        let config = Config::load(&args).unwrap();
        assert_eq!(config.stream.audio_encoding, AudioEncoding::Hex);
        assert_eq!(config.static_dir, Some(PathBuf::from("client")));
    }

    #[test]
    fn test_audio_encoding_flag_parses() {
        let args = CliArgs::try_parse_from(["aistream-server", "--audio-encoding", "base64"]).unwrap();
        assert_eq!(args.audio_encoding, Some(AudioEncoding::Base64));

        assert!(CliArgs::try_parse_from(["aistream-server", "--audio-encoding", "utf8"]).is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let file = write_config("[stream]\nbatch_size = 0\n");
        let args = CliArgs {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        let err = Config::load(&args).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = Config::default();
        config.stream.refill_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_audio_encoding() {
        assert_eq!(AudioEncoding::Hex.encode(&[0x00, 0xff, 0x10]), "00ff10");
        assert_eq!(AudioEncoding::Base64.encode(b"abc"), "YWJj");
    }
}
