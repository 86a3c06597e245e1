//! Error types for aistream-server
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

use crate::delivery::DeliveryError;
use crate::generation::GenerationError;

/// Main error type for aistream-server
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Script generation or speech synthesis errors
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Delivery channel errors
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<aistream_common::Error> for Error {
    fn from(err: aistream_common::Error) -> Self {
        match err {
            aistream_common::Error::Config(msg) => Error::Config(msg),
            aistream_common::Error::Io(e) => Error::Io(e),
            aistream_common::Error::InvalidInput(msg) => Error::BadRequest(msg),
            other => Error::Internal(other.to_string()),
        }
    }
}

/// Convenience Result type using aistream-server Error
pub type Result<T> = std::result::Result<T, Error>;
