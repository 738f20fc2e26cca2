//! Error types for visage.

use thiserror::Error;

/// Result type alias using visage's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for visage operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (empty name, malformed image, wrong dimension)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Face detection backend failed
    #[error("Detection error: {0}")]
    Detection(String),

    /// Local persistence of the gallery failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote blob store operation failed
    #[error("Sync error: {0}")]
    Sync(String),

    /// Index or metadata file could not be decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
