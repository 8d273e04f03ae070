//! Core error types for focusnoise-core.
//!
//! Each concern gets its own thiserror enum; [`CoreError`] wraps them so
//! callers that do not care about the distinction can use `?` throughout.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusnoise-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Mixer-related errors
    #[error("Mixer error: {0}")]
    Mixer(#[from] MixerError),

    /// Receipt generation errors
    #[error("Receipt error: {0}")]
    Receipt(#[from] ReceiptError),

    /// Stats persistence errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the audio layer mixer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MixerError {
    /// The sound id is not present in the catalog.
    #[error("Unknown sound '{id}'")]
    UnknownSound { id: String },

    /// The layer is not part of the current mix.
    #[error("Layer '{id}' is not in the mix")]
    LayerNotFound { id: String },
}

/// Errors raised while building a session receipt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    #[error("Invalid session: {0}")]
    InvalidSession(String),
}

/// Errors raised while reading or writing the stats file.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to read the stats file
    #[error("Failed to read stats from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the stats file
    #[error("Failed to write stats to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stats could not be (de)serialized
    #[error("Stats encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Write did not finish within the allotted time
    #[error("Stats write timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The background writer went away
    #[error("Stats writer aborted: {0}")]
    WriterAborted(String),

    /// Store-specific failure
    #[error("{0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Could not resolve the data directory
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
