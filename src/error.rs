//! Error types for configuration loading and the persistent currency store.
//!
//! Gameplay itself never fails: rejected actions and missing targets degrade to
//! "nothing happens this tick". Only the edges that touch files return errors.

use thiserror::Error;

/// Errors that can occur when loading a match configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// RON parsing failed.
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension is neither `.ron` nor `.json`.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of its allowed range.
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors raised by a persistent currency/upgrade store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
