//! Error types for the durable telemetry logs.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing a telemetry log file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to initialize log at {path}: {source}")]
    Init {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to read log at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write log at {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("log at {path} holds malformed JSON: {source}")]
    Deserialize {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to serialize records for {path}: {source}")]
    Serialize {
        path: String,
        source: serde_json::Error,
    },
}
