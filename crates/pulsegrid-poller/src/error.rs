//! Error types for external-resource sampling.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for sampling operations.
pub type SampleResult<T> = Result<T, SampleError>;

/// Errors from a single external command invocation.
///
/// All of these are transient, per-service failures: the poll cycle logs
/// them and moves on to the next service.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` exceeded the {timeout:?} execution timeout")]
    Timeout { command: String, timeout: Duration },

    #[error("`{command}` exited with failure: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("could not parse `{command}` output: {detail}")]
    Parse { command: String, detail: String },
}
