//! Error types for the metric registry.

use thiserror::Error;

/// Errors raised while building or rendering the registry.
///
/// Registration errors are configuration errors and are fatal at startup:
/// the daemon refuses to serve traffic with a broken telemetry pipeline.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to register instrument: {0}")]
    Register(#[source] prometheus::Error),

    #[error("failed to render metrics: {0}")]
    Render(#[source] prometheus::Error),

    #[error("metrics rendering produced invalid UTF-8")]
    Utf8,
}
