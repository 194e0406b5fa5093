//! pulsegrid-registry — in-process metric instruments for Pulsegrid.
//!
//! Wraps a dedicated `prometheus::Registry` (no global default registry)
//! holding the pipeline's contract instruments, and renders them in the
//! text exposition format for the scrape endpoint.
//!
//! # Exposed instrument families (under a configurable prefix)
//!
//! | family | kind | labels |
//! |---|---|---|
//! | `http_request_duration_seconds` | histogram | method, route, status_code |
//! | `http_requests_total` | counter | method, route, status_code |
//! | `gpu_utilization` | gauge | — |
//! | `model_inference_seconds` | histogram | model_name |
//!
//! Default process metrics (uptime, RSS, fds) are collected on Linux.
//!
//! `Metrics` is `Clone + Send + Sync` and is handed to the HTTP middleware
//! and the resource poller by the composition root — fresh instances per
//! test, no ambient state.

pub mod error;
pub mod instruments;

pub use error::RegistryError;
pub use instruments::{DEFAULT_PREFIX, Metrics};
