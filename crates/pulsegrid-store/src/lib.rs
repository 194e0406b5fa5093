//! pulsegrid-store — durable telemetry logs for Pulsegrid.
//!
//! Persists resource samples and build issues as pretty-printed JSON array
//! files, one file per record type. Appends are read-modify-write under a
//! per-file mutex, with optional most-recent-N retention for the sample log.
//!
//! # Architecture
//!
//! ```text
//! TelemetryStore
//!   ├── metrics.json       ← ResourceSample, capped (FIFO eviction)
//!   └── build-issues.json  ← BuildIssue, unbounded (audit log)
//! ```
//!
//! The store is `Clone` + `Send` + `Sync`; clones share the per-file locks,
//! so concurrent in-process appends to the same file serialize instead of
//! losing updates. This pipeline is the sole writer of these files — there
//! is no cross-process locking.

pub mod error;
pub mod log;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use log::JsonLog;
pub use store::TelemetryStore;
pub use types::{BuildIssue, ResourceSample};
