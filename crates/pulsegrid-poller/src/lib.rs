//! pulsegrid-poller — periodic external-resource sampling for Pulsegrid.
//!
//! On a fixed interval (plus one immediate run at startup), samples
//! CPU/memory for a configured set of services by shelling out to the
//! container runtime, attempts an accelerator-utilization read for the
//! designated primary service, and appends the cycle's batch to the
//! durable sample log.
//!
//! # Architecture
//!
//! ```text
//! ResourcePoller::run()            ← background task, watch shutdown
//!   └── cycle()                    Idle → Sampling → Recording → Idle
//!         ├── StatsSource::service_stats()   per service, failures isolated
//!         ├── StatsSource::gpu_utilization() primary service only
//!         │     └── StatsSource::cpu_load()  log-only fallback
//!         └── TelemetryStore::append_samples()
//! ```
//!
//! Every subprocess call is bounded by a timeout; a hung command is a
//! per-service failure, never a stalled poller.

pub mod error;
pub mod poller;
pub mod source;

pub use error::{SampleError, SampleResult};
pub use poller::{CycleOutcome, PollerConfig, ResourcePoller};
pub use source::{CommandStatsSource, ServiceStats, StatsSource};
