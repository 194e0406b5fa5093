//! Record types persisted by the telemetry logs.
//!
//! Wire names are camelCase so the files stay readable alongside the
//! dashboards and scripts that already consume them.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped observation of a service's resource usage.
///
/// Usage fields are kept as the raw strings reported by the container
/// runtime (`"12.3%"`, `"1.2GiB / 7.8GiB"`) — parsing is the consumer's
/// concern, and raw strings survive runtime format drift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSample {
    /// ISO-8601 timestamp of the observation.
    pub timestamp: String,
    /// Service name as known to the container runtime.
    pub service: String,
    /// Instantaneous CPU usage, e.g. `"12.34%"`.
    pub cpu_usage: String,
    /// Memory usage in `used / limit` form, e.g. `"1.2GiB / 7.8GiB"`.
    pub memory_usage: String,
    /// Accelerator utilization percentage, present only when the primary
    /// read succeeded for this service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_utilization: Option<String>,
}

impl ResourceSample {
    /// Build a sample stamped with the current UTC time.
    pub fn now(service: &str, cpu_usage: &str, memory_usage: &str) -> Self {
        Self {
            timestamp: iso8601_now(),
            service: service.to_string(),
            cpu_usage: cpu_usage.to_string(),
            memory_usage: memory_usage.to_string(),
            gpu_utilization: None,
        }
    }
}

/// An anomaly record reported by any collaborator — kept forever for audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildIssue {
    /// ISO-8601 date of the report.
    pub date: String,
    /// Service the issue was observed on.
    pub service: String,
    /// Error description.
    pub error: String,
    /// How the issue was resolved, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl BuildIssue {
    /// Build an issue record dated now.
    pub fn now(service: &str, error: &str) -> Self {
        Self {
            date: iso8601_now(),
            service: service.to_string(),
            error: error.to_string(),
            resolution: None,
        }
    }

    /// Attach a resolution note.
    pub fn with_resolution(mut self, resolution: &str) -> Self {
        self.resolution = Some(resolution.to_string());
        self
    }
}

/// Current UTC time in ISO-8601 with millisecond precision.
pub fn iso8601_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
