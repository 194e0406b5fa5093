//! TelemetryStore — the two durable logs behind one facade.
//!
//! Owns the capped resource-sample log and the unbounded build-issue log.
//! Write failures on the issue path are swallowed and logged so a caller
//! on the request-serving path can never be taken down by telemetry.

use std::path::Path;

use tracing::warn;

use crate::error::StoreResult;
use crate::log::JsonLog;
use crate::types::{BuildIssue, ResourceSample};

/// Default retention for the resource-sample log.
pub const DEFAULT_SAMPLE_CAP: usize = 1000;

/// File name of the resource-sample log.
const METRICS_FILE: &str = "metrics.json";
/// File name of the build-issue log.
const ISSUES_FILE: &str = "build-issues.json";

/// Durable store for resource samples and build issues.
#[derive(Clone)]
pub struct TelemetryStore {
    samples: JsonLog<ResourceSample>,
    issues: JsonLog<BuildIssue>,
}

impl TelemetryStore {
    /// Create a store rooted at `data_dir` with the default sample cap.
    pub fn open(data_dir: &Path) -> Self {
        Self::with_sample_cap(data_dir, DEFAULT_SAMPLE_CAP)
    }

    /// Create a store with an explicit sample retention cap.
    pub fn with_sample_cap(data_dir: &Path, cap: usize) -> Self {
        Self {
            samples: JsonLog::new(data_dir.join(METRICS_FILE), Some(cap)),
            issues: JsonLog::new(data_dir.join(ISSUES_FILE), None),
        }
    }

    /// Ensure both log files exist. Safe to call on every process start.
    pub async fn init(&self) -> StoreResult<()> {
        self.samples.init().await?;
        self.issues.init().await?;
        Ok(())
    }

    /// Append a poll cycle's batch of resource samples.
    pub async fn append_samples(&self, batch: &[ResourceSample]) -> StoreResult<()> {
        self.samples.append(batch).await
    }

    /// The most recent `limit` samples, oldest first.
    pub async fn recent_samples(&self, limit: usize) -> StoreResult<Vec<ResourceSample>> {
        let mut all = self.samples.read_all().await?;
        if all.len() > limit {
            all.drain(..all.len() - limit);
        }
        Ok(all)
    }

    /// Record an anomaly, propagating any store failure to the caller.
    pub async fn try_record_issue(&self, issue: BuildIssue) -> StoreResult<()> {
        self.issues.append(std::slice::from_ref(&issue)).await
    }

    /// Record an anomaly, swallowing failures.
    ///
    /// Durability of telemetry is best-effort: a failure here is logged
    /// and the caller proceeds as if the write succeeded.
    pub async fn record_issue(&self, issue: BuildIssue) {
        if let Err(e) = self.try_record_issue(issue).await {
            warn!(error = %e, "failed to record build issue");
        }
    }

    /// Every recorded issue, oldest first.
    pub async fn issues(&self) -> StoreResult<Vec<BuildIssue>> {
        self.issues.read_all().await
    }
}
