//! The poll cycle and its background loop.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use pulsegrid_registry::Metrics;
use pulsegrid_store::{ResourceSample, TelemetryStore};

use crate::source::StatsSource;

/// Configuration for the resource poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Services to sample each cycle, by container-runtime name.
    pub services: Vec<String>,
    /// The one service whose cycle also attempts the accelerator read.
    pub primary_service: String,
    /// Interval between cycles.
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            services: vec![
                "pulsegrid-backend".to_string(),
                "pulsegrid-frontend".to_string(),
                "qdrant".to_string(),
            ],
            primary_service: "pulsegrid-backend".to_string(),
            interval: Duration::from_secs(300),
        }
    }
}

/// What a single poll cycle accomplished.
#[derive(Debug)]
pub struct CycleOutcome {
    /// Samples collected this cycle, in service order.
    pub samples: Vec<ResourceSample>,
    /// Services whose sampling failed.
    pub failed: Vec<String>,
    /// Whether the batch reached the durable log.
    pub persisted: bool,
}

/// Samples external resource usage on a fixed interval and records it.
pub struct ResourcePoller<S> {
    source: S,
    config: PollerConfig,
    metrics: Metrics,
    store: TelemetryStore,
}

impl<S: StatsSource> ResourcePoller<S> {
    /// Create a poller over the given stats source.
    pub fn new(source: S, config: PollerConfig, metrics: Metrics, store: TelemetryStore) -> Self {
        Self {
            source,
            config,
            metrics,
            store,
        }
    }

    /// Run one full poll cycle: sample every service, then persist.
    ///
    /// A single service failing is logged and skipped; the remaining
    /// services are still sampled and the partial batch still persisted.
    pub async fn cycle(&self) -> CycleOutcome {
        let mut samples = Vec::with_capacity(self.config.services.len());
        let mut failed = Vec::new();

        for service in &self.config.services {
            match self.source.service_stats(service).await {
                Ok(stats) => {
                    let mut sample =
                        ResourceSample::now(service, &stats.cpu_usage, &stats.memory_usage);
                    if *service == self.config.primary_service {
                        self.read_accelerator(&mut sample).await;
                    }
                    samples.push(sample);
                }
                Err(e) => {
                    warn!(%service, error = %e, "service sampling failed, skipping");
                    failed.push(service.clone());
                }
            }
        }

        let persisted = match self.store.append_samples(&samples).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to persist resource samples");
                false
            }
        };

        info!(
            sampled = samples.len(),
            failed = failed.len(),
            persisted,
            "poll cycle complete"
        );
        CycleOutcome {
            samples,
            failed,
            persisted,
        }
    }

    /// Attempt the primary accelerator read for the primary service.
    ///
    /// Only a successful, finite primary read updates the gauge and the
    /// sample. The CPU-load fallback is informational log output and must
    /// never masquerade as an accelerator metric.
    async fn read_accelerator(&self, sample: &mut ResourceSample) {
        match self.source.gpu_utilization().await {
            Ok(pct) if pct.is_finite() => {
                self.metrics.set_gpu_utilization(pct);
                sample.gpu_utilization = Some(format!("{pct}"));
            }
            Ok(pct) => {
                warn!(value = pct, "accelerator read returned a non-finite value");
                self.log_cpu_fallback().await;
            }
            Err(e) => {
                warn!(error = %e, "accelerator read failed");
                self.log_cpu_fallback().await;
            }
        }
    }

    async fn log_cpu_fallback(&self) {
        match self.source.cpu_load().await {
            Ok(load) => {
                info!(cpu_load = load, "system running on CPU");
            }
            Err(e) => {
                warn!(error = %e, "cpu load fallback failed");
            }
        }
    }

    /// Poll immediately, then on every interval tick until shutdown.
    ///
    /// Shutdown stops scheduling new cycles; it does not interrupt an
    /// in-flight cycle beyond the select arm.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            services = self.config.services.len(),
            primary = %self.config.primary_service,
            "resource poller started"
        );

        self.cycle().await;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {
                    self.cycle().await;
                }
                _ = shutdown.changed() => {
                    info!("resource poller shutting down");
                    break;
                }
            }
        }
    }
}
