//! Stats sources — the subprocess boundary of the poller.
//!
//! `StatsSource` is the seam between cycle semantics and the OS: one async
//! method per external command. `CommandStatsSource` is the production
//! implementation; tests substitute their own.

use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::error::{SampleError, SampleResult};

/// Instantaneous resource usage for one service, as reported by the
/// container runtime. Kept as raw strings (see `ResourceSample`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    pub cpu_usage: String,
    pub memory_usage: String,
}

/// Source of external resource readings.
///
/// Each method is one bounded external command; implementations must not
/// block the calling task beyond their configured timeout.
pub trait StatsSource: Send + Sync {
    /// CPU/memory usage for a single service.
    fn service_stats(
        &self,
        service: &str,
    ) -> impl Future<Output = SampleResult<ServiceStats>> + Send;

    /// The primary accelerator-utilization read, as a percentage.
    fn gpu_utilization(&self) -> impl Future<Output = SampleResult<f64>> + Send;

    /// Aggregate CPU load across all processes — the informational
    /// fallback when the accelerator read is unavailable.
    fn cpu_load(&self) -> impl Future<Output = SampleResult<f64>> + Send;
}

/// Default execution timeout per external command.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Format string handed to `docker stats`: one tab-separated line.
const DOCKER_STATS_FORMAT: &str = "{{.CPUPerc}}\t{{.MemUsage}}";

/// Samples via the `docker`, `ioreg`, and `ps` binaries.
///
/// Binary paths are fields so deployments (and tests) can point them at
/// wrappers, the same way the packers resolve their toolchains.
pub struct CommandStatsSource {
    docker_bin: String,
    ioreg_bin: String,
    ps_bin: String,
    timeout: Duration,
    device_util: Regex,
}

impl Default for CommandStatsSource {
    fn default() -> Self {
        Self::new("docker", "ioreg", "ps", DEFAULT_COMMAND_TIMEOUT)
    }
}

impl CommandStatsSource {
    /// Build a source with explicit binary paths and command timeout.
    pub fn new(docker_bin: &str, ioreg_bin: &str, ps_bin: &str, timeout: Duration) -> Self {
        Self {
            docker_bin: docker_bin.to_string(),
            ioreg_bin: ioreg_bin.to_string(),
            ps_bin: ps_bin.to_string(),
            timeout,
            // The hardware-statistics registry prints the field as
            // "Device Utilization %"=NN inside the GPU statistics dict.
            device_util: Regex::new(r#""Device Utilization %"=(\d+(?:\.\d+)?)"#)
                .expect("literal pattern compiles"),
        }
    }

    /// Run one command to completion within the timeout, returning stdout.
    async fn run(&self, program: &str, args: &[&str]) -> SampleResult<String> {
        debug!(%program, ?args, "running stats command");
        let result = tokio::time::timeout(
            self.timeout,
            Command::new(program).args(args).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| SampleError::Timeout {
            command: program.to_string(),
            timeout: self.timeout,
        })?;

        let output = result.map_err(|e| SampleError::Spawn {
            command: program.to_string(),
            source: e,
        })?;

        if !output.status.success() {
            return Err(SampleError::CommandFailed {
                command: program.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl StatsSource for CommandStatsSource {
    async fn service_stats(&self, service: &str) -> SampleResult<ServiceStats> {
        let stdout = self
            .run(
                &self.docker_bin,
                &[
                    "stats",
                    "--no-stream",
                    "--format",
                    DOCKER_STATS_FORMAT,
                    service,
                ],
            )
            .await?;

        parse_stats_line(&self.docker_bin, &stdout)
    }

    async fn gpu_utilization(&self) -> SampleResult<f64> {
        let stdout = self.run(&self.ioreg_bin, &["-l"]).await?;

        let captured = self
            .device_util
            .captures(&stdout)
            .and_then(|c| c.get(1))
            .ok_or_else(|| SampleError::Parse {
                command: self.ioreg_bin.clone(),
                detail: "no Device Utilization % field in output".to_string(),
            })?;

        let pct: f64 = captured.as_str().parse().map_err(|_| SampleError::Parse {
            command: self.ioreg_bin.clone(),
            detail: format!("non-numeric utilization `{}`", captured.as_str()),
        })?;
        Ok(pct)
    }

    async fn cpu_load(&self) -> SampleResult<f64> {
        let stdout = self.run(&self.ps_bin, &["-A", "-o", "%cpu"]).await?;

        // First line is the %CPU column header.
        let mut total = 0.0;
        for line in stdout.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            total += line.parse::<f64>().map_err(|_| SampleError::Parse {
                command: self.ps_bin.clone(),
                detail: format!("non-numeric cpu value `{line}`"),
            })?;
        }
        Ok(total)
    }
}

/// Parse one tab-separated `cpu<TAB>memory` stats line.
fn parse_stats_line(command: &str, stdout: &str) -> SampleResult<ServiceStats> {
    let line = stdout.lines().next().unwrap_or("").trim();
    let mut fields = line.split('\t');

    match (fields.next(), fields.next()) {
        (Some(cpu), Some(mem)) if !cpu.is_empty() && !mem.is_empty() => Ok(ServiceStats {
            cpu_usage: cpu.trim().to_string(),
            memory_usage: mem.trim().to_string(),
        }),
        _ => Err(SampleError::Parse {
            command: command.to_string(),
            detail: format!("expected `cpu<TAB>memory`, got `{line}`"),
        }),
    }
}
