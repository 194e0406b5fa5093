//! pulsed — the Pulsegrid daemon.
//!
//! Single binary that assembles the telemetry pipeline:
//! - Metric registry (instruments + exposition)
//! - Durable telemetry store (samples + build issues)
//! - Resource poller (background task)
//! - Instrumented HTTP API + scrape endpoint
//!
//! # Usage
//!
//! ```text
//! pulsed run --port 8080 --data-dir /var/lib/pulsegrid/metrics
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use pulsegrid_poller::{CommandStatsSource, PollerConfig, ResourcePoller};
use pulsegrid_registry::{DEFAULT_PREFIX, Metrics};
use pulsegrid_store::TelemetryStore;

#[derive(Parser)]
#[command(name = "pulsed", about = "Pulsegrid telemetry daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the telemetry pipeline.
    Run {
        /// Port to listen on.
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Data directory for the durable telemetry logs.
        #[arg(long, default_value = "/var/lib/pulsegrid/metrics")]
        data_dir: PathBuf,

        /// Metric name prefix for the exposition format.
        #[arg(long, default_value = DEFAULT_PREFIX)]
        prefix: String,

        /// Poll interval in seconds.
        #[arg(long, default_value = "300")]
        poll_interval: u64,

        /// Per-command execution timeout in seconds.
        #[arg(long, default_value = "10")]
        command_timeout: u64,

        /// Services to sample, comma-separated.
        #[arg(
            long,
            value_delimiter = ',',
            default_value = "pulsegrid-backend,pulsegrid-frontend,qdrant"
        )]
        services: Vec<String>,

        /// The service that also gets the accelerator read.
        #[arg(long, default_value = "pulsegrid-backend")]
        primary_service: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pulsed=debug,pulsegrid=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            port,
            data_dir,
            prefix,
            poll_interval,
            command_timeout,
            services,
            primary_service,
        } => {
            run(
                port,
                data_dir,
                prefix,
                poll_interval,
                command_timeout,
                services,
                primary_service,
            )
            .await
        }
    }
}

async fn run(
    port: u16,
    data_dir: PathBuf,
    prefix: String,
    poll_interval: u64,
    command_timeout: u64,
    services: Vec<String>,
    primary_service: String,
) -> anyhow::Result<()> {
    info!("Pulsegrid daemon starting");

    // ── Initialize subsystems ──────────────────────────────────
    // A broken telemetry pipeline is fatal here: the process refuses to
    // serve traffic without it.

    let metrics = Metrics::new(&prefix).context("failed to build metric registry")?;
    info!(%prefix, "metric registry initialized");

    let store = TelemetryStore::open(&data_dir);
    store
        .init()
        .await
        .context("failed to initialize telemetry store")?;
    info!(path = %data_dir.display(), "telemetry store initialized");

    let source = CommandStatsSource::new(
        "docker",
        "ioreg",
        "ps",
        Duration::from_secs(command_timeout),
    );
    let poller = ResourcePoller::new(
        source,
        PollerConfig {
            services,
            primary_service,
            interval: Duration::from_secs(poll_interval),
        },
        metrics.clone(),
        store.clone(),
    );
    info!(interval = poll_interval, "resource poller initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let poller_handle = tokio::spawn(async move {
        poller.run(shutdown_rx).await;
    });

    // ── Start API server ───────────────────────────────────────

    let router = pulsegrid_api::build_router(metrics, store);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Wait for background tasks.
    let _ = poller_handle.await;

    info!("Pulsegrid daemon stopped");
    Ok(())
}
