//! pulsegrid-api — the HTTP surface of the telemetry pipeline.
//!
//! Wraps every inbound request in the instrumentation middleware and
//! serves the scrape endpoint plus the telemetry REST routes.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus text exposition |
//! | GET | `/healthz` | Liveness probe |
//! | GET | `/api/v1/samples` | Recent resource samples |
//! | GET | `/api/v1/issues` | All recorded build issues |
//! | POST | `/api/v1/issues` | Record a build issue |

pub mod handlers;
pub mod middleware;

use axum::Router;
use axum::routing::get;

use pulsegrid_registry::Metrics;
use pulsegrid_store::TelemetryStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub metrics: Metrics,
    pub store: TelemetryStore,
}

/// Build the complete router, instrumented end to end.
///
/// The instrumentation layer wraps every route *and* the fallback, so an
/// unmatched path still produces exactly one observation (with the route
/// label pinned to `"unknown"`).
pub fn build_router(metrics: Metrics, store: TelemetryStore) -> Router {
    let state = ApiState {
        metrics: metrics.clone(),
        store,
    };

    let api_routes = Router::new()
        .route("/samples", get(handlers::list_samples))
        .route(
            "/issues",
            get(handlers::list_issues).post(handlers::create_issue),
        )
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route(
            "/metrics",
            get(handlers::prometheus_metrics).with_state(state),
        )
        .route("/healthz", get(handlers::healthz))
        .layer(axum::middleware::from_fn_with_state(
            metrics,
            middleware::track_http,
        ))
}
