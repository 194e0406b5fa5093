//! HTTP instrumentation middleware.
//!
//! Records one duration observation and one counter increment per request,
//! labeled {method, route, status_code}. The route label is the matched
//! route template, never the raw path — unmatched paths collapse to the
//! literal `"unknown"` so label cardinality stays bounded.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use pulsegrid_registry::Metrics;

/// Status label recorded when the request future is dropped before a
/// response was produced (client disconnected mid-request).
const STATUS_CLIENT_CLOSED: u16 = 499;

/// Records exactly once, on drop.
///
/// Normal and error completions pass through `complete` with the real
/// status code; if the request is abandoned the guard still fires when
/// the task is dropped.
struct RequestGuard {
    metrics: Metrics,
    method: String,
    route: String,
    start: Instant,
    status: Option<u16>,
}

impl RequestGuard {
    fn complete(&mut self, status: u16) {
        self.status = Some(status);
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        let status = self.status.unwrap_or(STATUS_CLIENT_CLOSED);
        self.metrics.observe_http_request(
            &self.method,
            &self.route,
            status,
            self.start.elapsed().as_secs_f64(),
        );
    }
}

/// Instrument one request/response cycle.
pub async fn track_http(State(metrics): State<Metrics>, req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut guard = RequestGuard {
        metrics,
        method,
        route,
        start: Instant::now(),
        status: None,
    };

    let response = next.run(req).await;
    guard.complete(response.status().as_u16());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_records_real_status_when_completed() {
        let metrics = Metrics::new("mw").unwrap();
        {
            let mut guard = RequestGuard {
                metrics: metrics.clone(),
                method: "GET".to_string(),
                route: "/x".to_string(),
                start: Instant::now(),
                status: None,
            };
            guard.complete(200);
        }

        let out = metrics.render().unwrap();
        assert!(out.contains("status_code=\"200\"} 1"));
    }

    #[test]
    fn abandoned_guard_records_client_closed() {
        let metrics = Metrics::new("mw").unwrap();
        {
            let _guard = RequestGuard {
                metrics: metrics.clone(),
                method: "GET".to_string(),
                route: "/x".to_string(),
                start: Instant::now(),
                status: None,
            };
            // Dropped without completion, as when a client disconnects.
        }

        let out = metrics.render().unwrap();
        assert!(out.contains("status_code=\"499\"} 1"));
    }
}
