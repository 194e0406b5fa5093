//! Telemetry route handlers.
//!
//! Read paths serve best-available data: a partially failed poll cycle is
//! invisible here beyond the records it did manage to persist.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::error;

use pulsegrid_store::BuildIssue;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Scrape endpoint ────────────────────────────────────────────

/// GET /metrics — the text exposition for the external scraper.
pub async fn prometheus_metrics(State(state): State<ApiState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, state.metrics.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "OK"
}

// ── Resource samples ───────────────────────────────────────────

#[derive(serde::Deserialize)]
pub struct SamplesQuery {
    /// Maximum number of samples to return, newest-tail.
    pub limit: Option<usize>,
}

/// GET /api/v1/samples
pub async fn list_samples(
    State(state): State<ApiState>,
    Query(query): Query<SamplesQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(100);
    match state.store.recent_samples(limit).await {
        Ok(samples) => ApiResponse::ok(samples).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Build issues ───────────────────────────────────────────────

/// Request body for reporting an anomaly.
#[derive(serde::Deserialize)]
pub struct IssueRequest {
    pub service: String,
    pub error: String,
    pub resolution: Option<String>,
}

/// GET /api/v1/issues
pub async fn list_issues(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.issues().await {
        Ok(issues) => ApiResponse::ok(issues).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// POST /api/v1/issues
pub async fn create_issue(
    State(state): State<ApiState>,
    Json(req): Json<IssueRequest>,
) -> impl IntoResponse {
    let mut issue = BuildIssue::now(&req.service, &req.error);
    if let Some(resolution) = &req.resolution {
        issue = issue.with_resolution(resolution);
    }

    match state.store.try_record_issue(issue.clone()).await {
        Ok(()) => (StatusCode::CREATED, ApiResponse::ok(issue)).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}
