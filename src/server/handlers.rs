//! HTTP request handlers
//!
//! Contains handlers for all HTTP endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;
use tracing::{debug, instrument};

use super::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health status
    status: String,
    /// Application version
    version: String,
    /// Polls attempted so far
    scrapes: u64,
    /// Polls that failed
    failures: u64,
}

/// Root endpoint - displays basic info
pub async fn root(State(state): State<AppState>) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Hadoop Exporter</title>
</head>
<body>
    <h1>Hadoop {} Exporter</h1>
    <p>Version: {}</p>
    <p>Target: {}</p>
    <ul>
        <li><a href="/health">Health Check</a></li>
        <li><a href="{}">Metrics</a></li>
    </ul>
</body>
</html>"#,
        state.config.target.kind,
        env!("CARGO_PKG_VERSION"),
        state.config.target.url,
        state.config.server.path
    );
    Html(html)
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.poller.stats();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        scrapes: stats.scrapes(),
        failures: stats.failures(),
    })
}

/// Exposition endpoint. One poll of the target per request; when the poll
/// fails the previous gauge values are served and the failure shows up in
/// the exporter's own counters.
#[instrument(skip(state), name = "metrics_handler")]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    // The poller logs and counts failures itself.
    if let Ok(report) = state.poller.poll().await {
        debug!(
            matched = report.matched,
            suppressed = report.suppressed,
            "Metrics collection complete"
        );
    }

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.poller.render(),
    )
}
