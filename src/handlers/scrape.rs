use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use crate::AppState;

use super::AppError;

// ─── GET /metrics ────────────────────────────────────────────────

/// Runs one aggregation cycle, then returns the text exposition.
/// A failed cycle answers non-2xx and leaves the gauges as they were.
pub async fn scrape_metrics(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let body = state.scraper.scrape_and_render().await.map_err(|err| {
        error!(error = %err, "scrape failed");
        AppError::from(err)
    })?;

    let content_type = HeaderValue::from_str(&state.scraper.registry().content_type())
        .unwrap_or_else(|_| HeaderValue::from_static("text/plain; version=0.0.4"));

    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

// ─── GET /healthz ────────────────────────────────────────────────

pub async fn healthz() -> &'static str {
    "ok"
}
