pub mod events;
pub mod scrape;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{ScrapeError, StoreError};

// ─── Shared response envelope ────────────────────────────────────

/// JSON responses carry timing metadata so producers can see how long the
/// store round-trip took without parsing headers.
#[derive(Debug, Clone, Serialize)]
pub struct TimedResponse<T: Serialize> {
    pub data: T,
    pub timing: RequestTiming,
}

/// Microsecond-precision breakdown of where wall-clock time was spent.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RequestTiming {
    /// Total handler wall time (μs)
    pub total_us: u64,
    /// Time spent inside store calls (μs)
    pub store_us: u64,
    /// Decoding / encoding / routing overhead (μs)
    pub overhead_us: u64,
}

impl RequestTiming {
    pub fn new(total_us: u64, store_us: u64) -> Self {
        Self {
            total_us,
            store_us,
            overhead_us: total_us.saturating_sub(store_us),
        }
    }
}

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    /// Ingestion payload was not a valid event document.
    DecodeFailed(String),
    NotFound(String),
    Store(StoreError),
    Scrape(ScrapeError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<ScrapeError> for AppError {
    fn from(err: ScrapeError) -> Self {
        Self::Scrape(err)
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        StoreError::QueryFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::DecodeFailed(msg) => (StatusCode::BAD_REQUEST, format!("decode failed: {msg}")),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Store(err) => (store_status(&err), err.to_string()),
            Self::Scrape(ScrapeError::Store(err)) => {
                (store_status(&err), format!("scrape failed: {err}"))
            }
            Self::Scrape(err @ ScrapeError::Render(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
