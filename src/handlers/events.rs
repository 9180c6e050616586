use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::event::Event;
use crate::store::timed;
use crate::window::Stamp;
use crate::AppState;

use super::{AppError, RequestTiming, TimedResponse};

/// What a producer gets back for a stored event.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub id: String,
    #[serde(rename = "Datetime")]
    pub recorded_at: String,
}

// ─── POST /metrics/create ────────────────────────────────────────

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<TimedResponse<Receipt>>), AppError> {
    let t0 = Instant::now();

    let mut event: Event = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "rejected ingestion payload");
        AppError::DecodeFailed(e.to_string())
    })?;
    event.assign(
        uuid::Uuid::new_v4().to_string(),
        Stamp::from_datetime(state.clock.now()),
    );

    // ── Store WRITE ─────────────────────────────────────────────
    let t_store = Instant::now();
    timed(state.store_timeout, state.store.ensure_collection()).await?;
    timed(state.store_timeout, state.store.insert(&event)).await?;
    let store_us = t_store.elapsed().as_micros() as u64;
    // ────────────────────────────────────────────────────────────

    debug!(
        id = %event.id,
        destination = %event.destination,
        status = event.status(),
        "event stored"
    );

    Ok((
        StatusCode::CREATED,
        Json(TimedResponse {
            data: Receipt {
                id: event.id,
                recorded_at: event.recorded_at,
            },
            timing: RequestTiming::new(t0.elapsed().as_micros() as u64, store_us),
        }),
    ))
}

// ─── GET /metrics/events/:id ─────────────────────────────────────

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TimedResponse<Event>>, AppError> {
    let t0 = Instant::now();

    // ── Store READ ──────────────────────────────────────────────
    let t_store = Instant::now();
    let found = timed(state.store_timeout, state.store.get(&id)).await?;
    let store_us = t_store.elapsed().as_micros() as u64;
    // ────────────────────────────────────────────────────────────

    let event = found.ok_or_else(|| AppError::NotFound(format!("event '{id}' not found")))?;

    Ok(Json(TimedResponse {
        data: event,
        timing: RequestTiming::new(t0.elapsed().as_micros() as u64, store_us),
    }))
}
