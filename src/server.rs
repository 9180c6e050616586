use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Scrape ──────────────────────────────────────────────
        .route("/metrics", get(handlers::scrape::scrape_metrics))
        // ── Ingestion ───────────────────────────────────────────
        .route("/metrics/create", post(handlers::events::create_event))
        .route("/metrics/events/:id", get(handlers::events::get_event))
        // ── Liveness ────────────────────────────────────────────
        .route("/healthz", get(handlers::scrape::healthz))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}
