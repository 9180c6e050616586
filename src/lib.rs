//! Windowed request-status gauges.
//!
//! Producers post request/response events; every Prometheus scrape
//! re-aggregates the events of a short window around "now" into per-class
//! and per-destination gauges.

use std::sync::Arc;
use std::time::Duration;

pub mod aggregate;
pub mod config;
pub mod error;
pub mod event;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod scrape;
pub mod server;
pub mod status;
pub mod store;
pub mod window;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Where ingested events go and scrapes read from.
    pub store: Arc<dyn store::EventStore>,

    /// Aggregates and publishes on every `/metrics` request.
    pub scraper: scrape::Scraper,

    /// Stamps ingested events. Shared with the scraper so both agree on "now".
    pub clock: Arc<dyn window::Clock>,

    /// Budget for each store call made by the ingestion handlers.
    pub store_timeout: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn store::EventStore>,
        registry: Arc<metrics::GaugeRegistry>,
        clock: Arc<dyn window::Clock>,
        settings: scrape::ScrapeSettings,
    ) -> Self {
        let scraper = scrape::Scraper::new(store.clone(), registry, clock.clone(), settings);
        Self {
            store,
            scraper,
            clock,
            store_timeout: settings.store_timeout,
        }
    }
}
