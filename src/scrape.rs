use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::aggregate::{AggregationResult, Aggregator};
use crate::error::ScrapeError;
use crate::metrics::GaugeRegistry;
use crate::status::StatusClass;
use crate::store::{timed, EventStore};
use crate::window::{Clock, Window};

/// Tunables for one scrape cycle.
#[derive(Debug, Clone, Copy)]
pub struct ScrapeSettings {
    pub look_back: chrono::Duration,
    pub look_ahead: chrono::Duration,
    /// Budget for each individual store call.
    pub store_timeout: Duration,
    /// Size of the destination terms query.
    pub max_destinations: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            look_back: chrono::Duration::seconds(10),
            look_ahead: chrono::Duration::seconds(10),
            store_timeout: Duration::from_secs(2),
            max_destinations: 100,
        }
    }
}

/// Runs scrape cycles: compute the window, aggregate, publish.
///
/// Every store query for a cycle completes before the registry is touched.
/// If any of them fails the cycle is abandoned and the gauges keep the
/// previous cycle's values.
#[derive(Clone)]
pub struct Scraper {
    aggregator: Aggregator,
    registry: Arc<GaugeRegistry>,
    clock: Arc<dyn Clock>,
    settings: ScrapeSettings,
}

impl Scraper {
    pub fn new(
        store: Arc<dyn EventStore>,
        registry: Arc<GaugeRegistry>,
        clock: Arc<dyn Clock>,
        settings: ScrapeSettings,
    ) -> Self {
        Self {
            aggregator: Aggregator::new(store, settings.store_timeout, settings.max_destinations),
            registry,
            clock,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<GaugeRegistry> {
        &self.registry
    }

    pub fn window(&self) -> Window {
        Window::compute(
            self.clock.now(),
            self.settings.look_back,
            self.settings.look_ahead,
        )
    }

    /// One full cycle. Returns what was published.
    pub async fn scrape(&self) -> Result<AggregationResult, ScrapeError> {
        let started = Instant::now();
        let store = self.aggregator.store();
        timed(self.aggregator.budget(), store.ensure_collection()).await?;

        let window = self.window();
        let result = self.aggregate(window).await?;

        let elapsed = started.elapsed();
        self.registry.publish(&result, elapsed);
        debug!(
            %window,
            all = result.classes.all,
            destinations = result.by_destination.get(&StatusClass::All).map_or(0, |d| d.len()),
            elapsed_ms = elapsed.as_millis() as u64,
            "scrape published"
        );
        Ok(result)
    }

    /// A cycle followed by the text exposition of the registry.
    pub async fn scrape_and_render(&self) -> Result<String, ScrapeError> {
        self.scrape().await?;
        Ok(self.registry.render()?)
    }

    /// Query-only half of a cycle.
    async fn aggregate(&self, window: Window) -> Result<AggregationResult, ScrapeError> {
        let classes = self.aggregator.class_counts(window).await?;

        // Anything published before must be recomputed too, or it would
        // keep its last value once it drops out of discovery.
        let mut destinations: BTreeSet<String> = self
            .aggregator
            .discover_destinations(window)
            .await?
            .into_iter()
            .collect();
        destinations.extend(self.registry.known_destinations());
        let destinations: Vec<String> = destinations.into_iter().collect();

        let mut result = AggregationResult::new(window, classes);
        for class in StatusClass::EVERY {
            let counts = self
                .aggregator
                .destination_counts(window, class, &destinations)
                .await?;
            result.by_destination.insert(class, counts);
        }
        Ok(result)
    }
}
