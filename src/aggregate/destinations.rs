use std::collections::BTreeMap;

use tracing::debug;

use super::Aggregator;
use crate::error::StoreError;
use crate::status::StatusClass;
use crate::store::{timed, TermsQuery};
use crate::window::Window;

impl Aggregator {
    /// Distinct destinations with at least one event in `window`, any
    /// status. Capped at `max_destinations`, busiest first.
    ///
    /// Re-run every scrape: destinations come and go, and a cached set
    /// would silently miss new ones.
    pub async fn discover_destinations(&self, window: Window) -> Result<Vec<String>, StoreError> {
        let query = TermsQuery {
            window: Some(window),
            limit: self.max_destinations,
        };
        let buckets = timed(self.budget, self.store.terms(&query)).await?;
        debug!(%window, found = buckets.len(), "destinations discovered");
        Ok(buckets.into_iter().map(|b| b.key).collect())
    }

    /// Count for every destination in `destinations` under `class`.
    /// Destinations without matching events map to 0 rather than being
    /// left out.
    pub async fn destination_counts(
        &self,
        window: Window,
        class: StatusClass,
        destinations: &[String],
    ) -> Result<BTreeMap<String, u64>, StoreError> {
        if destinations.is_empty() {
            return Ok(BTreeMap::new());
        }
        let counts = timed(
            self.budget,
            self.store.count_by_destination(window, class, destinations),
        )
        .await?;
        if counts.len() != destinations.len() {
            return Err(StoreError::QueryFailed(format!(
                "grouped count returned {} values for {} destinations",
                counts.len(),
                destinations.len()
            )));
        }
        Ok(destinations.iter().cloned().zip(counts).collect())
    }
}
