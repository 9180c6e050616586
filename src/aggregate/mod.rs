//! Windowed aggregation over the event store.
//!
//! Two passes per scrape: global counts per status class
//! ([`classes`]), then per-destination counts for each class
//! ([`destinations`]). Nothing here mutates the store or the gauges.

mod classes;
mod destinations;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::status::StatusClass;
use crate::store::EventStore;
use crate::window::Window;

pub use classes::ClassCounts;

// ─── Aggregator ──────────────────────────────────────────────────

/// Read-only query runner. Every store call is bounded by `budget`.
#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn EventStore>,
    budget: Duration,
    max_destinations: usize,
}

impl Aggregator {
    pub fn new(store: Arc<dyn EventStore>, budget: Duration, max_destinations: usize) -> Self {
        Self {
            store,
            budget,
            max_destinations,
        }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

// ─── Result ──────────────────────────────────────────────────────

/// What a count is keyed by, next to its status class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Target {
    /// No destination filter.
    Total,
    Destination(String),
}

/// Everything one scrape computed, ready to be published in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationResult {
    pub window: Window,
    pub classes: ClassCounts,
    pub by_destination: BTreeMap<StatusClass, BTreeMap<String, u64>>,
}

impl AggregationResult {
    pub fn new(window: Window, classes: ClassCounts) -> Self {
        Self {
            window,
            classes,
            by_destination: BTreeMap::new(),
        }
    }

    pub fn get(&self, class: StatusClass, target: &Target) -> Option<u64> {
        match target {
            Target::Total => Some(self.classes.get(class)),
            Target::Destination(d) => self.by_destination.get(&class)?.get(d).copied(),
        }
    }

    /// Every `(class, target, count)` triple.
    pub fn entries(&self) -> impl Iterator<Item = (StatusClass, Target, u64)> + '_ {
        let globals = StatusClass::EVERY
            .into_iter()
            .map(move |class| (class, Target::Total, self.classes.get(class)));
        let per_dest = self.by_destination.iter().flat_map(|(class, counts)| {
            counts
                .iter()
                .map(move |(dest, n)| (*class, Target::Destination(dest.clone()), *n))
        });
        globals.chain(per_dest)
    }

    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.by_destination
            .get(&StatusClass::All)
            .into_iter()
            .flat_map(|counts| counts.keys().map(String::as_str))
    }
}
