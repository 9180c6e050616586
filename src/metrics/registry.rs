use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use parking_lot::Mutex;
use prometheus::{Encoder, Gauge, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::aggregate::{AggregationResult, Target};
use crate::status::StatusClass;

// ─── Metric names ────────────────────────────────────────────────

pub const BY_DESTINATION: &str = "qtty_reqs_counter";
pub const SCRAPE_DURATION: &str = "qtty_scrape_duration_seconds";
pub const KNOWN_DESTINATIONS: &str = "qtty_reqs_known_destinations";

/// Name and help text of the global gauge for `class`.
pub fn global_name(class: StatusClass) -> (&'static str, &'static str) {
    match class {
        StatusClass::All => ("qtty_reqs_counter_status_total", "Total Requests Count"),
        StatusClass::Success => ("qtty_reqs_counter_status_200", "Total 200 Requests Count"),
        StatusClass::ClientError => ("qtty_reqs_counter_status_400", "Total 400 Requests Count"),
        StatusClass::ServerError => ("qtty_reqs_counter_status_500", "Total 500 Requests Count"),
    }
}

// ─── Public types ────────────────────────────────────────────────

/// The published gauges. One instance per process, shared by reference.
///
/// All writes are overwrites. Publishing a scrape and rendering both take
/// the same lock, so a reader sees either the previous scrape or the new
/// one, never a mix.
pub struct GaugeRegistry {
    registry: Registry,
    inner: Mutex<Inner>,
}

struct Inner {
    globals: HashMap<StatusClass, IntGauge>,
    by_destination: IntGaugeVec,
    scrape_duration: Gauge,
    known_destinations: IntGauge,
    destinations: BTreeSet<String>,
}

impl GaugeRegistry {
    /// Registers every gauge and sets the global ones to 0, so a process
    /// that has never scraped still reports well-formed series.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let mut globals = HashMap::new();
        for class in StatusClass::EVERY {
            let (name, help) = global_name(class);
            let gauge = IntGauge::with_opts(Opts::new(name, help))?;
            registry.register(Box::new(gauge.clone()))?;
            gauge.set(0);
            globals.insert(class, gauge);
        }

        let by_destination = IntGaugeVec::new(
            Opts::new(BY_DESTINATION, "Requests by Dest"),
            &["destination", "status"],
        )?;
        registry.register(Box::new(by_destination.clone()))?;

        let scrape_duration = Gauge::with_opts(Opts::new(
            SCRAPE_DURATION,
            "Wall time of the last successful scrape",
        ))?;
        registry.register(Box::new(scrape_duration.clone()))?;

        let known_destinations = IntGauge::with_opts(Opts::new(
            KNOWN_DESTINATIONS,
            "Destinations with published per-destination gauges",
        ))?;
        registry.register(Box::new(known_destinations.clone()))?;

        Ok(Self {
            registry,
            inner: Mutex::new(Inner {
                globals,
                by_destination,
                scrape_duration,
                known_destinations,
                destinations: BTreeSet::new(),
            }),
        })
    }

    pub fn set_global(&self, class: StatusClass, value: u64) {
        self.inner.lock().set_global(class, value);
    }

    pub fn set_by_destination(&self, destination: &str, class: StatusClass, value: u64) {
        self.inner.lock().set_by_destination(destination, class, value);
    }

    /// Overwrite every gauge the scrape computed, atomically with respect
    /// to other publishers and to `render`.
    pub fn publish(&self, result: &AggregationResult, elapsed: Duration) {
        let mut inner = self.inner.lock();
        for (class, target, value) in result.entries() {
            match target {
                Target::Total => inner.set_global(class, value),
                Target::Destination(dest) => inner.set_by_destination(&dest, class, value),
            }
        }
        inner.scrape_duration.set(elapsed.as_secs_f64());
    }

    /// Destinations that have had gauges published. Never shrinks.
    pub fn known_destinations(&self) -> Vec<String> {
        self.inner.lock().destinations.iter().cloned().collect()
    }

    pub fn global(&self, class: StatusClass) -> i64 {
        self.inner.lock().globals.get(&class).map_or(0, IntGauge::get)
    }

    /// `None` if nothing was ever published for `destination`.
    pub fn by_destination(&self, destination: &str, class: StatusClass) -> Option<i64> {
        let inner = self.inner.lock();
        if !inner.destinations.contains(destination) {
            return None;
        }
        inner
            .by_destination
            .get_metric_with_label_values(&[destination, class.label()])
            .ok()
            .map(|g| g.get())
    }

    /// Text exposition of every registered gauge.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let _guard = self.inner.lock();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// `Content-Type` of [`render`](Self::render) output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn set_global(&mut self, class: StatusClass, value: u64) {
        if let Some(gauge) = self.globals.get(&class) {
            gauge.set(clamp(value));
        }
    }

    fn set_by_destination(&mut self, destination: &str, class: StatusClass, value: u64) {
        self.by_destination
            .with_label_values(&[destination, class.label()])
            .set(clamp(value));
        if self.destinations.insert(destination.to_owned()) {
            self.known_destinations.set(clamp(self.destinations.len() as u64));
        }
    }
}

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
