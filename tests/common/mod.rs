#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;

use reqs_window_exporter::error::StoreError;
use reqs_window_exporter::event::Event;
use reqs_window_exporter::metrics::GaugeRegistry;
use reqs_window_exporter::scrape::{ScrapeSettings, Scraper};
use reqs_window_exporter::status::StatusClass;
use reqs_window_exporter::store::{CountQuery, EventStore, MemoryEventStore, TermBucket, TermsQuery};
use reqs_window_exporter::window::{FixedClock, Stamp};

/// 2024-05-01 12:00:00, the "now" every test scrapes at unless it says otherwise.
pub fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub fn stamp_at(offset_secs: i64) -> Stamp {
    Stamp::from_datetime(noon() + chrono::Duration::seconds(offset_secs))
}

/// Inserts `(destination, status, seconds from noon)` triples.
pub async fn seed(store: &dyn EventStore, events: &[(&str, i32, i64)]) {
    for (dest, status, offset) in events {
        let mut event = Event::new(*dest, *status);
        event.assign(uuid::Uuid::new_v4().to_string(), stamp_at(*offset));
        store.insert(&event).await.unwrap();
    }
}

pub fn scraper_at(
    store: Arc<dyn EventStore>,
    registry: Arc<GaugeRegistry>,
    now: NaiveDateTime,
) -> Scraper {
    Scraper::new(store, registry, Arc::new(FixedClock(now)), ScrapeSettings::default())
}

pub fn scraper(store: Arc<dyn EventStore>) -> Scraper {
    scraper_at(store, Arc::new(GaugeRegistry::new().unwrap()), noon())
}

// ─── Fault-injecting stores ──────────────────────────────────────

/// Memory store whose count queries for one status class can be made to
/// fail.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryEventStore,
    fail_class: Mutex<Option<StatusClass>>,
}

impl FailingStore {
    pub fn fail_on(&self, class: Option<StatusClass>) {
        *self.fail_class.lock() = class;
    }
}

#[async_trait]
impl EventStore for FailingStore {
    async fn collection_exists(&self) -> Result<bool, StoreError> {
        self.inner.collection_exists().await
    }

    async fn create_collection(&self) -> Result<(), StoreError> {
        self.inner.create_collection().await
    }

    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        self.inner.insert(event).await
    }

    async fn get(&self, id: &str) -> Result<Option<Event>, StoreError> {
        self.inner.get(id).await
    }

    async fn count(&self, query: &CountQuery) -> Result<u64, StoreError> {
        let failing = *self.fail_class.lock();
        if failing == Some(query.class) {
            return Err(StoreError::QueryFailed(format!("injected failure for {}", query.class)));
        }
        self.inner.count(query).await
    }

    async fn terms(&self, query: &TermsQuery) -> Result<Vec<TermBucket>, StoreError> {
        self.inner.terms(query).await
    }
}

/// Memory store that can be told to stall every count query.
#[derive(Default)]
pub struct StallingStore {
    pub inner: MemoryEventStore,
    pub stall: Mutex<Option<Duration>>,
}

#[async_trait]
impl EventStore for StallingStore {
    async fn collection_exists(&self) -> Result<bool, StoreError> {
        self.inner.collection_exists().await
    }

    async fn create_collection(&self) -> Result<(), StoreError> {
        self.inner.create_collection().await
    }

    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        self.inner.insert(event).await
    }

    async fn get(&self, id: &str) -> Result<Option<Event>, StoreError> {
        self.inner.get(id).await
    }

    async fn count(&self, query: &CountQuery) -> Result<u64, StoreError> {
        let stall = *self.stall.lock();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        self.inner.count(query).await
    }

    async fn terms(&self, query: &TermsQuery) -> Result<Vec<TermBucket>, StoreError> {
        self.inner.terms(query).await
    }
}
