//! Event store adapter.
//!
//! The aggregation side only ever asks the store for counts and for the
//! distinct destinations in a scope; it never loads documents.

pub mod memory;
pub mod redis_store;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::event::Event;
use crate::status::StatusClass;
use crate::window::Window;

pub use self::memory::MemoryEventStore;
pub use self::redis_store::RedisEventStore;

// ─── Queries ─────────────────────────────────────────────────────

/// `recordedAt ∈ window AND status ∈ class AND destination == d`,
/// with the class and destination predicates optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountQuery {
    pub window: Window,
    pub class: StatusClass,
    pub destination: Option<String>,
}

impl CountQuery {
    pub fn global(window: Window, class: StatusClass) -> Self {
        Self {
            window,
            class,
            destination: None,
        }
    }

    pub fn for_destination(window: Window, class: StatusClass, destination: &str) -> Self {
        Self {
            window,
            class,
            destination: Some(destination.to_owned()),
        }
    }
}

/// Distinct destinations, like a terms aggregation with a `size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermsQuery {
    /// `None` scopes the query to every stored event.
    pub window: Option<Window>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermBucket {
    pub key: String,
    pub doc_count: u64,
}

/// Orders buckets the way a terms aggregation does (count descending, then
/// key ascending) and applies the size limit.
pub fn rank_buckets(mut buckets: Vec<TermBucket>, limit: usize) -> Vec<TermBucket> {
    buckets.retain(|b| b.doc_count > 0);
    buckets.sort_by(|a, b| b.doc_count.cmp(&a.doc_count).then_with(|| a.key.cmp(&b.key)));
    buckets.truncate(limit);
    buckets
}

// ─── Trait ───────────────────────────────────────────────────────

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn collection_exists(&self) -> Result<bool, StoreError>;

    /// Idempotent.
    async fn create_collection(&self) -> Result<(), StoreError>;

    async fn ensure_collection(&self) -> Result<(), StoreError> {
        if !self.collection_exists().await? {
            self.create_collection().await?;
        }
        Ok(())
    }

    /// Persist one event; it is visible to queries once this returns.
    async fn insert(&self, event: &Event) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Event>, StoreError>;

    async fn count(&self, query: &CountQuery) -> Result<u64, StoreError>;

    async fn terms(&self, query: &TermsQuery) -> Result<Vec<TermBucket>, StoreError>;

    /// One count per destination, in input order. Backends that can group
    /// should override the N-query fallback.
    async fn count_by_destination(
        &self,
        window: Window,
        class: StatusClass,
        destinations: &[String],
    ) -> Result<Vec<u64>, StoreError> {
        let mut counts = Vec::with_capacity(destinations.len());
        for destination in destinations {
            let query = CountQuery::for_destination(window, class, destination);
            counts.push(self.count(&query).await?);
        }
        Ok(counts)
    }
}

/// Bounds a store call so a stalled backend cannot hold a request forever.
pub async fn timed<T, F>(budget: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(budget)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(key: &str, doc_count: u64) -> TermBucket {
        TermBucket {
            key: key.into(),
            doc_count,
        }
    }

    #[test]
    fn ranking_orders_by_count_then_key() {
        let ranked = rank_buckets(
            vec![bucket("b", 2), bucket("a", 2), bucket("c", 5), bucket("d", 0)],
            10,
        );
        let keys: Vec<_> = ranked.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, ["c", "a", "b"]);
    }

    #[test]
    fn ranking_applies_limit() {
        let ranked = rank_buckets(vec![bucket("a", 1), bucket("b", 3), bucket("c", 2)], 2);
        let keys: Vec<_> = ranked.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, ["b", "c"]);
    }

    #[tokio::test]
    async fn timed_maps_elapsed_budget_to_timeout() {
        let result: Result<(), StoreError> = timed(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }
}
