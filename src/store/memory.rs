use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{rank_buckets, CountQuery, EventStore, TermBucket, TermsQuery};
use crate::error::StoreError;
use crate::event::Event;

/// Process-local store with the same query semantics as the Redis backend.
/// Used by tests and for running the service without a Redis server.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    created: bool,
    events: Vec<Event>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matches(event: &Event, query: &CountQuery) -> bool {
        let in_window = event.stamp().is_some_and(|s| query.window.contains(s));
        let dest_ok = query
            .destination
            .as_deref()
            .map_or(true, |d| !d.is_empty() && event.destination == d);
        in_window && dest_ok && query.class.matches(event.status())
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn collection_exists(&self) -> Result<bool, StoreError> {
        Ok(self.inner.read().created)
    }

    async fn create_collection(&self) -> Result<(), StoreError> {
        self.inner.write().created = true;
        Ok(())
    }

    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        if event.stamp().is_none() {
            return Err(StoreError::QueryFailed(format!(
                "event '{}' has no valid Datetime",
                event.id
            )));
        }
        let mut inner = self.inner.write();
        inner.created = true;
        inner.events.push(event.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Event>, StoreError> {
        Ok(self
            .inner
            .read()
            .events
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn count(&self, query: &CountQuery) -> Result<u64, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .events
            .iter()
            .filter(|e| Self::matches(e, query))
            .count() as u64)
    }

    async fn terms(&self, query: &TermsQuery) -> Result<Vec<TermBucket>, StoreError> {
        let inner = self.inner.read();
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for event in &inner.events {
            if event.destination.is_empty() {
                continue;
            }
            let in_scope = match query.window {
                Some(window) => event.stamp().is_some_and(|s| window.contains(s)),
                None => true,
            };
            if in_scope {
                *counts.entry(event.destination.as_str()).or_default() += 1;
            }
        }
        let buckets = counts
            .into_iter()
            .map(|(key, doc_count)| TermBucket {
                key: key.to_owned(),
                doc_count,
            })
            .collect();
        Ok(rank_buckets(buckets, query.limit))
    }
}
