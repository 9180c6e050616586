use std::ops::Range;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{rank_buckets, CountQuery, EventStore, TermBucket, TermsQuery};
use crate::error::StoreError;
use crate::event::Event;
use crate::status::StatusClass;
use crate::window::Window;

/// Redis-backed event store.
///
/// Each event is stored once as JSON and referenced from a handful of sorted
/// sets scored by its `recordedAt` stamp, so every aggregation query is a
/// `ZCOUNT` and nothing is loaded back.
///
/// `ConnectionManager` is cheaply cloneable and reconnects on failure; every
/// clone shares the same multiplexed connection.
#[derive(Clone)]
pub struct RedisEventStore {
    conn: ConnectionManager,
    keys: Keys,
}

impl RedisEventStore {
    /// Connects to `url`. Connection failures surface as `Unavailable`.
    pub async fn connect(url: &str, collection: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Unavailable(format!("invalid Redis URL \"{url}\": {e}")))?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            keys: Keys::new(collection),
        })
    }

    /// Status codes seen so far that fall inside `class`, or `None` when the
    /// class is unfiltered and the unscoped indexes answer directly.
    async fn codes_in(&self, class: StatusClass) -> Result<Option<Vec<i32>>, StoreError> {
        if class.range().is_none() {
            return Ok(None);
        }
        let mut conn = self.conn.clone();
        let seen: Vec<i32> = conn.smembers(self.keys.codes()).await?;
        Ok(Some(codes_for(class, seen)))
    }

    async fn zcount_all(&self, keys: &[String], window: Window) -> Result<Vec<u64>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("ZCOUNT")
                .arg(key)
                .arg(window.start.value())
                .arg(window.end.value());
        }
        let mut conn = self.conn.clone();
        let counts: Vec<u64> = pipe.query_async(&mut conn).await?;
        Ok(counts)
    }
}

#[async_trait]
impl EventStore for RedisEventStore {
    async fn collection_exists(&self) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(self.keys.meta()).await?;
        Ok(exists)
    }

    async fn create_collection(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let created_at = chrono::Utc::now().to_rfc3339();
        let _: bool = conn.hset_nx(self.keys.meta(), "created_at", created_at).await?;
        Ok(())
    }

    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        let stamp = event.stamp().ok_or_else(|| {
            StoreError::QueryFailed(format!("event '{}' has no valid Datetime", event.id))
        })?;
        let doc = serde_json::to_string(event)
            .map_err(|e| StoreError::QueryFailed(format!("encode event: {e}")))?;
        let score = stamp.value();
        let status = event.status();

        // One MULTI so the document and every index become visible together
        let mut pipe = redis::pipe();
        pipe.atomic()
            .set(self.keys.doc(&event.id), doc)
            .ignore()
            .zadd(self.keys.time(), &event.id, score)
            .ignore()
            .zadd(self.keys.status(status), &event.id, score)
            .ignore()
            .sadd(self.keys.codes(), status)
            .ignore();
        if !event.destination.is_empty() {
            let dest = event.destination.as_str();
            pipe.zadd(self.keys.dest(dest), &event.id, score)
                .ignore()
                .zadd(self.keys.dest_status(status, dest), &event.id, score)
                .ignore()
                .sadd(self.keys.destinations(), dest)
                .ignore();
        }

        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Event>, StoreError> {
        let mut conn = self.conn.clone();
        let doc: Option<String> = conn.get(self.keys.doc(id)).await?;
        doc.map(|text| {
            serde_json::from_str(&text)
                .map_err(|e| StoreError::QueryFailed(format!("decode event '{id}': {e}")))
        })
        .transpose()
    }

    async fn count(&self, query: &CountQuery) -> Result<u64, StoreError> {
        let codes = self.codes_in(query.class).await?;
        let keys = self
            .keys
            .count_keys(codes.as_deref(), query.destination.as_deref());
        let counts = self.zcount_all(&keys, query.window).await?;
        Ok(counts.into_iter().sum())
    }

    async fn terms(&self, query: &TermsQuery) -> Result<Vec<TermBucket>, StoreError> {
        let mut conn = self.conn.clone();
        let destinations: Vec<String> = conn.smembers(self.keys.destinations()).await?;
        if destinations.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for dest in &destinations {
            match query.window {
                Some(w) => pipe
                    .cmd("ZCOUNT")
                    .arg(self.keys.dest(dest))
                    .arg(w.start.value())
                    .arg(w.end.value()),
                None => pipe.cmd("ZCARD").arg(self.keys.dest(dest)),
            };
        }
        let counts: Vec<u64> = pipe.query_async(&mut conn).await?;

        let buckets = destinations
            .into_iter()
            .zip(counts)
            .map(|(key, doc_count)| TermBucket { key, doc_count })
            .collect();
        Ok(rank_buckets(buckets, query.limit))
    }

    /// Grouped count: every `ZCOUNT` for every destination goes out in one
    /// pipeline.
    async fn count_by_destination(
        &self,
        window: Window,
        class: StatusClass,
        destinations: &[String],
    ) -> Result<Vec<u64>, StoreError> {
        let codes = self.codes_in(class).await?;
        let plan = self.keys.plan_by_destination(codes.as_deref(), destinations);
        let counts = self.zcount_all(&plan.keys, window).await?;
        plan.sum(&counts)
    }
}

/// Keeps the seen codes that fall inside `class`, in ascending order.
fn codes_for(class: StatusClass, seen: Vec<i32>) -> Vec<i32> {
    let mut codes: Vec<i32> = seen.into_iter().filter(|c| class.matches(*c)).collect();
    codes.sort_unstable();
    codes
}

// ─── Count planning ──────────────────────────────────────────────

/// `ZCOUNT` keys for a grouped count. `spans[i]` is the slice of `keys`
/// whose counts add up to destination `i`.
#[derive(Debug, PartialEq, Eq)]
struct CountPlan {
    keys: Vec<String>,
    spans: Vec<Range<usize>>,
}

impl CountPlan {
    /// Folds the pipeline replies back into one count per destination.
    fn sum(&self, counts: &[u64]) -> Result<Vec<u64>, StoreError> {
        if counts.len() != self.keys.len() {
            return Err(StoreError::QueryFailed(format!(
                "expected {} ZCOUNT replies, got {}",
                self.keys.len(),
                counts.len()
            )));
        }
        Ok(self
            .spans
            .iter()
            .map(|span| counts[span.clone()].iter().sum())
            .collect())
    }
}

// ─── Key layout ──────────────────────────────────────────────────

/// Key names, all under the collection prefix. Status codes never contain
/// `:`, so putting the code before the destination keeps every key unique
/// whatever the destination string holds.
#[derive(Debug, Clone)]
struct Keys {
    prefix: String,
}

impl Keys {
    fn new(collection: &str) -> Self {
        Self {
            prefix: collection.to_owned(),
        }
    }

    fn meta(&self) -> String {
        format!("{}:meta", self.prefix)
    }

    fn doc(&self, id: &str) -> String {
        format!("{}:doc:{id}", self.prefix)
    }

    fn time(&self) -> String {
        format!("{}:time", self.prefix)
    }

    fn status(&self, code: i32) -> String {
        format!("{}:status:{code}", self.prefix)
    }

    fn codes(&self) -> String {
        format!("{}:codes", self.prefix)
    }

    fn dest(&self, dest: &str) -> String {
        format!("{}:dest:{dest}", self.prefix)
    }

    fn dest_status(&self, code: i32, dest: &str) -> String {
        format!("{}:ds:{code}:{dest}", self.prefix)
    }

    fn destinations(&self) -> String {
        format!("{}:destinations", self.prefix)
    }

    /// Keys whose `ZCOUNT`s add up to one count. `codes` is `None` for the
    /// unfiltered class; `destination` is `None` for the global count.
    fn count_keys(&self, codes: Option<&[i32]>, destination: Option<&str>) -> Vec<String> {
        match (codes, destination) {
            (None, None) => vec![self.time()],
            (None, Some(d)) => vec![self.dest(d)],
            (Some(codes), None) => codes.iter().map(|c| self.status(*c)).collect(),
            (Some(codes), Some(d)) => codes.iter().map(|c| self.dest_status(*c, d)).collect(),
        }
    }

    fn plan_by_destination(&self, codes: Option<&[i32]>, destinations: &[String]) -> CountPlan {
        let mut keys = Vec::new();
        let mut spans = Vec::with_capacity(destinations.len());
        for dest in destinations {
            let before = keys.len();
            keys.extend(self.count_keys(codes, Some(dest)));
            spans.push(before..keys.len());
        }
        CountPlan { keys, spans }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_live_under_the_collection() {
        let keys = Keys::new("metrics");
        assert_eq!(keys.meta(), "metrics:meta");
        assert_eq!(keys.doc("abc"), "metrics:doc:abc");
        assert_eq!(keys.status(404), "metrics:status:404");
        assert_eq!(keys.dest_status(200, "svcA"), "metrics:ds:200:svcA");
    }

    #[test]
    fn destination_keys_do_not_collide() {
        let keys = Keys::new("metrics");
        // A destination that looks like a status-scoped suffix
        assert_ne!(keys.dest("200:svcA"), keys.dest_status(200, "svcA"));
        assert_ne!(keys.dest("x"), keys.dest_status(200, "x"));
    }

    fn dests(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn seen_codes_are_filtered_by_class() {
        let seen = vec![503, 200, 404, 1000, 302, 201, 500];
        assert_eq!(codes_for(StatusClass::Success, seen.clone()), [200, 201]);
        assert_eq!(codes_for(StatusClass::ClientError, seen.clone()), [404]);
        assert_eq!(codes_for(StatusClass::ServerError, seen), [500, 503, 1000]);
    }

    #[test]
    fn unfiltered_counts_use_the_unscoped_indexes() {
        let keys = Keys::new("metrics");
        assert_eq!(keys.count_keys(None, None), ["metrics:time"]);
        assert_eq!(keys.count_keys(None, Some("svcA")), ["metrics:dest:svcA"]);

        let plan = keys.plan_by_destination(None, &dests(&["svcA", "svcB"]));
        assert_eq!(plan.keys, ["metrics:dest:svcA", "metrics:dest:svcB"]);
        assert_eq!(plan.sum(&[4, 9]).unwrap(), [4, 9]);
    }

    #[test]
    fn class_without_seen_codes_counts_zero_everywhere() {
        let keys = Keys::new("metrics");
        assert!(keys.count_keys(Some(&[]), None).is_empty());

        let plan = keys.plan_by_destination(Some(&[]), &dests(&["svcA", "svcB", "svcC"]));
        assert!(plan.keys.is_empty());
        assert_eq!(plan.sum(&[]).unwrap(), [0, 0, 0]);
    }

    #[test]
    fn several_codes_sum_back_per_destination() {
        let keys = Keys::new("metrics");
        assert_eq!(
            keys.count_keys(Some(&[500, 503]), None),
            ["metrics:status:500", "metrics:status:503"]
        );

        let plan = keys.plan_by_destination(Some(&[500, 503, 1000]), &dests(&["svcA", "svcB"]));
        assert_eq!(
            plan.keys,
            [
                "metrics:ds:500:svcA",
                "metrics:ds:503:svcA",
                "metrics:ds:1000:svcA",
                "metrics:ds:500:svcB",
                "metrics:ds:503:svcB",
                "metrics:ds:1000:svcB",
            ]
        );
        assert_eq!(plan.spans, [0..3, 3..6]);
        assert_eq!(plan.sum(&[1, 2, 3, 0, 5, 0]).unwrap(), [6, 5]);
    }

    #[test]
    fn short_pipeline_reply_is_a_query_failure() {
        let keys = Keys::new("metrics");
        let plan = keys.plan_by_destination(Some(&[200]), &dests(&["svcA", "svcB"]));
        let err = plan.sum(&[1]).unwrap_err();
        assert!(matches!(err, StoreError::QueryFailed(_)));
    }

    #[tokio::test]
    #[ignore = "needs a Redis server at REDIS_URL"]
    async fn live_grouped_count_matches_single_counts() {
        let Ok(url) = std::env::var("REDIS_URL") else {
            return;
        };
        let collection = format!("test-{}", uuid::Uuid::new_v4());
        let store = RedisEventStore::connect(&url, &collection).await.unwrap();
        store.ensure_collection().await.unwrap();

        let now = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let stamp = crate::window::Stamp::from_datetime(now);
        for (dest, status) in [("svcA", 500), ("svcA", 1000), ("svcA", 200), ("svcB", 404), ("", 503)] {
            let mut event = Event::new(dest, status);
            event.assign(uuid::Uuid::new_v4().to_string(), stamp);
            store.insert(&event).await.unwrap();
        }

        let window = Window::compute(now, chrono::Duration::seconds(10), chrono::Duration::seconds(10));
        let names = dests(&["svcA", "svcB", "svcC"]);
        for class in StatusClass::EVERY {
            let grouped = store.count_by_destination(window, class, &names).await.unwrap();
            for (name, count) in names.iter().zip(grouped) {
                let single = store
                    .count(&CountQuery::for_destination(window, class, name))
                    .await
                    .unwrap();
                assert_eq!(count, single, "{class}/{name}");
            }
        }
        let server = store
            .count_by_destination(window, StatusClass::ServerError, &names)
            .await
            .unwrap();
        assert_eq!(server, [2, 0, 0]);
        assert_eq!(
            store.count(&CountQuery::global(window, StatusClass::ServerError)).await.unwrap(),
            3
        );
    }
}
