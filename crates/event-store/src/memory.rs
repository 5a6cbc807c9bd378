use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::StreamId;

use crate::{
    EventRecord, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, validate_append},
};

/// In-memory event store for tests and local runs.
///
/// Provides the same optimistic-concurrency semantics as the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<EventRecord>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clears all events.
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventRecord>, options: AppendOptions) -> Result<Version> {
        validate_append(&events)?;

        let stream_id = events[0].stream_id.clone();
        let mut store = self.events.write().await;

        let current = store
            .iter()
            .filter(|e| e.stream_id == stream_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                stream_id,
                expected,
                actual: current,
            });
        }

        if events[0].version != current.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                stream_id,
                expected: options.expected_version.unwrap_or(current),
                actual: current,
            });
        }

        let last_version = events.last().map(|e| e.version).unwrap_or(current);
        store.extend(events);

        Ok(last_version)
    }

    async fn load_stream(&self, stream_id: &StreamId) -> Result<Vec<EventRecord>> {
        let store = self.events.read().await;
        let mut events: Vec<_> = store
            .iter()
            .filter(|e| &e.stream_id == stream_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn stream_version(&self, stream_id: &StreamId) -> Result<Option<Version>> {
        let store = self.events.read().await;
        Ok(store
            .iter()
            .filter(|e| &e.stream_id == stream_id)
            .map(|e| e.version)
            .max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stream: &StreamId, version: i64, value: i64) -> EventRecord {
        EventRecord::new(
            stream.clone(),
            "Test",
            Version::new(version),
            &serde_json::json!({ "value": value }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn append_and_load_roundtrip() {
        let store = InMemoryEventStore::new();
        let stream = StreamId::new("order/ORD-1");

        let v = store
            .append(
                vec![record(&stream, 1, 10), record(&stream, 2, 20)],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();
        assert_eq!(v, Version::new(2));

        let events = store.load_stream(&stream).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].payload["value"], 10);
        assert_eq!(events[1].payload["value"], 20);
    }

    #[tokio::test]
    async fn expected_version_mismatch_conflicts() {
        let store = InMemoryEventStore::new();
        let stream = StreamId::new("wallet/u1");

        store
            .append(vec![record(&stream, 1, 1)], AppendOptions::expect_new())
            .await
            .unwrap();

        let result = store
            .append(vec![record(&stream, 1, 2)], AppendOptions::expect_new())
            .await;
        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn streams_are_isolated() {
        let store = InMemoryEventStore::new();
        let a = StreamId::new("order/A");
        let b = StreamId::new("order/B");

        store
            .append(vec![record(&a, 1, 1)], AppendOptions::expect_new())
            .await
            .unwrap();
        store
            .append(vec![record(&b, 1, 1)], AppendOptions::expect_new())
            .await
            .unwrap();

        assert_eq!(store.load_stream(&a).await.unwrap().len(), 1);
        assert_eq!(store.stream_version(&b).await.unwrap(), Some(Version::first()));
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn missing_stream_has_no_version() {
        let store = InMemoryEventStore::new();
        let version = store
            .stream_version(&StreamId::new("order/NONE"))
            .await
            .unwrap();
        assert!(version.is_none());
    }
}
