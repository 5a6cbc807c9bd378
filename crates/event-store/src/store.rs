use async_trait::async_trait;

use common::StreamId;

use crate::{EventRecord, EventStoreError, Result, Version};

/// Options for appending events to a stream.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected version of the stream for optimistic concurrency control.
    /// If None, no version check is performed (use with caution).
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// Creates options with no version check.
    pub fn any() -> Self {
        Self::default()
    }

    /// Creates options expecting the stream to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the stream to not exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Core trait for event store implementations.
///
/// All implementations must be thread-safe (Send + Sync). Appends to a
/// single stream are atomic: either every record in the batch is stored
/// or none is.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events to a stream.
    ///
    /// If `options.expected_version` is set, fails with
    /// `ConcurrencyConflict` when the stream's current version differs.
    /// Returns the new version of the stream after appending.
    async fn append(&self, events: Vec<EventRecord>, options: AppendOptions) -> Result<Version>;

    /// Retrieves all events for a stream in version order.
    async fn load_stream(&self, stream_id: &StreamId) -> Result<Vec<EventRecord>>;

    /// Gets the current version of a stream, or None if it has no events.
    async fn stream_version(&self, stream_id: &StreamId) -> Result<Option<Version>>;
}

/// Validates an append batch: non-empty, single stream, sequential versions.
pub(crate) fn validate_append(events: &[EventRecord]) -> Result<()> {
    let first = events
        .first()
        .ok_or_else(|| EventStoreError::InvalidAppend("empty batch".to_string()))?;

    let mut expected = first.version;
    for event in events.iter().skip(1) {
        if event.stream_id != first.stream_id {
            return Err(EventStoreError::InvalidAppend(
                "all events in a batch must target one stream".to_string(),
            ));
        }
        expected = expected.next();
        if event.version != expected {
            return Err(EventStoreError::InvalidAppend(format!(
                "versions must be sequential: expected {expected}, got {}",
                event.version
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(stream: &str, version: i64) -> EventRecord {
        EventRecord::new(
            StreamId::new(stream),
            "Test",
            Version::new(version),
            &serde_json::json!({}),
        )
        .unwrap()
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(
            validate_append(&[]),
            Err(EventStoreError::InvalidAppend(_))
        ));
    }

    #[test]
    fn mixed_streams_are_rejected() {
        let batch = vec![record("a", 1), record("b", 2)];
        assert!(validate_append(&batch).is_err());
    }

    #[test]
    fn non_sequential_versions_are_rejected() {
        let batch = vec![record("a", 1), record("a", 3)];
        assert!(validate_append(&batch).is_err());
    }

    #[test]
    fn sequential_batch_is_accepted() {
        let batch = vec![record("a", 1), record("a", 2), record("a", 3)];
        assert!(validate_append(&batch).is_ok());
    }
}
