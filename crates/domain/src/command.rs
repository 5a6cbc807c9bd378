//! Command handling infrastructure.

use std::marker::PhantomData;

use common::StreamId;
use event_store::{AppendOptions, EventRecord, EventStore, Version};
use serde::Serialize;

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The new version of the aggregate after the command.
    pub new_version: Version,
}

/// Handler for executing commands against aggregates.
///
/// The handler loads the aggregate by replaying its stream, runs the
/// command to produce events, and persists them with the expected-version
/// check that gives each stream its single-writer guarantee.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> Clone for CommandHandler<S, A>
where
    S: EventStore + Clone,
    A: Aggregate,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate by replaying its stream.
    ///
    /// If the stream is empty, returns a default instance.
    pub async fn load(&self, stream_id: &StreamId) -> Result<A, DomainError> {
        let mut aggregate = A::default();

        for record in self.store.load_stream(stream_id).await? {
            let event: A::Event = serde_json::from_value(record.payload)?;
            aggregate.apply(event);
            aggregate.set_version(record.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if its stream has no events.
    pub async fn load_existing(&self, stream_id: &StreamId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(stream_id).await?;
        if aggregate.stream_id().is_some() {
            Ok(Some(aggregate))
        } else {
            Ok(None)
        }
    }

    /// Executes a command and persists the resulting events.
    ///
    /// The command function receives the current aggregate state and
    /// returns either events to apply or an error. An empty event list is
    /// a no-op command; nothing is persisted.
    pub async fn execute<F>(
        &self,
        stream_id: &StreamId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        A::Event: Serialize,
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(stream_id).await?;
        let current_version = aggregate.version();

        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        let mut records = Vec::with_capacity(events.len());
        let mut version = current_version;
        for event in &events {
            version = version.next();
            records.push(EventRecord::new(
                stream_id.clone(),
                event.event_type(),
                version,
                event,
            )?);
        }

        let options = if current_version == Version::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_version(current_version)
        };

        let new_version = self.store.append(records, options).await?;

        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::InMemoryEventStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TestEvent {
        Opened { key: String },
        Bumped { by: i64 },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Opened { .. } => "Opened",
                TestEvent::Bumped { .. } => "Bumped",
            }
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Counter {
        key: Option<String>,
        count: i64,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    enum CounterError {
        #[error("cannot bump an unopened counter")]
        NotOpened,
    }

    impl Aggregate for Counter {
        type Event = TestEvent;
        type Error = CounterError;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn stream_id(&self) -> Option<StreamId> {
            self.key.as_ref().map(|k| StreamId::new(k.clone()))
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                TestEvent::Opened { key } => self.key = Some(key),
                TestEvent::Bumped { by } => self.count += by,
            }
        }
    }

    impl From<CounterError> for DomainError {
        fn from(e: CounterError) -> Self {
            DomainError::Rejected(e.to_string())
        }
    }

    #[tokio::test]
    async fn execute_creates_and_updates() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store);
        let stream = StreamId::new("counter/1");

        let result = handler
            .execute(&stream, |_| {
                Ok(vec![TestEvent::Opened {
                    key: "counter/1".to_string(),
                }])
            })
            .await
            .unwrap();
        assert_eq!(result.new_version, Version::first());

        let result = handler
            .execute(&stream, |c| {
                if c.key.is_none() {
                    return Err(CounterError::NotOpened);
                }
                Ok(vec![TestEvent::Bumped { by: 4 }])
            })
            .await
            .unwrap();

        assert_eq!(result.aggregate.count, 4);
        assert_eq!(result.new_version, Version::new(2));
    }

    #[tokio::test]
    async fn rejected_command_persists_nothing() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());
        let stream = StreamId::new("counter/2");

        let result = handler
            .execute(&stream, |_| Err(CounterError::NotOpened))
            .await;
        assert!(result.is_err());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn empty_command_is_a_noop() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());
        let stream = StreamId::new("counter/3");

        let result = handler.execute(&stream, |_| Ok(vec![])).await.unwrap();
        assert!(result.events.is_empty());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn load_existing_distinguishes_missing_streams() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store);
        let stream = StreamId::new("counter/4");

        assert!(handler.load_existing(&stream).await.unwrap().is_none());

        handler
            .execute(&stream, |_| {
                Ok(vec![TestEvent::Opened {
                    key: "counter/4".to_string(),
                }])
            })
            .await
            .unwrap();

        assert!(handler.load_existing(&stream).await.unwrap().is_some());
    }
}
