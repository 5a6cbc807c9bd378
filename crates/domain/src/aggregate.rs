//! Core aggregate and domain event traits.

use common::StreamId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened. They are immutable
/// and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name, used for storage and filtering.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates rebuilt from an event stream.
///
/// Aggregates generate events from commands and apply events to update
/// state. Applying must be pure and deterministic: it never fails and has
/// no side effects, because events are facts that already happened.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate's commands can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the stream this aggregate lives on.
    ///
    /// Returns None for a new, uninitialized aggregate.
    fn stream_id(&self) -> Option<StreamId>;

    /// Returns the current version of the aggregate.
    fn version(&self) -> Version;

    /// Sets the aggregate version. Called by the command handler after
    /// loading or appending events.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
