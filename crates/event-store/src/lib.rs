//! Append-only event log with optimistic concurrency.
//!
//! Streams are addressed by natural keys ([`StreamId`]): one stream per
//! order (keyed by order number) and one per wallet (keyed by customer).
//! Every append declares the version it expects the stream to be at, so
//! concurrent writers against the same wallet or order surface a
//! [`EventStoreError::ConcurrencyConflict`] instead of losing updates.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::StreamId;
pub use error::{EventStoreError, Result};
pub use event::{EventId, EventRecord, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{AppendOptions, EventStore};
