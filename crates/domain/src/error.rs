//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::order::OrderError;
use crate::wallet::WalletError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// An error occurred in the order aggregate.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error occurred in the wallet aggregate.
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    /// Aggregate not found.
    #[error("{aggregate_type} not found on stream {stream_id}")]
    NotFound {
        aggregate_type: &'static str,
        stream_id: String,
    },

    /// A command was rejected for a reason outside the aggregate errors.
    #[error("Command rejected: {0}")]
    Rejected(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
