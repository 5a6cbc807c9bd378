//! Wallet aggregate and related types.

mod aggregate;
mod events;
mod service;

pub use aggregate::{TransactionDirection, TransactionStatus, Wallet, WalletTransaction};
pub use events::{
    TransactionData, WalletEvent, WithdrawalReservedData, WithdrawalResolvedData,
};
pub use service::WalletService;

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Amounts must be strictly positive.
    #[error("Invalid amount: {amount} (must be greater than 0)")]
    InvalidAmount { amount: i64 },

    /// The balance does not cover the requested amount.
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },

    /// No transaction with the given ID exists.
    #[error("Transaction not found: {transaction_id}")]
    TransactionNotFound { transaction_id: Uuid },

    /// A transaction's status transitions exactly once.
    #[error("Transaction {transaction_id} is already resolved")]
    AlreadyResolved { transaction_id: Uuid },
}
