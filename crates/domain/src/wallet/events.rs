//! Wallet domain events.
//!
//! Each event carries both the ledger entry and the counter changes it
//! implies, so a balance mutation and its transaction-log append are one
//! indivisible fact; there is no observable state between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{CustomerId, Money, OrderNumber};

use crate::aggregate::DomainEvent;

/// Events in a wallet's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WalletEvent {
    /// Funds were added to the wallet.
    Credited(TransactionData),

    /// Funds were spent from the wallet.
    Debited(TransactionData),

    /// Funds were moved from balance to the pending-withdrawal pool.
    WithdrawalReserved(WithdrawalReservedData),

    /// An admin resolved a pending withdrawal.
    WithdrawalResolved(WithdrawalResolvedData),
}

impl DomainEvent for WalletEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WalletEvent::Credited(_) => "WalletCredited",
            WalletEvent::Debited(_) => "WalletDebited",
            WalletEvent::WithdrawalReserved(_) => "WithdrawalReserved",
            WalletEvent::WithdrawalResolved(_) => "WithdrawalResolved",
        }
    }
}

/// Data for Credited / Debited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionData {
    pub customer_id: CustomerId,
    pub transaction_id: Uuid,
    pub amount: Money,
    pub purpose: String,
    pub reference: String,
    pub order_number: Option<OrderNumber>,
    pub at: DateTime<Utc>,
}

/// Data for WithdrawalReserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalReservedData {
    pub customer_id: CustomerId,
    pub transaction_id: Uuid,
    pub amount: Money,
    pub at: DateTime<Utc>,
}

/// Data for WithdrawalResolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalResolvedData {
    pub transaction_id: Uuid,
    pub approved: bool,
    pub at: DateTime<Utc>,
}

impl WalletEvent {
    pub fn credited(
        customer_id: CustomerId,
        amount: Money,
        purpose: impl Into<String>,
        reference: impl Into<String>,
        order_number: Option<OrderNumber>,
    ) -> Self {
        WalletEvent::Credited(TransactionData {
            customer_id,
            transaction_id: Uuid::new_v4(),
            amount,
            purpose: purpose.into(),
            reference: reference.into(),
            order_number,
            at: Utc::now(),
        })
    }

    pub fn debited(
        customer_id: CustomerId,
        amount: Money,
        purpose: impl Into<String>,
        reference: impl Into<String>,
        order_number: Option<OrderNumber>,
    ) -> Self {
        WalletEvent::Debited(TransactionData {
            customer_id,
            transaction_id: Uuid::new_v4(),
            amount,
            purpose: purpose.into(),
            reference: reference.into(),
            order_number,
            at: Utc::now(),
        })
    }

    pub fn withdrawal_reserved(customer_id: CustomerId, amount: Money) -> Self {
        WalletEvent::WithdrawalReserved(WithdrawalReservedData {
            customer_id,
            transaction_id: Uuid::new_v4(),
            amount,
            at: Utc::now(),
        })
    }

    pub fn withdrawal_resolved(transaction_id: Uuid, approved: bool) -> Self {
        WalletEvent::WithdrawalResolved(WithdrawalResolvedData {
            transaction_id,
            approved,
            at: Utc::now(),
        })
    }
}
