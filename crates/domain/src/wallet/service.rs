//! Wallet service wrapping the command handler.

use common::{CustomerId, Money, OrderNumber, StreamId};
use event_store::EventStore;
use uuid::Uuid;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::Wallet;

/// Service for wallet operations.
///
/// Each method is one serialized write against the customer's wallet
/// stream; concurrent operations on the same wallet surface a
/// concurrency conflict rather than losing an update.
pub struct WalletService<S: EventStore> {
    handler: CommandHandler<S, Wallet>,
}

impl<S: EventStore + Clone> Clone for WalletService<S> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

impl<S: EventStore> WalletService<S> {
    /// Creates a new wallet service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Adds funds to a customer's wallet.
    #[tracing::instrument(skip(self))]
    pub async fn credit(
        &self,
        customer_id: CustomerId,
        amount: Money,
        purpose: &str,
        reference: &str,
        order_number: Option<OrderNumber>,
    ) -> Result<CommandResult<Wallet>, DomainError> {
        metrics::counter!("wallet_credits_total").increment(1);
        self.handler
            .execute(&StreamId::wallet(customer_id), |wallet| {
                wallet.credit(customer_id, amount, purpose, reference, order_number)
            })
            .await
    }

    /// Spends funds from a customer's wallet.
    #[tracing::instrument(skip(self))]
    pub async fn debit(
        &self,
        customer_id: CustomerId,
        amount: Money,
        purpose: &str,
        reference: &str,
        order_number: Option<OrderNumber>,
    ) -> Result<CommandResult<Wallet>, DomainError> {
        metrics::counter!("wallet_debits_total").increment(1);
        self.handler
            .execute(&StreamId::wallet(customer_id), |wallet| {
                wallet.debit(customer_id, amount, purpose, reference, order_number)
            })
            .await
    }

    /// Moves funds from balance into the pending-withdrawal pool.
    #[tracing::instrument(skip(self))]
    pub async fn reserve_withdrawal(
        &self,
        customer_id: CustomerId,
        amount: Money,
    ) -> Result<CommandResult<Wallet>, DomainError> {
        self.handler
            .execute(&StreamId::wallet(customer_id), |wallet| {
                wallet.reserve_withdrawal(customer_id, amount)
            })
            .await
    }

    /// Resolves a pending withdrawal to completed or failed.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_withdrawal(
        &self,
        customer_id: CustomerId,
        transaction_id: Uuid,
        approved: bool,
    ) -> Result<CommandResult<Wallet>, DomainError> {
        self.handler
            .execute(&StreamId::wallet(customer_id), |wallet| {
                wallet.resolve_withdrawal(transaction_id, approved)
            })
            .await
    }

    /// Loads a customer's wallet. A customer with no history gets an
    /// empty wallet.
    #[tracing::instrument(skip(self))]
    pub async fn get_wallet(&self, customer_id: CustomerId) -> Result<Wallet, DomainError> {
        self.handler.load(&StreamId::wallet(customer_id)).await
    }
}
