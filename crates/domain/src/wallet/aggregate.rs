//! Wallet aggregate implementation.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderNumber, StreamId};
use event_store::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::Aggregate;

use super::WalletError;
use super::events::WalletEvent;

/// Direction of a wallet transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionDirection {
    Debit,
    Credit,
}

/// Status of a wallet transaction.
///
/// Transitions pending → completed | failed exactly once; nothing else
/// about a transaction ever changes after append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// One entry in the wallet's append-only ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub direction: TransactionDirection,
    pub amount: Money,
    pub purpose: String,
    pub reference: String,
    pub order_number: Option<OrderNumber>,
    pub status: TransactionStatus,
    pub at: DateTime<Utc>,
}

/// A customer's wallet: spendable balance plus the transaction history
/// the balance is always derivable from.
///
/// The only component allowed to mutate balances; everything else goes
/// through [`credit`](Wallet::credit) / [`debit`](Wallet::debit) /
/// the withdrawal pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wallet {
    customer_id: Option<CustomerId>,

    #[serde(default)]
    version: Version,

    balance: Money,
    total_earned: Money,
    total_spent: Money,
    total_withdrawn: Money,
    pending_balance: Money,

    transactions: Vec<WalletTransaction>,
}

impl Aggregate for Wallet {
    type Event = WalletEvent;
    type Error = WalletError;

    fn aggregate_type() -> &'static str {
        "Wallet"
    }

    fn stream_id(&self) -> Option<StreamId> {
        self.customer_id.map(StreamId::wallet)
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            WalletEvent::Credited(data) => {
                self.customer_id = Some(data.customer_id);
                self.balance += data.amount;
                self.total_earned += data.amount;
                self.transactions.push(WalletTransaction {
                    id: data.transaction_id,
                    direction: TransactionDirection::Credit,
                    amount: data.amount,
                    purpose: data.purpose,
                    reference: data.reference,
                    order_number: data.order_number,
                    status: TransactionStatus::Completed,
                    at: data.at,
                });
            }
            WalletEvent::Debited(data) => {
                self.customer_id = Some(data.customer_id);
                self.balance -= data.amount;
                self.total_spent += data.amount;
                self.transactions.push(WalletTransaction {
                    id: data.transaction_id,
                    direction: TransactionDirection::Debit,
                    amount: data.amount,
                    purpose: data.purpose,
                    reference: data.reference,
                    order_number: data.order_number,
                    status: TransactionStatus::Completed,
                    at: data.at,
                });
            }
            WalletEvent::WithdrawalReserved(data) => {
                self.customer_id = Some(data.customer_id);
                self.balance -= data.amount;
                self.pending_balance += data.amount;
                self.transactions.push(WalletTransaction {
                    id: data.transaction_id,
                    direction: TransactionDirection::Debit,
                    amount: data.amount,
                    purpose: "withdrawal".to_string(),
                    reference: data.transaction_id.to_string(),
                    order_number: None,
                    status: TransactionStatus::Pending,
                    at: data.at,
                });
            }
            WalletEvent::WithdrawalResolved(data) => {
                if let Some(tx) = self
                    .transactions
                    .iter_mut()
                    .find(|t| t.id == data.transaction_id)
                {
                    let amount = tx.amount;
                    if data.approved {
                        tx.status = TransactionStatus::Completed;
                        self.pending_balance -= amount;
                        self.total_withdrawn += amount;
                    } else {
                        tx.status = TransactionStatus::Failed;
                        self.pending_balance -= amount;
                        self.balance += amount;
                    }
                }
            }
        }
    }
}

// Query methods
impl Wallet {
    /// Returns the owning customer.
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    /// Returns the spendable balance.
    pub fn balance(&self) -> Money {
        self.balance
    }

    /// Returns the lifetime credited amount.
    pub fn total_earned(&self) -> Money {
        self.total_earned
    }

    /// Returns the lifetime spent amount.
    pub fn total_spent(&self) -> Money {
        self.total_spent
    }

    /// Returns the lifetime withdrawn amount.
    pub fn total_withdrawn(&self) -> Money {
        self.total_withdrawn
    }

    /// Returns the amount locked in pending withdrawals.
    pub fn pending_balance(&self) -> Money {
        self.pending_balance
    }

    /// Returns the transaction history, oldest first.
    pub fn transactions(&self) -> &[WalletTransaction] {
        &self.transactions
    }

    /// Returns a transaction by ID.
    pub fn transaction(&self, id: Uuid) -> Option<&WalletTransaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Recomputes the net position from the ledger alone: completed
    /// credits minus completed debits.
    ///
    /// At every point in time this equals `balance + pending_balance`.
    pub fn ledger_net(&self) -> Money {
        self.transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Completed)
            .map(|t| match t.direction {
                TransactionDirection::Credit => t.amount,
                TransactionDirection::Debit => Money::zero() - t.amount,
            })
            .sum()
    }
}

// Command methods (return events)
impl Wallet {
    /// Adds funds to the wallet.
    pub fn credit(
        &self,
        customer_id: CustomerId,
        amount: Money,
        purpose: impl Into<String>,
        reference: impl Into<String>,
        order_number: Option<OrderNumber>,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        if !amount.is_positive() {
            return Err(WalletError::InvalidAmount {
                amount: amount.minor(),
            });
        }

        Ok(vec![WalletEvent::credited(
            customer_id,
            amount,
            purpose,
            reference,
            order_number,
        )])
    }

    /// Spends funds from the wallet.
    pub fn debit(
        &self,
        customer_id: CustomerId,
        amount: Money,
        purpose: impl Into<String>,
        reference: impl Into<String>,
        order_number: Option<OrderNumber>,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        if !amount.is_positive() {
            return Err(WalletError::InvalidAmount {
                amount: amount.minor(),
            });
        }

        if self.balance < amount {
            return Err(WalletError::InsufficientFunds {
                requested: amount.minor(),
                available: self.balance.minor(),
            });
        }

        Ok(vec![WalletEvent::debited(
            customer_id,
            amount,
            purpose,
            reference,
            order_number,
        )])
    }

    /// Moves funds from balance into the pending-withdrawal pool.
    pub fn reserve_withdrawal(
        &self,
        customer_id: CustomerId,
        amount: Money,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        if !amount.is_positive() {
            return Err(WalletError::InvalidAmount {
                amount: amount.minor(),
            });
        }

        if self.balance < amount {
            return Err(WalletError::InsufficientFunds {
                requested: amount.minor(),
                available: self.balance.minor(),
            });
        }

        Ok(vec![WalletEvent::withdrawal_reserved(customer_id, amount)])
    }

    /// Resolves a pending withdrawal to completed or failed.
    ///
    /// A failed withdrawal restores the balance. A transaction resolves
    /// exactly once.
    pub fn resolve_withdrawal(
        &self,
        transaction_id: Uuid,
        approved: bool,
    ) -> Result<Vec<WalletEvent>, WalletError> {
        let tx = self
            .transaction(transaction_id)
            .ok_or(WalletError::TransactionNotFound { transaction_id })?;

        if tx.status != TransactionStatus::Pending {
            return Err(WalletError::AlreadyResolved { transaction_id });
        }

        Ok(vec![WalletEvent::withdrawal_resolved(
            transaction_id,
            approved,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wallet_with_balance(customer: CustomerId, minor: i64) -> Wallet {
        let mut wallet = Wallet::default();
        wallet.apply_events(
            wallet
                .credit(customer, Money::from_minor(minor), "top-up", "ref-1", None)
                .unwrap(),
        );
        wallet
    }

    #[test]
    fn credit_adjusts_balance_and_ledger_together() {
        let customer = CustomerId::new();
        let wallet = wallet_with_balance(customer, 5_000);

        assert_eq!(wallet.balance().minor(), 5_000);
        assert_eq!(wallet.total_earned().minor(), 5_000);
        assert_eq!(wallet.transactions().len(), 1);
        assert_eq!(
            wallet.transactions()[0].status,
            TransactionStatus::Completed
        );
        assert_eq!(wallet.ledger_net(), wallet.balance() + wallet.pending_balance());
    }

    #[test]
    fn debit_requires_sufficient_balance() {
        let customer = CustomerId::new();
        let wallet = wallet_with_balance(customer, 1_000);

        let result = wallet.debit(customer, Money::from_minor(1_001), "order", "ORD-1", None);
        assert!(matches!(
            result,
            Err(WalletError::InsufficientFunds {
                requested: 1_001,
                available: 1_000
            })
        ));
    }

    #[test]
    fn debit_moves_balance_to_spent() {
        let customer = CustomerId::new();
        let mut wallet = wallet_with_balance(customer, 20_000);

        wallet.apply_events(
            wallet
                .debit(
                    customer,
                    Money::from_minor(16_500),
                    "order payment",
                    "ORD-1",
                    Some(OrderNumber::new("ORD-1")),
                )
                .unwrap(),
        );

        assert_eq!(wallet.balance().minor(), 3_500);
        assert_eq!(wallet.total_spent().minor(), 16_500);
        assert_eq!(wallet.transactions().len(), 2);
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        let customer = CustomerId::new();
        let wallet = Wallet::default();
        assert!(wallet.credit(customer, Money::zero(), "x", "r", None).is_err());
        assert!(
            wallet
                .debit(customer, Money::from_minor(-5), "x", "r", None)
                .is_err()
        );
        assert!(
            wallet
                .reserve_withdrawal(customer, Money::zero())
                .is_err()
        );
    }

    #[test]
    fn withdrawal_reserve_and_approve() {
        let customer = CustomerId::new();
        let mut wallet = wallet_with_balance(customer, 10_000);

        wallet.apply_events(
            wallet
                .reserve_withdrawal(customer, Money::from_minor(4_000))
                .unwrap(),
        );
        assert_eq!(wallet.balance().minor(), 6_000);
        assert_eq!(wallet.pending_balance().minor(), 4_000);

        let tx_id = wallet.transactions().last().unwrap().id;
        wallet.apply_events(wallet.resolve_withdrawal(tx_id, true).unwrap());

        assert_eq!(wallet.pending_balance().minor(), 0);
        assert_eq!(wallet.total_withdrawn().minor(), 4_000);
        assert_eq!(
            wallet.transaction(tx_id).unwrap().status,
            TransactionStatus::Completed
        );
    }

    #[test]
    fn failed_withdrawal_restores_balance() {
        let customer = CustomerId::new();
        let mut wallet = wallet_with_balance(customer, 10_000);

        wallet.apply_events(
            wallet
                .reserve_withdrawal(customer, Money::from_minor(4_000))
                .unwrap(),
        );
        let tx_id = wallet.transactions().last().unwrap().id;
        wallet.apply_events(wallet.resolve_withdrawal(tx_id, false).unwrap());

        assert_eq!(wallet.balance().minor(), 10_000);
        assert_eq!(wallet.pending_balance().minor(), 0);
        assert_eq!(wallet.total_withdrawn().minor(), 0);
        assert_eq!(
            wallet.transaction(tx_id).unwrap().status,
            TransactionStatus::Failed
        );
    }

    #[test]
    fn withdrawal_resolves_exactly_once() {
        let customer = CustomerId::new();
        let mut wallet = wallet_with_balance(customer, 10_000);

        wallet.apply_events(
            wallet
                .reserve_withdrawal(customer, Money::from_minor(1_000))
                .unwrap(),
        );
        let tx_id = wallet.transactions().last().unwrap().id;
        wallet.apply_events(wallet.resolve_withdrawal(tx_id, true).unwrap());

        assert!(matches!(
            wallet.resolve_withdrawal(tx_id, false),
            Err(WalletError::AlreadyResolved { .. })
        ));
        assert!(matches!(
            wallet.resolve_withdrawal(Uuid::new_v4(), true),
            Err(WalletError::TransactionNotFound { .. })
        ));
    }

    /// One step of a random wallet workout.
    #[derive(Debug, Clone)]
    enum Op {
        Credit(i64),
        Debit(i64),
        Reserve(i64),
        Resolve { approved: bool },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..50_000).prop_map(Op::Credit),
            (1i64..50_000).prop_map(Op::Debit),
            (1i64..50_000).prop_map(Op::Reserve),
            any::<bool>().prop_map(|approved| Op::Resolve { approved }),
        ]
    }

    proptest! {
        /// For every history of credit/debit/withdraw operations,
        /// `balance + pending_balance` equals the net of completed
        /// ledger entries, and no counter ever goes negative.
        #[test]
        fn ledger_invariant_holds_for_random_histories(
            ops in proptest::collection::vec(op_strategy(), 1..60)
        ) {
            let customer = CustomerId::new();
            let mut wallet = Wallet::default();

            for op in ops {
                let events = match op {
                    Op::Credit(minor) => wallet
                        .credit(customer, Money::from_minor(minor), "top-up", "r", None)
                        .ok(),
                    Op::Debit(minor) => wallet
                        .debit(customer, Money::from_minor(minor), "spend", "r", None)
                        .ok(),
                    Op::Reserve(minor) => wallet
                        .reserve_withdrawal(customer, Money::from_minor(minor))
                        .ok(),
                    Op::Resolve { approved } => wallet
                        .transactions()
                        .iter()
                        .find(|t| t.status == TransactionStatus::Pending)
                        .map(|t| t.id)
                        .and_then(|id| wallet.resolve_withdrawal(id, approved).ok()),
                };

                if let Some(events) = events {
                    wallet.apply_events(events);
                }

                prop_assert_eq!(
                    wallet.ledger_net(),
                    wallet.balance() + wallet.pending_balance()
                );
                prop_assert!(!wallet.balance().is_negative());
                prop_assert!(!wallet.pending_balance().is_negative());
                prop_assert!(!wallet.total_withdrawn().is_negative());
            }
        }

        /// No transaction amount is ever edited after append.
        #[test]
        fn transactions_are_append_only(
            ops in proptest::collection::vec(op_strategy(), 1..40)
        ) {
            let customer = CustomerId::new();
            let mut wallet = Wallet::default();
            let mut seen: Vec<(Uuid, Money)> = Vec::new();

            for op in ops {
                let events = match op {
                    Op::Credit(minor) => wallet
                        .credit(customer, Money::from_minor(minor), "top-up", "r", None)
                        .ok(),
                    Op::Debit(minor) => wallet
                        .debit(customer, Money::from_minor(minor), "spend", "r", None)
                        .ok(),
                    Op::Reserve(minor) => wallet
                        .reserve_withdrawal(customer, Money::from_minor(minor))
                        .ok(),
                    Op::Resolve { approved } => wallet
                        .transactions()
                        .iter()
                        .find(|t| t.status == TransactionStatus::Pending)
                        .map(|t| t.id)
                        .and_then(|id| wallet.resolve_withdrawal(id, approved).ok()),
                };
                if let Some(events) = events {
                    wallet.apply_events(events);
                }

                // Every previously seen transaction still exists with the
                // same amount, in the same order.
                prop_assert!(wallet.transactions().len() >= seen.len());
                for (i, (id, amount)) in seen.iter().enumerate() {
                    prop_assert_eq!(wallet.transactions()[i].id, *id);
                    prop_assert_eq!(wallet.transactions()[i].amount, *amount);
                }
                seen = wallet
                    .transactions()
                    .iter()
                    .map(|t| (t.id, t.amount))
                    .collect();
            }
        }
    }
}
