//! Domain layer: the order and wallet aggregates.
//!
//! This crate provides:
//! - the `Aggregate` / `DomainEvent` traits for event-sourced entities
//! - the generic `CommandHandler` (load, execute, append with optimistic
//!   concurrency)
//! - the `Order` aggregate with its two independent status machines
//! - the `Wallet` aggregate with its append-only transaction ledger

pub mod aggregate;
pub mod command;
pub mod error;
pub mod order;
pub mod wallet;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{CommandHandler, CommandResult};
pub use error::DomainError;
pub use order::{
    DeliveryKind, FulfillmentStatus, License, Order, OrderError, OrderEvent, OrderItem,
    OrderService, PaymentMethod, PaymentStatus, ShipmentStatus, Totals, VendorShipment,
};
pub use wallet::{
    TransactionDirection, TransactionStatus, Wallet, WalletError, WalletEvent, WalletService,
    WalletTransaction,
};
