//! Order settlement and fulfillment orchestrator.
//!
//! The sequence that turns a cart into a confirmed, paid and (for
//! physical goods) shipped order, split across independent vendors,
//! while keeping the wallet ledger and external gateway state consistent
//! under partial failure:
//!
//! cart → vendor partitioner → rate aggregator → order (pending/pending)
//! → settlement strategy → post-settlement side effects + shipment
//! booking saga.

pub mod booking;
pub mod cache;
pub mod checkout;
pub mod collaborators;
pub mod error;
pub mod outbox;
pub mod partition;
pub mod rates;
pub mod strategy;

pub use booking::ShipmentBooker;
pub use cache::AddressCodeCache;
pub use checkout::{
    CheckoutConfig, CheckoutOutcome, CheckoutRequest, CheckoutService, CollaboratorSet,
    PaymentInstruction,
};
pub use error::SettlementError;
pub use outbox::{Outbox, Task};
pub use partition::{ResolvedLine, VendorGroup, partition};
pub use rates::{AggregatedRates, RateAggregator, RateOption, RateSource, RateTier};
pub use strategy::{SettlementOutcome, SettlementStrategy};
