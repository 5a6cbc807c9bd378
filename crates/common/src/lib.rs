//! Shared value types for the marketplace settlement system.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{Address, CustomerId, OrderNumber, ProductId, ProductKind, StreamId, VendorId};
