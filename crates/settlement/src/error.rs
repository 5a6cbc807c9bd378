//! Settlement error taxonomy.
//!
//! Validation and consistency errors are rejected before (or without)
//! any state mutation; collaborator errors either degrade (rates,
//! bookings) or terminate the order (the initial gateway call).

use thiserror::Error;

use common::{OrderNumber, ProductId};
use domain::DomainError;
use event_store::EventStoreError;

/// Errors that can occur during checkout, verification or cancellation.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The customer has no cart, or the cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Every cart line must order at least one unit.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A cart line references a product the catalog doesn't know.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The product is no longer purchasable.
    #[error("Product is inactive: {0}")]
    ProductInactive(ProductId),

    /// Requested quantity exceeds current stock.
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The payment method cannot settle this cart.
    #[error("Payment method not allowed: {0}")]
    MethodNotAllowed(String),

    /// The requested delivery option is not available for this cart.
    #[error("Delivery option unavailable: {0}")]
    DeliveryUnavailable(String),

    /// The wallet balance does not cover the order total.
    #[error("Insufficient wallet balance: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    /// No order with the given number exists.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderNumber),

    /// Settlement already failed for this order; a new order is required.
    #[error("Payment already failed for order {0}")]
    PaymentAlreadyFailed(OrderNumber),

    /// The gateway verified an amount that doesn't match the order.
    #[error("Gateway amount mismatch: expected {expected}, received {received}")]
    AmountMismatch { expected: i64, received: i64 },

    /// Payment gateway error.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// Carrier service error.
    #[error("Carrier error: {0}")]
    Carrier(String),

    /// Cart service error.
    #[error("Cart service error: {0}")]
    CartStore(String),

    /// Catalog service error.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Event store error.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for settlement results.
pub type Result<T> = std::result::Result<T, SettlementError>;
