//! Order aggregate and related types.

mod aggregate;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use events::{
    FulfillmentAdvancedData, LicenseIssuedData, OrderCancelledData, OrderConfirmedData,
    OrderEvent, OrderPlacedData, PaymentCompletedData, PaymentFailedData, RefundIssuedData,
    ShipmentBookedData, StockCommittedData,
};
pub use service::OrderService;
pub use state::{FulfillmentStatus, PaymentStatus};
pub use value_objects::{
    DeliveryKind, License, OrderItem, PaymentMethod, ShipmentStatus, Totals, VendorShipment,
};

use common::VendorId;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order has already been placed.
    #[error("Order already placed")]
    AlreadyPlaced,

    /// The operation targets an order that doesn't exist yet.
    #[error("Order has not been placed")]
    NotPlaced,

    /// An order must contain at least one item.
    #[error("Order has no items")]
    NoItems,

    /// Every line must order at least one unit.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { quantity: u32, product_id: String },

    /// The total does not equal subtotal - discount + shipping + tax.
    #[error("Order totals are inconsistent")]
    InconsistentTotals,

    /// A shipment was supplied for a vendor with no physical items.
    #[error("Vendor {vendor_id} has no physical items to ship")]
    ShipmentWithoutPhysicalItems { vendor_id: VendorId },

    /// The fulfillment status does not permit the action.
    #[error("Cannot {action} while fulfillment is {current}")]
    InvalidFulfillmentTransition {
        current: FulfillmentStatus,
        action: &'static str,
    },

    /// The payment status does not permit the action.
    #[error("Cannot {action} while payment is {current}")]
    InvalidPaymentTransition {
        current: PaymentStatus,
        action: &'static str,
    },

    /// Cancellation is only legal before anything ships.
    #[error("Cannot cancel an order in {current} fulfillment status")]
    CancellationNotAllowed { current: FulfillmentStatus },

    /// No shipment exists for the vendor.
    #[error("No shipment for vendor {vendor_id}")]
    ShipmentNotFound { vendor_id: VendorId },

    /// The vendor's shipment was cancelled.
    #[error("Shipment for vendor {vendor_id} is cancelled")]
    ShipmentCancelled { vendor_id: VendorId },

    /// No item with the given ID exists on the order.
    #[error("No order item {item_id}")]
    ItemNotFound { item_id: Uuid },

    /// Licenses are only issued for digital or service lines.
    #[error("Item {item_id} is physical; no license applies")]
    LicenseNotApplicable { item_id: Uuid },

    /// A refund was already recorded for this order.
    #[error("Refund already issued")]
    RefundAlreadyIssued,
}
