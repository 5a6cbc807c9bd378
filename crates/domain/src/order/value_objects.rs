//! Value objects owned by the order aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{Address, Money, ProductId, ProductKind, VendorId};

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryKind {
    Standard,
    Express,
    SameDay,
    Pickup,
    /// Electronic delivery only; no parcels.
    Digital,
}

impl DeliveryKind {
    /// Returns true for the time-sensitive kinds that select couriers
    /// fastest-first.
    pub fn prefers_speed(&self) -> bool {
        matches!(self, DeliveryKind::Express | DeliveryKind::SameDay)
    }

    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryKind::Standard => "standard",
            DeliveryKind::Express => "express",
            DeliveryKind::SameDay => "same_day",
            DeliveryKind::Pickup => "pickup",
            DeliveryKind::Digital => "digital",
        }
    }
}

impl std::fmt::Display for DeliveryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the order is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Redirect to the external payment gateway.
    Gateway,

    /// Immediate debit from the customer's wallet.
    Wallet,

    /// Cash on delivery; collected out of band.
    CashOnDelivery,
}

impl PaymentMethod {
    /// Returns the method name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Gateway => "gateway",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable snapshot of a product at order-creation time.
///
/// Never changes after the order is placed, even if the source product is
/// later repriced or deleted. This is the audit-trail guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Identity of this line within the order.
    pub item_id: Uuid,

    /// The product this line snapshots.
    pub product_id: ProductId,

    /// Product name at purchase time.
    pub name: String,

    /// Product image at purchase time.
    pub image: Option<String>,

    /// Price per unit at purchase time.
    pub unit_price: Money,

    /// Quantity ordered.
    pub quantity: u32,

    /// The vendor that owns the product.
    pub vendor_id: VendorId,

    /// Resolved product classification.
    pub kind: ProductKind,
}

impl OrderItem {
    /// Returns the total price for this line (quantity × unit price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Lifecycle of one vendor's parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    /// Waiting for a courier booking.
    #[default]
    Pending,

    /// A courier booking exists.
    Created,

    /// The order was cancelled before delivery.
    Cancelled,
}

impl ShipmentStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::Created => "created",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One vendor's portion of an order's physical goods.
///
/// Exists only for vendors that contributed at least one physical item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorShipment {
    /// The vendor shipping this parcel.
    pub vendor_id: VendorId,

    /// Where the parcel ships from.
    pub origin: Address,

    /// The order items travelling in this parcel.
    pub item_ids: Vec<Uuid>,

    /// Total weight of the parcel, captured at order creation.
    pub weight_grams: u32,

    /// What the customer was charged for this vendor's portion.
    pub shipping_cost: Money,

    /// Courier chosen at booking time.
    pub courier: Option<String>,

    /// Carrier tracking reference once booked.
    pub tracking_ref: Option<String>,

    /// Current shipment status.
    pub status: ShipmentStatus,
}

impl VendorShipment {
    /// Returns true if this shipment already has a courier booking.
    pub fn is_booked(&self) -> bool {
        self.tracking_ref.is_some()
    }
}

/// A digital-product license issued on settlement of a digital line.
///
/// At most one exists per (order, item).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// The license key.
    pub key: String,

    /// The order item this license was issued for.
    pub item_id: Uuid,

    /// When the license was issued.
    pub issued_at: DateTime<Utc>,

    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,

    /// Whether the license is currently active.
    pub active: bool,
}

/// The monetary breakdown of an order.
///
/// `total` is always derived from the other components; it is never
/// accepted from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub shipping: Money,
    pub tax: Money,
    pub total: Money,
}

impl Totals {
    /// Computes totals from their components.
    pub fn compute(subtotal: Money, discount: Money, shipping: Money, tax: Money) -> Self {
        Self {
            subtotal,
            discount,
            shipping,
            tax,
            total: subtotal - discount + shipping + tax,
        }
    }

    /// Returns true if `total` equals the recomputed sum of components.
    pub fn is_consistent(&self) -> bool {
        self.total == self.subtotal - self.discount + self.shipping + self.tax
    }
}
