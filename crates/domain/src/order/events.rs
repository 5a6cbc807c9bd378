//! Order domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{Address, CustomerId, Money, OrderNumber, VendorId};

use crate::aggregate::DomainEvent;

use super::state::FulfillmentStatus;
use super::value_objects::{DeliveryKind, OrderItem, PaymentMethod, Totals, VendorShipment};

/// Events in an order's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// A validated, priced cart was committed as an order.
    OrderPlaced(OrderPlacedData),

    /// Settlement succeeded and the money is accounted for.
    PaymentCompleted(PaymentCompletedData),

    /// Settlement failed; the order is dead.
    PaymentFailed(PaymentFailedData),

    /// A cash-on-delivery order was accepted for fulfillment while its
    /// payment stays pending.
    OrderConfirmed(OrderConfirmedData),

    /// A vendor moved fulfillment forward.
    FulfillmentAdvanced(FulfillmentAdvancedData),

    /// The inventory decrement side effect ran for this order.
    StockCommitted(StockCommittedData),

    /// A courier booking was recorded for one vendor's parcel.
    ShipmentBooked(ShipmentBookedData),

    /// A license was issued for a digital line.
    LicenseIssued(LicenseIssuedData),

    /// The order was cancelled.
    OrderCancelled(OrderCancelledData),

    /// The paid total was returned to the customer's wallet.
    RefundIssued(RefundIssuedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::PaymentCompleted(_) => "PaymentCompleted",
            OrderEvent::PaymentFailed(_) => "PaymentFailed",
            OrderEvent::OrderConfirmed(_) => "OrderConfirmed",
            OrderEvent::FulfillmentAdvanced(_) => "FulfillmentAdvanced",
            OrderEvent::StockCommitted(_) => "StockCommitted",
            OrderEvent::ShipmentBooked(_) => "ShipmentBooked",
            OrderEvent::LicenseIssued(_) => "LicenseIssued",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
            OrderEvent::RefundIssued(_) => "RefundIssued",
        }
    }
}

/// Data for OrderPlaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_number: OrderNumber,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub shipments: Vec<VendorShipment>,
    pub totals: Totals,
    pub delivery: DeliveryKind,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
    pub shipping_address: Option<Address>,
    pub placed_at: DateTime<Utc>,
}

/// Data for PaymentCompleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCompletedData {
    /// Gateway reference, when settled through the gateway.
    pub gateway_ref: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Data for PaymentFailed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedData {
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Data for OrderConfirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmedData {
    pub confirmed_at: DateTime<Utc>,
}

/// Data for FulfillmentAdvanced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentAdvancedData {
    pub status: FulfillmentStatus,
    pub updated_at: DateTime<Utc>,
}

/// Data for StockCommitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockCommittedData {
    pub committed_at: DateTime<Utc>,
}

/// Data for ShipmentBooked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentBookedData {
    pub vendor_id: VendorId,
    pub courier: String,
    pub tracking_ref: String,
    pub booked_at: DateTime<Utc>,
}

/// Data for LicenseIssued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseIssuedData {
    pub item_id: Uuid,
    pub key: String,
    pub issued_at: DateTime<Utc>,
}

/// Data for OrderCancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
}

/// Data for RefundIssued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundIssuedData {
    pub amount: Money,
    pub reason: String,
    pub refunded_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn payment_completed(gateway_ref: Option<String>) -> Self {
        OrderEvent::PaymentCompleted(PaymentCompletedData {
            gateway_ref,
            completed_at: Utc::now(),
        })
    }

    pub fn payment_failed(reason: impl Into<String>) -> Self {
        OrderEvent::PaymentFailed(PaymentFailedData {
            reason: reason.into(),
            failed_at: Utc::now(),
        })
    }

    pub fn order_confirmed() -> Self {
        OrderEvent::OrderConfirmed(OrderConfirmedData {
            confirmed_at: Utc::now(),
        })
    }

    pub fn fulfillment_advanced(status: FulfillmentStatus) -> Self {
        OrderEvent::FulfillmentAdvanced(FulfillmentAdvancedData {
            status,
            updated_at: Utc::now(),
        })
    }

    pub fn stock_committed() -> Self {
        OrderEvent::StockCommitted(StockCommittedData {
            committed_at: Utc::now(),
        })
    }

    pub fn shipment_booked(
        vendor_id: VendorId,
        courier: impl Into<String>,
        tracking_ref: impl Into<String>,
    ) -> Self {
        OrderEvent::ShipmentBooked(ShipmentBookedData {
            vendor_id,
            courier: courier.into(),
            tracking_ref: tracking_ref.into(),
            booked_at: Utc::now(),
        })
    }

    pub fn license_issued(item_id: Uuid, key: impl Into<String>) -> Self {
        OrderEvent::LicenseIssued(LicenseIssuedData {
            item_id,
            key: key.into(),
            issued_at: Utc::now(),
        })
    }

    pub fn order_cancelled(reason: impl Into<String>) -> Self {
        OrderEvent::OrderCancelled(OrderCancelledData {
            reason: reason.into(),
            cancelled_at: Utc::now(),
        })
    }

    pub fn refund_issued(amount: Money, reason: impl Into<String>) -> Self {
        OrderEvent::RefundIssued(RefundIssuedData {
            amount,
            reason: reason.into(),
            refunded_at: Utc::now(),
        })
    }
}
