//! Order aggregate implementation.

use common::{Address, CustomerId, Money, OrderNumber, StreamId, VendorId};
use event_store::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::Aggregate;

use super::OrderError;
use super::events::{OrderEvent, OrderPlacedData};
use super::state::{FulfillmentStatus, PaymentStatus};
use super::value_objects::{
    DeliveryKind, License, OrderItem, PaymentMethod, ShipmentStatus, Totals, VendorShipment,
};

/// Order aggregate root.
///
/// Created once from a validated, priced cart and mutated only through
/// the state-machine transitions below; never deleted. The fulfillment
/// and payment statuses evolve independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    order_number: Option<OrderNumber>,

    #[serde(default)]
    version: Version,

    customer_id: Option<CustomerId>,

    /// Immutable line snapshots, in cart order.
    items: Vec<OrderItem>,

    /// One per vendor that contributed physical items.
    shipments: Vec<VendorShipment>,

    totals: Totals,

    delivery: Option<DeliveryKind>,
    payment_method: Option<PaymentMethod>,

    fulfillment: FulfillmentStatus,
    payment: PaymentStatus,

    gateway_ref: Option<String>,
    coupon_code: Option<String>,
    shipping_address: Option<Address>,

    refund_amount: Option<Money>,
    refund_reason: Option<String>,
    cancel_reason: Option<String>,

    /// Set once the inventory decrement side effect has run.
    stock_committed: bool,

    /// Licenses issued for digital lines, at most one per item.
    licenses: Vec<License>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn stream_id(&self) -> Option<StreamId> {
        self.order_number.as_ref().map(StreamId::order)
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_placed(data),
            OrderEvent::PaymentCompleted(data) => {
                self.payment = PaymentStatus::Completed;
                if data.gateway_ref.is_some() {
                    self.gateway_ref = data.gateway_ref;
                }
                // Digital goods need no physical handling; they are
                // delivered the moment the money clears.
                if self.is_digital() {
                    self.fulfillment = FulfillmentStatus::Delivered;
                } else if self.fulfillment == FulfillmentStatus::Pending {
                    self.fulfillment = FulfillmentStatus::Confirmed;
                }
            }
            OrderEvent::PaymentFailed(data) => {
                self.payment = PaymentStatus::Failed;
                self.fulfillment = FulfillmentStatus::Cancelled;
                self.cancel_reason = Some(data.reason);
            }
            OrderEvent::OrderConfirmed(_) => {
                self.fulfillment = FulfillmentStatus::Confirmed;
            }
            OrderEvent::FulfillmentAdvanced(data) => {
                self.fulfillment = data.status;
            }
            OrderEvent::StockCommitted(_) => {
                self.stock_committed = true;
            }
            OrderEvent::ShipmentBooked(data) => {
                if let Some(shipment) = self
                    .shipments
                    .iter_mut()
                    .find(|s| s.vendor_id == data.vendor_id)
                {
                    shipment.courier = Some(data.courier);
                    shipment.tracking_ref = Some(data.tracking_ref);
                    shipment.status = ShipmentStatus::Created;
                }
            }
            OrderEvent::LicenseIssued(data) => {
                self.licenses.push(License {
                    key: data.key,
                    item_id: data.item_id,
                    issued_at: data.issued_at,
                    expires_at: None,
                    active: true,
                });
            }
            OrderEvent::OrderCancelled(data) => {
                self.fulfillment = FulfillmentStatus::Cancelled;
                self.cancel_reason = Some(data.reason);
                for shipment in &mut self.shipments {
                    shipment.status = ShipmentStatus::Cancelled;
                }
            }
            OrderEvent::RefundIssued(data) => {
                self.payment = PaymentStatus::Refunded;
                self.refund_amount = Some(data.amount);
                self.refund_reason = Some(data.reason);
            }
        }
    }
}

// Query methods
impl Order {
    /// Returns the order number.
    pub fn order_number(&self) -> Option<&OrderNumber> {
        self.order_number.as_ref()
    }

    /// Returns the customer who placed the order.
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    /// Returns the line snapshots.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Returns an item by its line ID.
    pub fn item(&self, item_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.item_id == item_id)
    }

    /// Returns the items that must be shipped.
    pub fn physical_items(&self) -> impl Iterator<Item = &OrderItem> {
        self.items.iter().filter(|i| i.kind.requires_shipping())
    }

    /// Returns the vendor shipments.
    pub fn shipments(&self) -> &[VendorShipment] {
        &self.shipments
    }

    /// Returns one vendor's shipment.
    pub fn shipment_for(&self, vendor_id: VendorId) -> Option<&VendorShipment> {
        self.shipments.iter().find(|s| s.vendor_id == vendor_id)
    }

    /// Returns the monetary breakdown.
    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Returns the delivery kind.
    pub fn delivery(&self) -> Option<DeliveryKind> {
        self.delivery
    }

    /// Returns the payment method fixed at creation.
    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    /// Returns the fulfillment status.
    pub fn fulfillment(&self) -> FulfillmentStatus {
        self.fulfillment
    }

    /// Returns the payment status.
    pub fn payment(&self) -> PaymentStatus {
        self.payment
    }

    /// True iff every item is digital or a service.
    pub fn is_digital(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| !i.kind.requires_shipping())
    }

    /// Returns the gateway reference, if the gateway was involved.
    pub fn gateway_ref(&self) -> Option<&str> {
        self.gateway_ref.as_deref()
    }

    /// Returns the coupon applied at checkout.
    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    /// Returns the destination address for physical goods.
    pub fn shipping_address(&self) -> Option<&Address> {
        self.shipping_address.as_ref()
    }

    /// True once the inventory decrement side effect has run.
    pub fn stock_committed(&self) -> bool {
        self.stock_committed
    }

    /// Returns the licenses issued so far.
    pub fn licenses(&self) -> &[License] {
        &self.licenses
    }

    /// Returns the license for an item, if issued.
    pub fn license_for(&self, item_id: Uuid) -> Option<&License> {
        self.licenses.iter().find(|l| l.item_id == item_id)
    }

    /// Returns the refunded amount, if any.
    pub fn refund_amount(&self) -> Option<Money> {
        self.refund_amount
    }

    /// Returns the cancellation reason, if cancelled.
    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }
}

// Command methods (return events)
impl Order {
    /// Commits a validated, priced cart as a new order.
    pub fn place(&self, data: OrderPlacedData) -> Result<Vec<OrderEvent>, OrderError> {
        if self.order_number.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }

        if data.items.is_empty() {
            return Err(OrderError::NoItems);
        }

        if let Some(item) = data.items.iter().find(|i| i.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                quantity: item.quantity,
                product_id: item.product_id.to_string(),
            });
        }

        if !data.totals.is_consistent() {
            return Err(OrderError::InconsistentTotals);
        }

        // A shipment may only exist for a vendor with physical items.
        for shipment in &data.shipments {
            let has_physical = data
                .items
                .iter()
                .any(|i| i.vendor_id == shipment.vendor_id && i.kind.requires_shipping());
            if !has_physical {
                return Err(OrderError::ShipmentWithoutPhysicalItems {
                    vendor_id: shipment.vendor_id,
                });
            }
        }

        Ok(vec![OrderEvent::OrderPlaced(data)])
    }

    /// Records successful settlement.
    pub fn complete_payment(
        &self,
        gateway_ref: Option<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.require_placed()?;

        if !self.payment.can_complete() {
            return Err(OrderError::InvalidPaymentTransition {
                current: self.payment,
                action: "complete payment",
            });
        }

        if self.fulfillment.is_terminal() {
            return Err(OrderError::InvalidFulfillmentTransition {
                current: self.fulfillment,
                action: "complete payment",
            });
        }

        Ok(vec![OrderEvent::payment_completed(gateway_ref)])
    }

    /// Records a failed settlement attempt. Terminal for the order.
    pub fn fail_payment(&self, reason: impl Into<String>) -> Result<Vec<OrderEvent>, OrderError> {
        self.require_placed()?;

        if !self.payment.can_complete() {
            return Err(OrderError::InvalidPaymentTransition {
                current: self.payment,
                action: "fail payment",
            });
        }

        Ok(vec![OrderEvent::payment_failed(reason)])
    }

    /// Accepts a cash-on-delivery order for fulfillment; payment stays
    /// pending until the out-of-band collection event.
    pub fn confirm(&self) -> Result<Vec<OrderEvent>, OrderError> {
        self.require_placed()?;

        if self.fulfillment != FulfillmentStatus::Pending {
            return Err(OrderError::InvalidFulfillmentTransition {
                current: self.fulfillment,
                action: "confirm",
            });
        }

        Ok(vec![OrderEvent::order_confirmed()])
    }

    /// Applies a vendor-initiated fulfillment update. Moves forward only.
    pub fn advance_fulfillment(
        &self,
        next: FulfillmentStatus,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.require_placed()?;

        if !self.fulfillment.can_advance_to(next) {
            return Err(OrderError::InvalidFulfillmentTransition {
                current: self.fulfillment,
                action: "advance fulfillment",
            });
        }

        Ok(vec![OrderEvent::fulfillment_advanced(next)])
    }

    /// Marks the inventory decrement side effect as done. Idempotent:
    /// a second call produces no events.
    pub fn commit_stock(&self) -> Result<Vec<OrderEvent>, OrderError> {
        self.require_placed()?;

        if self.stock_committed {
            return Ok(vec![]);
        }

        if self.fulfillment == FulfillmentStatus::Pending
            || self.fulfillment == FulfillmentStatus::Cancelled
        {
            return Err(OrderError::InvalidFulfillmentTransition {
                current: self.fulfillment,
                action: "commit stock",
            });
        }

        Ok(vec![OrderEvent::stock_committed()])
    }

    /// Records a courier booking for one vendor's parcel. Re-invocation
    /// for an already-booked vendor is a no-op.
    pub fn book_shipment(
        &self,
        vendor_id: VendorId,
        courier: impl Into<String>,
        tracking_ref: impl Into<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.require_placed()?;

        let shipment = self
            .shipment_for(vendor_id)
            .ok_or(OrderError::ShipmentNotFound { vendor_id })?;

        if shipment.is_booked() {
            return Ok(vec![]);
        }

        if shipment.status == ShipmentStatus::Cancelled {
            return Err(OrderError::ShipmentCancelled { vendor_id });
        }

        Ok(vec![OrderEvent::shipment_booked(
            vendor_id,
            courier,
            tracking_ref,
        )])
    }

    /// Issues a license for a digital line. At most one per item; a
    /// second call is a no-op.
    pub fn issue_license(
        &self,
        item_id: Uuid,
        key: impl Into<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.require_placed()?;

        let item = self.item(item_id).ok_or(OrderError::ItemNotFound { item_id })?;

        if item.kind.requires_shipping() {
            return Err(OrderError::LicenseNotApplicable { item_id });
        }

        if self.license_for(item_id).is_some() {
            return Ok(vec![]);
        }

        Ok(vec![OrderEvent::license_issued(item_id, key)])
    }

    /// Cancels the order. Legal only while nothing has shipped.
    pub fn cancel(&self, reason: impl Into<String>) -> Result<Vec<OrderEvent>, OrderError> {
        self.require_placed()?;

        if !self.fulfillment.can_cancel() {
            return Err(OrderError::CancellationNotAllowed {
                current: self.fulfillment,
            });
        }

        Ok(vec![OrderEvent::order_cancelled(reason)])
    }

    /// Records the wallet refund of a cancelled, paid order.
    pub fn record_refund(
        &self,
        amount: Money,
        reason: impl Into<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.require_placed()?;

        if self.fulfillment != FulfillmentStatus::Cancelled {
            return Err(OrderError::InvalidFulfillmentTransition {
                current: self.fulfillment,
                action: "record refund",
            });
        }

        if !self.payment.can_refund() {
            return Err(OrderError::InvalidPaymentTransition {
                current: self.payment,
                action: "record refund",
            });
        }

        if self.refund_amount.is_some() {
            return Err(OrderError::RefundAlreadyIssued);
        }

        Ok(vec![OrderEvent::refund_issued(amount, reason)])
    }

    fn require_placed(&self) -> Result<(), OrderError> {
        if self.order_number.is_none() {
            return Err(OrderError::NotPlaced);
        }
        Ok(())
    }

    fn apply_placed(&mut self, data: OrderPlacedData) {
        self.order_number = Some(data.order_number);
        self.customer_id = Some(data.customer_id);
        self.items = data.items;
        self.shipments = data.shipments;
        self.totals = data.totals;
        self.delivery = Some(data.delivery);
        self.payment_method = Some(data.payment_method);
        self.coupon_code = data.coupon_code;
        self.shipping_address = data.shipping_address;
        self.fulfillment = FulfillmentStatus::Pending;
        self.payment = PaymentStatus::Pending;
    }
}
