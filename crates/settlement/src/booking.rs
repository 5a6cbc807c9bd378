//! Shipment booking saga.
//!
//! Runs once per vendor shipment after the order is eligible (payment
//! completed, or a confirmed cash-on-delivery order). Each vendor's
//! booking is independent: a failure is logged, leaves that shipment
//! pending, and never touches sibling vendors or the recorded payment.

use std::sync::Arc;

use common::{OrderNumber, VendorId};
use domain::{
    FulfillmentStatus, Order, OrderError, OrderService, PaymentMethod, PaymentStatus,
};
use event_store::EventStore;

use crate::cache::{AddressCodeCache, resolve_address};
use crate::collaborators::carrier::{CarrierClient, CourierQuote, Parcel};
use crate::error::SettlementError;
use crate::rates::RateTier;

/// Books courier shipments for an order's vendor parcels.
pub struct ShipmentBooker<S: EventStore> {
    carrier: Arc<dyn CarrierClient>,
    cache: Arc<AddressCodeCache>,
    orders: OrderService<S>,
}

impl<S: EventStore + Clone> Clone for ShipmentBooker<S> {
    fn clone(&self) -> Self {
        Self {
            carrier: self.carrier.clone(),
            cache: self.cache.clone(),
            orders: self.orders.clone(),
        }
    }
}

impl<S: EventStore + Clone> ShipmentBooker<S> {
    /// Creates a new booker.
    pub fn new(
        carrier: Arc<dyn CarrierClient>,
        cache: Arc<AddressCodeCache>,
        orders: OrderService<S>,
    ) -> Self {
        Self {
            carrier,
            cache,
            orders,
        }
    }

    /// Books one vendor's parcel.
    ///
    /// Idempotent: a vendor that already has a tracking reference is a
    /// no-op success.
    #[tracing::instrument(skip(self))]
    pub async fn book_vendor(
        &self,
        number: &OrderNumber,
        vendor_id: VendorId,
    ) -> Result<(), SettlementError> {
        let order = self
            .orders
            .get_order(number)
            .await?
            .ok_or_else(|| SettlementError::OrderNotFound(number.clone()))?;

        let shipment = order.shipment_for(vendor_id).ok_or_else(|| {
            SettlementError::Domain(OrderError::ShipmentNotFound { vendor_id }.into())
        })?;

        if shipment.is_booked() {
            tracing::debug!(%number, %vendor_id, "shipment already booked, skipping");
            return Ok(());
        }

        ensure_bookable(&order)?;

        let destination = order.shipping_address().ok_or_else(|| {
            SettlementError::DeliveryUnavailable("order has no shipping address".to_string())
        })?;

        // Both endpoints must validate before a quote is requested.
        let origin_code =
            resolve_address(self.carrier.as_ref(), &self.cache, &shipment.origin.freeform())
                .await?;
        let destination_code =
            resolve_address(self.carrier.as_ref(), &self.cache, &destination.freeform()).await?;

        let declared_value = order
            .items()
            .iter()
            .filter(|i| shipment.item_ids.contains(&i.item_id))
            .map(|i| i.total_price())
            .sum();
        let parcel = Parcel {
            weight_grams: shipment.weight_grams,
            declared_value,
        };

        let sheet = self
            .carrier
            .fetch_rates(&origin_code, &destination_code, &parcel)
            .await?;

        let delivery = order
            .delivery()
            .unwrap_or(domain::DeliveryKind::Standard);
        let courier = select_courier(&sheet.couriers, delivery.prefers_speed()).ok_or_else(
            || SettlementError::Carrier("no couriers available for booking".to_string()),
        )?;

        let booking = self
            .carrier
            .book(&sheet.request_token, &courier.courier_id)
            .await?;

        self.orders
            .book_shipment(
                number,
                vendor_id,
                courier.courier_name.clone(),
                booking.tracking_ref.clone(),
            )
            .await?;

        metrics::counter!("shipment_bookings_total").increment(1);
        tracing::info!(%number, %vendor_id, tracking_ref = %booking.tracking_ref, "shipment booked");
        Ok(())
    }
}

/// The saga only runs for orders whose money is accounted for: payment
/// completed, or a confirmed cash-on-delivery order awaiting collection.
fn ensure_bookable(order: &Order) -> Result<(), SettlementError> {
    let paid = order.payment() == PaymentStatus::Completed;
    let cod_confirmed = order.payment_method() == Some(PaymentMethod::CashOnDelivery)
        && order.payment() == PaymentStatus::Pending
        && order.fulfillment() == FulfillmentStatus::Confirmed;

    if paid || cod_confirmed {
        Ok(())
    } else {
        Err(SettlementError::DeliveryUnavailable(format!(
            "order is not bookable in {}/{} state",
            order.fulfillment(),
            order.payment()
        )))
    }
}

/// Fastest-first for time-sensitive delivery kinds, cheapest-first
/// otherwise.
fn select_courier(quotes: &[CourierQuote], prefer_speed: bool) -> Option<&CourierQuote> {
    let shippable: Vec<&CourierQuote> = quotes
        .iter()
        .filter(|q| q.tier != RateTier::Pickup && q.tier != RateTier::Digital)
        .collect();

    if prefer_speed {
        shippable.into_iter().min_by_key(|q| q.estimated_days)
    } else {
        shippable.into_iter().min_by_key(|q| q.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;
    use uuid::Uuid;

    use common::{Address, CustomerId, Money, ProductId, ProductKind};
    use domain::{
        DeliveryKind, OrderItem, ShipmentStatus, Totals, VendorShipment,
        order::OrderPlacedData,
    };
    use event_store::InMemoryEventStore;

    use crate::collaborators::carrier::InMemoryCarrierClient;

    fn quote(id: &str, tier: RateTier, price: i64, days: u32) -> CourierQuote {
        CourierQuote::new(id, format!("Courier {id}"), tier, price, days)
    }

    #[test]
    fn courier_selection_policies() {
        let quotes = vec![
            quote("cheap", RateTier::Standard, 1_000, 7),
            quote("fast", RateTier::Express, 3_000, 1),
            quote("mid", RateTier::Standard, 2_000, 3),
        ];

        assert_eq!(
            select_courier(&quotes, false).unwrap().courier_id,
            "cheap"
        );
        assert_eq!(select_courier(&quotes, true).unwrap().courier_id, "fast");
        assert!(select_courier(&[], false).is_none());
    }

    async fn placed_paid_order(
        orders: &OrderService<InMemoryEventStore>,
        origin: Address,
        delivery: DeliveryKind,
    ) -> (OrderNumber, VendorId) {
        let vendor_id = VendorId::new();
        let item = OrderItem {
            item_id: Uuid::new_v4(),
            product_id: ProductId::new("SKU-1"),
            name: "Widget".to_string(),
            image: None,
            unit_price: Money::from_minor(10_000),
            quantity: 1,
            vendor_id,
            kind: ProductKind::Physical,
        };
        let shipment = VendorShipment {
            vendor_id,
            origin,
            item_ids: vec![item.item_id],
            weight_grams: 800,
            shipping_cost: Money::from_minor(1_500),
            courier: None,
            tracking_ref: None,
            status: ShipmentStatus::Pending,
        };
        let number = OrderNumber::generate();
        let data = OrderPlacedData {
            order_number: number.clone(),
            customer_id: CustomerId::new(),
            totals: Totals::compute(
                item.total_price(),
                Money::zero(),
                shipment.shipping_cost,
                Money::zero(),
            ),
            items: vec![item],
            shipments: vec![shipment],
            delivery,
            payment_method: domain::PaymentMethod::Wallet,
            coupon_code: None,
            shipping_address: Some(Address::new("1 Fleet St", "Lagos", "LA", "NG")),
            placed_at: Utc::now(),
        };

        orders.place_order(data).await.unwrap();
        orders.complete_payment(&number, None).await.unwrap();
        (number, vendor_id)
    }

    fn booker(
        carrier: &InMemoryCarrierClient,
        orders: OrderService<InMemoryEventStore>,
    ) -> ShipmentBooker<InMemoryEventStore> {
        ShipmentBooker::new(
            Arc::new(carrier.clone()),
            Arc::new(AddressCodeCache::new(16, Duration::from_secs(60))),
            orders,
        )
    }

    #[tokio::test]
    async fn books_and_records_tracking() {
        let store = InMemoryEventStore::new();
        let orders = OrderService::new(store.clone());
        let carrier = InMemoryCarrierClient::new();

        let origin = Address::new("9 Depot Rd", "Ibadan", "OY", "NG");
        carrier.set_quotes(
            &origin.freeform(),
            vec![quote("c1", RateTier::Standard, 1_500, 4)],
        );

        let (number, vendor) =
            placed_paid_order(&orders, origin, DeliveryKind::Standard).await;

        booker(&carrier, orders.clone())
            .book_vendor(&number, vendor)
            .await
            .unwrap();

        let order = orders.get_order(&number).await.unwrap().unwrap();
        let shipment = order.shipment_for(vendor).unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Created);
        assert!(shipment.tracking_ref.as_deref().unwrap().starts_with("TRACK-"));
        assert_eq!(carrier.booking_count(), 1);
    }

    #[tokio::test]
    async fn rebooking_is_idempotent() {
        let store = InMemoryEventStore::new();
        let orders = OrderService::new(store.clone());
        let carrier = InMemoryCarrierClient::new();

        let origin = Address::new("9 Depot Rd", "Ibadan", "OY", "NG");
        carrier.set_quotes(
            &origin.freeform(),
            vec![quote("c1", RateTier::Standard, 1_500, 4)],
        );

        let (number, vendor) =
            placed_paid_order(&orders, origin, DeliveryKind::Standard).await;
        let b = booker(&carrier, orders.clone());

        b.book_vendor(&number, vendor).await.unwrap();
        b.book_vendor(&number, vendor).await.unwrap();

        assert_eq!(carrier.booking_count(), 1);
    }

    #[tokio::test]
    async fn booking_failure_leaves_shipment_pending() {
        let store = InMemoryEventStore::new();
        let orders = OrderService::new(store.clone());
        let carrier = InMemoryCarrierClient::new();
        carrier.set_fail_on_book(true);

        let origin = Address::new("9 Depot Rd", "Ibadan", "OY", "NG");
        carrier.set_quotes(
            &origin.freeform(),
            vec![quote("c1", RateTier::Standard, 1_500, 4)],
        );

        let (number, vendor) =
            placed_paid_order(&orders, origin, DeliveryKind::Standard).await;

        let result = booker(&carrier, orders.clone())
            .book_vendor(&number, vendor)
            .await;
        assert!(result.is_err());

        let order = orders.get_order(&number).await.unwrap().unwrap();
        assert_eq!(
            order.shipment_for(vendor).unwrap().status,
            ShipmentStatus::Pending
        );
        // The payment outcome is untouched.
        assert_eq!(order.payment(), PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn unpaid_orders_are_not_bookable() {
        let store = InMemoryEventStore::new();
        let orders = OrderService::new(store.clone());
        let carrier = InMemoryCarrierClient::new();

        // Place but do not pay.
        let vendor_id = VendorId::new();
        let item = OrderItem {
            item_id: Uuid::new_v4(),
            product_id: ProductId::new("SKU-1"),
            name: "Widget".to_string(),
            image: None,
            unit_price: Money::from_minor(10_000),
            quantity: 1,
            vendor_id,
            kind: ProductKind::Physical,
        };
        let number = OrderNumber::generate();
        let data = OrderPlacedData {
            order_number: number.clone(),
            customer_id: CustomerId::new(),
            totals: Totals::compute(item.total_price(), Money::zero(), Money::zero(), Money::zero()),
            shipments: vec![VendorShipment {
                vendor_id,
                origin: Address::new("9 Depot Rd", "Ibadan", "OY", "NG"),
                item_ids: vec![item.item_id],
                weight_grams: 800,
                shipping_cost: Money::zero(),
                courier: None,
                tracking_ref: None,
                status: ShipmentStatus::Pending,
            }],
            items: vec![item],
            delivery: DeliveryKind::Standard,
            payment_method: domain::PaymentMethod::Wallet,
            coupon_code: None,
            shipping_address: Some(Address::new("1 Fleet St", "Lagos", "LA", "NG")),
            placed_at: Utc::now(),
        };
        orders.place_order(data).await.unwrap();

        let result = booker(&carrier, orders)
            .book_vendor(&number, vendor_id)
            .await;
        assert!(matches!(result, Err(SettlementError::DeliveryUnavailable(_))));
    }
}
