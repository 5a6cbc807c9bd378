//! End-to-end checkout, verification and cancellation flows against the
//! in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use common::{Address, CustomerId, Money, ProductId, ProductKind, VendorId};
use domain::{DeliveryKind, FulfillmentStatus, PaymentMethod, PaymentStatus, ShipmentStatus};
use event_store::InMemoryEventStore;
use settlement::collaborators::{
    Cart, CartLine, CourierQuote, InMemoryCarrierClient, InMemoryCartStore, InMemoryCatalog,
    InMemoryCouponService, InMemoryPaymentGateway, InMemoryRewardsService,
    InMemoryVendorDirectory, Product, VendorProfile,
};
use settlement::{
    AddressCodeCache, CheckoutConfig, CheckoutRequest, CheckoutService, CollaboratorSet,
    PaymentInstruction, RateSource, RateTier, SettlementError,
};

struct Harness {
    checkout: CheckoutService<InMemoryEventStore>,
    gateway: InMemoryPaymentGateway,
    carrier: InMemoryCarrierClient,
    carts: InMemoryCartStore,
    catalog: InMemoryCatalog,
    vendors: InMemoryVendorDirectory,
    coupons: InMemoryCouponService,
    rewards: InMemoryRewardsService,
}

fn harness() -> Harness {
    let store = InMemoryEventStore::new();
    let gateway = InMemoryPaymentGateway::new();
    let carrier = InMemoryCarrierClient::new();
    let carts = InMemoryCartStore::new();
    let catalog = InMemoryCatalog::new();
    let vendors = InMemoryVendorDirectory::new();
    let coupons = InMemoryCouponService::new();
    let rewards = InMemoryRewardsService::new();

    let checkout = CheckoutService::new(
        store,
        CollaboratorSet {
            gateway: Arc::new(gateway.clone()),
            carrier: Arc::new(carrier.clone()),
            carts: Arc::new(carts.clone()),
            catalog: Arc::new(catalog.clone()),
            vendors: Arc::new(vendors.clone()),
            coupons: Arc::new(coupons.clone()),
            rewards: Arc::new(rewards.clone()),
        },
        Arc::new(AddressCodeCache::new(64, Duration::from_secs(60))),
        CheckoutConfig::default(),
    );

    Harness {
        checkout,
        gateway,
        carrier,
        carts,
        catalog,
        vendors,
        coupons,
        rewards,
    }
}

impl Harness {
    fn add_vendor(&self, name: &str, supports_pickup: bool) -> VendorId {
        let vendor_id = VendorId::new();
        let origin = Address::new(format!("{name} depot"), "Ibadan", "OY", "NG");

        self.vendors.insert(VendorProfile {
            vendor_id,
            name: name.to_string(),
            origin: origin.clone(),
            supports_pickup,
        });
        self.carrier.set_quotes(
            &origin.freeform(),
            vec![
                CourierQuote::new("std", "Fast Couriers", RateTier::Standard, 1_500, 4),
                CourierQuote::new("exp", "Rapid Couriers", RateTier::Express, 3_000, 1),
            ],
        );

        vendor_id
    }

    fn add_product(
        &self,
        sku: &str,
        vendor_id: VendorId,
        kind: ProductKind,
        price_minor: i64,
        stock: u32,
    ) {
        self.catalog.insert(Product {
            id: ProductId::new(sku),
            name: format!("Product {sku}"),
            image: None,
            vendor_id,
            kind,
            unit_price: Money::from_minor(price_minor),
            weight_grams: 500,
            stock,
            active: true,
        });
    }

    fn set_cart(&self, customer: CustomerId, lines: &[(&str, u32, i64)]) {
        self.carts.set_cart(Cart {
            customer_id: customer,
            lines: lines
                .iter()
                .map(|(sku, quantity, unit_minor)| CartLine {
                    product_id: ProductId::new(*sku),
                    quantity: *quantity,
                    unit_price: Money::from_minor(*unit_minor),
                })
                .collect(),
            coupon_code: None,
            discount: Money::zero(),
        });
    }

    fn request(
        &self,
        customer: CustomerId,
        delivery: DeliveryKind,
        method: PaymentMethod,
    ) -> CheckoutRequest {
        CheckoutRequest {
            customer_id: customer,
            email: "customer@example.com".to_string(),
            delivery,
            payment_method: method,
            destination: Address::new("1 Fleet St", "Lagos", "LA", "NG"),
        }
    }
}

#[tokio::test]
async fn wallet_checkout_of_mixed_cart_end_to_end() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-PHYS", vendor, ProductKind::Physical, 10_000, 5);
    h.add_product("SKU-DIG", vendor, ProductKind::Digital, 5_000, 0);
    h.set_cart(customer, &[("SKU-PHYS", 1, 10_000), ("SKU-DIG", 1, 5_000)]);
    h.checkout
        .wallets()
        .credit(customer, Money::from_minor(20_000), "top-up", "r", None)
        .await
        .unwrap();

    let outcome = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Wallet))
        .await
        .unwrap();

    let order = &outcome.order;
    assert!(matches!(outcome.payment, PaymentInstruction::Paid));
    assert_eq!(outcome.rate_source, Some(RateSource::Carrier));

    // Mixed cart: confirmed, not delivered.
    assert_eq!(order.payment(), PaymentStatus::Completed);
    assert_eq!(order.fulfillment(), FulfillmentStatus::Confirmed);
    assert!(!order.is_digital());

    // Totals: 15_000 subtotal + the one physical vendor's standard rate.
    assert_eq!(order.totals().subtotal.minor(), 15_000);
    assert_eq!(order.totals().shipping.minor(), 1_500);
    assert_eq!(order.totals().total.minor(), 16_500);
    assert!(order.totals().is_consistent());

    // Wallet debited exactly the total.
    let wallet = h.checkout.wallets().get_wallet(customer).await.unwrap();
    assert_eq!(wallet.balance().minor(), 20_000 - 16_500);
    assert_eq!(wallet.total_spent().minor(), 16_500);

    // Stock decremented for the physical item only.
    assert_eq!(h.catalog.stock_of(&ProductId::new("SKU-PHYS")), Some(4));
    assert_eq!(h.catalog.stock_of(&ProductId::new("SKU-DIG")), Some(0));
    assert_eq!(h.catalog.decrement_calls(&ProductId::new("SKU-DIG")), 0);

    // One shipment for the one physical vendor, already booked.
    assert_eq!(order.shipments().len(), 1);
    let shipment = &order.shipments()[0];
    assert_eq!(shipment.vendor_id, vendor);
    assert_eq!(shipment.status, ShipmentStatus::Created);
    assert!(shipment.tracking_ref.is_some());

    // A license exists for the digital line only.
    assert_eq!(order.licenses().len(), 1);

    // Reward fired once, cart cleared after durable creation.
    assert_eq!(h.rewards.awards_for(order.order_number().unwrap()), 1);
    assert!(!h.carts.has_cart(customer));
}

#[tokio::test]
async fn digital_only_order_is_delivered_immediately() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-DIG", vendor, ProductKind::Digital, 5_000, 0);
    h.set_cart(customer, &[("SKU-DIG", 1, 5_000)]);
    h.checkout
        .wallets()
        .credit(customer, Money::from_minor(10_000), "top-up", "r", None)
        .await
        .unwrap();

    let outcome = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Wallet))
        .await
        .unwrap();

    let order = &outcome.order;
    assert!(order.is_digital());
    assert_eq!(order.fulfillment(), FulfillmentStatus::Delivered);
    assert_eq!(order.delivery(), Some(DeliveryKind::Digital));
    assert!(order.shipments().is_empty());
    assert!(order.totals().shipping.is_zero());
    assert_eq!(order.totals().total.minor(), 5_000);
    assert!(outcome.rate_source.is_none());

    // No carrier traffic for a digital order.
    assert_eq!(h.carrier.validate_calls(), 0);
    assert_eq!(h.carrier.booking_count(), 0);
}

#[tokio::test]
async fn gateway_checkout_redirects_then_verifies_idempotently() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 2, 10_000)]);

    let outcome = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Gateway))
        .await
        .unwrap();

    let number = outcome.order.order_number().unwrap().clone();
    assert!(matches!(
        outcome.payment,
        PaymentInstruction::Redirect { .. }
    ));
    // Nothing settled yet: pending/pending, stock untouched.
    assert_eq!(outcome.order.payment(), PaymentStatus::Pending);
    assert_eq!(outcome.order.fulfillment(), FulfillmentStatus::Pending);
    assert_eq!(h.catalog.stock_of(&ProductId::new("SKU-1")), Some(3));

    // Out-of-band verification settles the order.
    let verified = h.checkout.verify_payment(&number).await.unwrap();
    assert_eq!(verified.payment(), PaymentStatus::Completed);
    assert_eq!(verified.fulfillment(), FulfillmentStatus::Confirmed);
    assert_eq!(verified.gateway_ref(), Some(number.as_str()));
    assert_eq!(h.catalog.stock_of(&ProductId::new("SKU-1")), Some(1));

    // Verifying again is a no-op returning the same order.
    let again = h.checkout.verify_payment(&number).await.unwrap();
    assert_eq!(again.order_number(), verified.order_number());
    assert_eq!(again.payment(), PaymentStatus::Completed);
    assert_eq!(h.catalog.decrement_calls(&ProductId::new("SKU-1")), 1);
    assert_eq!(h.rewards.awards_for(&number), 1);
    assert_eq!(h.carrier.booking_count(), 1);
}

#[tokio::test]
async fn failed_gateway_verification_kills_the_order() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 1, 10_000)]);

    let outcome = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Gateway))
        .await
        .unwrap();
    let number = outcome.order.order_number().unwrap().clone();

    h.gateway.set_verify_succeeds(false);
    let result = h.checkout.verify_payment(&number).await;
    assert!(matches!(result, Err(SettlementError::Gateway(_))));

    let order = h.checkout.orders().get_order(&number).await.unwrap().unwrap();
    assert_eq!(order.payment(), PaymentStatus::Failed);
    assert_eq!(order.fulfillment(), FulfillmentStatus::Cancelled);

    // Verifying a failed order is a terminal error, not a retry.
    let again = h.checkout.verify_payment(&number).await;
    assert!(matches!(
        again,
        Err(SettlementError::PaymentAlreadyFailed(_))
    ));
}

#[tokio::test]
async fn gateway_initialize_failure_marks_order_failed() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 1, 10_000)]);
    h.gateway.set_fail_on_initialize(true);

    let result = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Gateway))
        .await;
    assert!(matches!(result, Err(SettlementError::Gateway(_))));

    // The just-created order is failed/failed and stock is untouched.
    assert_eq!(h.catalog.stock_of(&ProductId::new("SKU-1")), Some(3));
}

#[tokio::test]
async fn cash_on_delivery_rejects_digital_items() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-PHYS", vendor, ProductKind::Physical, 10_000, 3);
    h.add_product("SKU-SVC", vendor, ProductKind::Service, 2_000, 0);
    h.set_cart(customer, &[("SKU-PHYS", 1, 10_000), ("SKU-SVC", 1, 2_000)]);

    let result = h
        .checkout
        .checkout(h.request(
            customer,
            DeliveryKind::Standard,
            PaymentMethod::CashOnDelivery,
        ))
        .await;

    assert!(matches!(result, Err(SettlementError::MethodNotAllowed(_))));
    // Rejected before any state mutation: cart intact, stock intact.
    assert!(h.carts.has_cart(customer));
    assert_eq!(h.catalog.stock_of(&ProductId::new("SKU-PHYS")), Some(3));
}

#[tokio::test]
async fn cash_on_delivery_confirms_and_books_without_payment() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 1, 10_000)]);

    let outcome = h
        .checkout
        .checkout(h.request(
            customer,
            DeliveryKind::Standard,
            PaymentMethod::CashOnDelivery,
        ))
        .await
        .unwrap();

    let order = &outcome.order;
    assert!(matches!(outcome.payment, PaymentInstruction::CashOnDelivery));
    assert_eq!(order.fulfillment(), FulfillmentStatus::Confirmed);
    assert_eq!(order.payment(), PaymentStatus::Pending);

    // Stock committed so the goods can't oversell, parcel booked, but
    // no reward until money arrives.
    assert_eq!(h.catalog.stock_of(&ProductId::new("SKU-1")), Some(2));
    assert_eq!(order.shipments()[0].status, ShipmentStatus::Created);
    assert_eq!(h.rewards.awards_for(order.order_number().unwrap()), 0);
}

#[tokio::test]
async fn cancelling_a_paid_order_restocks_and_refunds_exactly_once() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 2, 10_000)]);
    h.checkout
        .wallets()
        .credit(customer, Money::from_minor(30_000), "top-up", "r", None)
        .await
        .unwrap();

    let outcome = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Wallet))
        .await
        .unwrap();
    let number = outcome.order.order_number().unwrap().clone();
    let total = outcome.order.totals().total;
    let tracking = outcome.order.shipments()[0]
        .tracking_ref
        .clone()
        .unwrap();
    assert_eq!(h.catalog.stock_of(&ProductId::new("SKU-1")), Some(1));

    let cancelled = h.checkout.cancel_order(&number, "changed my mind").await.unwrap();

    assert_eq!(cancelled.fulfillment(), FulfillmentStatus::Cancelled);
    assert_eq!(cancelled.payment(), PaymentStatus::Refunded);
    assert_eq!(cancelled.refund_amount(), Some(total));
    assert_eq!(cancelled.shipments()[0].status, ShipmentStatus::Cancelled);

    // Stock restored, carrier cancelled, wallet credited the full total.
    assert_eq!(h.catalog.stock_of(&ProductId::new("SKU-1")), Some(3));
    assert_eq!(h.carrier.cancelled_refs(), vec![tracking]);
    let wallet = h.checkout.wallets().get_wallet(customer).await.unwrap();
    assert_eq!(wallet.balance().minor(), 30_000);

    // A second cancellation is rejected; the refund happened once.
    assert!(h.checkout.cancel_order(&number, "again").await.is_err());
    let wallet = h.checkout.wallets().get_wallet(customer).await.unwrap();
    assert_eq!(wallet.balance().minor(), 30_000);
}

#[tokio::test]
async fn failed_carrier_cancel_does_not_block_the_refund() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 1, 10_000)]);
    h.checkout
        .wallets()
        .credit(customer, Money::from_minor(20_000), "top-up", "r", None)
        .await
        .unwrap();

    let outcome = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Wallet))
        .await
        .unwrap();
    let number = outcome.order.order_number().unwrap().clone();

    h.carrier.set_fail_on_cancel(true);
    let cancelled = h.checkout.cancel_order(&number, "refund me").await.unwrap();

    assert_eq!(cancelled.payment(), PaymentStatus::Refunded);
    let wallet = h.checkout.wallets().get_wallet(customer).await.unwrap();
    assert_eq!(wallet.balance().minor(), 20_000);
}

#[tokio::test]
async fn cancelling_an_unpaid_order_refunds_nothing() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 1, 10_000)]);

    let outcome = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Gateway))
        .await
        .unwrap();
    let number = outcome.order.order_number().unwrap().clone();

    let cancelled = h.checkout.cancel_order(&number, "never paid").await.unwrap();

    assert_eq!(cancelled.fulfillment(), FulfillmentStatus::Cancelled);
    assert_eq!(cancelled.payment(), PaymentStatus::Pending);
    assert!(cancelled.refund_amount().is_none());
    // Stock was never committed, so nothing was restored.
    assert_eq!(h.catalog.stock_of(&ProductId::new("SKU-1")), Some(3));
}

#[tokio::test]
async fn cancellation_is_rejected_once_shipped() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 1, 10_000)]);
    h.checkout
        .wallets()
        .credit(customer, Money::from_minor(20_000), "top-up", "r", None)
        .await
        .unwrap();

    let outcome = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Wallet))
        .await
        .unwrap();
    let number = outcome.order.order_number().unwrap().clone();

    h.checkout
        .orders()
        .advance_fulfillment(&number, FulfillmentStatus::Shipped)
        .await
        .unwrap();

    let result = h.checkout.cancel_order(&number, "too late").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn insufficient_wallet_balance_rejects_before_any_order_exists() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 1, 10_000)]);
    h.checkout
        .wallets()
        .credit(customer, Money::from_minor(1_000), "top-up", "r", None)
        .await
        .unwrap();

    let result = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Wallet))
        .await;

    assert!(matches!(
        result,
        Err(SettlementError::InsufficientFunds { .. })
    ));
    // No mutation anywhere: cart intact, wallet intact, stock intact.
    assert!(h.carts.has_cart(customer));
    let wallet = h.checkout.wallets().get_wallet(customer).await.unwrap();
    assert_eq!(wallet.balance().minor(), 1_000);
    assert_eq!(h.catalog.stock_of(&ProductId::new("SKU-1")), Some(3));
}

#[tokio::test]
async fn stock_shortage_rejects_before_any_order_exists() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 1);
    h.set_cart(customer, &[("SKU-1", 2, 10_000)]);

    let result = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Gateway))
        .await;

    assert!(matches!(
        result,
        Err(SettlementError::InsufficientStock {
            requested: 2,
            available: 1,
            ..
        })
    ));
    assert!(h.carts.has_cart(customer));
}

#[tokio::test]
async fn booking_failure_leaves_payment_intact_and_is_retryable() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 1, 10_000)]);
    h.checkout
        .wallets()
        .credit(customer, Money::from_minor(20_000), "top-up", "r", None)
        .await
        .unwrap();

    h.carrier.set_fail_on_book(true);
    let outcome = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Wallet))
        .await
        .unwrap();

    // Checkout succeeded; the shipment just stayed pending.
    let number = outcome.order.order_number().unwrap().clone();
    assert_eq!(outcome.order.payment(), PaymentStatus::Completed);
    assert_eq!(outcome.order.shipments()[0].status, ShipmentStatus::Pending);

    // The booking task stays queued and succeeds on retry.
    h.carrier.set_fail_on_book(false);
    h.checkout.retry_pending_tasks().await;

    let order = h.checkout.orders().get_order(&number).await.unwrap().unwrap();
    assert_eq!(order.shipments()[0].status, ShipmentStatus::Created);
    assert_eq!(h.carrier.booking_count(), 1);
}

#[tokio::test]
async fn rewards_failure_never_fails_checkout() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 1, 10_000)]);
    h.checkout
        .wallets()
        .credit(customer, Money::from_minor(20_000), "top-up", "r", None)
        .await
        .unwrap();

    h.rewards.set_fail_on_award(true);
    let outcome = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Wallet))
        .await
        .unwrap();

    assert_eq!(outcome.order.payment(), PaymentStatus::Completed);
    assert_eq!(h.rewards.awards_for(outcome.order.order_number().unwrap()), 0);
}

#[tokio::test]
async fn carrier_outage_degrades_to_fallback_pricing() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 1, 10_000)]);
    h.checkout
        .wallets()
        .credit(customer, Money::from_minor(20_000), "top-up", "r", None)
        .await
        .unwrap();

    h.carrier.set_fail_on_rates(true);
    let outcome = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Wallet))
        .await
        .unwrap();

    // The order went through on fallback pricing, and the caller can
    // see that the price was not carrier-confirmed.
    assert_eq!(outcome.rate_source, Some(RateSource::Fallback));
    assert_eq!(
        outcome.order.totals().shipping.minor(),
        settlement::rates::FALLBACK_STANDARD_MINOR
    );
}

#[tokio::test]
async fn multi_vendor_cart_produces_one_shipment_per_physical_vendor() {
    let h = harness();
    let customer = CustomerId::new();
    let v1 = h.add_vendor("Alpha", false);
    let v2 = h.add_vendor("Beta", false);
    let v3 = h.add_vendor("Gamma", false);

    h.add_product("SKU-A", v1, ProductKind::Physical, 4_000, 5);
    h.add_product("SKU-B", v2, ProductKind::Physical, 6_000, 5);
    h.add_product("SKU-C", v3, ProductKind::Digital, 2_000, 0);
    h.set_cart(
        customer,
        &[("SKU-A", 1, 4_000), ("SKU-B", 1, 6_000), ("SKU-C", 1, 2_000)],
    );
    h.checkout
        .wallets()
        .credit(customer, Money::from_minor(50_000), "top-up", "r", None)
        .await
        .unwrap();

    let outcome = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Wallet))
        .await
        .unwrap();

    let order = &outcome.order;
    assert_eq!(order.items().len(), 3);
    // Two physical vendors, two shipments; the digital vendor has none.
    assert_eq!(order.shipments().len(), 2);
    assert!(order.shipment_for(v1).is_some());
    assert!(order.shipment_for(v2).is_some());
    assert!(order.shipment_for(v3).is_none());

    // Shipping is the sum of both vendors' standard rates, and each
    // shipment carries its own vendor's portion.
    assert_eq!(order.totals().shipping.minor(), 3_000);
    assert_eq!(order.shipment_for(v1).unwrap().shipping_cost.minor(), 1_500);
    assert_eq!(order.shipment_for(v2).unwrap().shipping_cost.minor(), 1_500);

    // Both parcels booked independently.
    assert_eq!(h.carrier.booking_count(), 2);
    assert_eq!(order.shipments().iter().filter(|s| s.is_booked()).count(), 2);
}

#[tokio::test]
async fn delivery_options_surface_the_quote_phase() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", true);

    h.add_product("SKU-1", vendor, ProductKind::Physical, 10_000, 3);
    h.set_cart(customer, &[("SKU-1", 1, 10_000)]);

    let rates = h
        .checkout
        .delivery_options(customer, &Address::new("1 Fleet St", "Lagos", "LA", "NG"))
        .await
        .unwrap();

    assert_eq!(rates.source, RateSource::Carrier);
    assert!(rates.option_for(RateTier::Pickup).is_some());
    assert_eq!(
        rates.option_for(RateTier::Standard).unwrap().price.minor(),
        1_500
    );
    assert_eq!(
        rates.option_for(RateTier::Express).unwrap().price.minor(),
        3_000
    );
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let h = harness();
    let customer = CustomerId::new();

    let result = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Gateway))
        .await;
    assert!(matches!(result, Err(SettlementError::EmptyCart)));
}

#[tokio::test]
async fn inactive_product_is_rejected() {
    let h = harness();
    let customer = CustomerId::new();
    let vendor = h.add_vendor("Alpha", false);

    h.catalog.insert(Product {
        id: ProductId::new("SKU-DEAD"),
        name: "Gone".to_string(),
        image: None,
        vendor_id: vendor,
        kind: ProductKind::Physical,
        unit_price: Money::from_minor(1_000),
        weight_grams: 100,
        stock: 10,
        active: false,
    });
    h.set_cart(customer, &[("SKU-DEAD", 1, 1_000)]);

    let result = h
        .checkout
        .checkout(h.request(customer, DeliveryKind::Standard, PaymentMethod::Gateway))
        .await;
    assert!(matches!(result, Err(SettlementError::ProductInactive(_))));
}
