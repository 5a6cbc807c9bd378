//! The checkout orchestrator.
//!
//! Turns a cart into a confirmed, paid and (for physical goods) shipped
//! order: validate → price → place → clear cart → settle → post-payment
//! side effects. Every step observes the durably committed result of the
//! previous one.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use common::{Address, CustomerId, Money, OrderNumber};
use domain::{
    DeliveryKind, Order, OrderItem, OrderService, PaymentMethod, PaymentStatus, ShipmentStatus,
    Totals, VendorShipment, WalletService, order::OrderPlacedData,
};
use event_store::EventStore;

use crate::booking::ShipmentBooker;
use crate::cache::AddressCodeCache;
use crate::collaborators::{
    CarrierClient, Cart, CartStore, Catalog, CouponService, GatewayStatus, PaymentGateway,
    RewardsService, VendorDirectory,
};
use crate::error::SettlementError;
use crate::outbox::{Outbox, Task};
use crate::partition::{ResolvedLine, VendorGroup, partition};
use crate::rates::{AggregatedRates, RateAggregator, RateSource, RateTier};
use crate::strategy::{SettlementContext, SettlementOutcome, strategy_for};

/// The external systems the orchestrator talks to.
pub struct CollaboratorSet {
    pub gateway: Arc<dyn PaymentGateway>,
    pub carrier: Arc<dyn CarrierClient>,
    pub carts: Arc<dyn CartStore>,
    pub catalog: Arc<dyn Catalog>,
    pub vendors: Arc<dyn VendorDirectory>,
    pub coupons: Arc<dyn CouponService>,
    pub rewards: Arc<dyn RewardsService>,
}

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Tax rate in basis points, applied to subtotal minus discount.
    pub tax_rate_bps: u32,

    /// Callback URL handed to the payment gateway.
    pub callback_url: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            tax_rate_bps: 0,
            callback_url: "http://localhost:3000/payments/callback".to_string(),
        }
    }
}

/// A checkout request.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_id: CustomerId,
    pub email: String,
    pub delivery: DeliveryKind,
    pub payment_method: PaymentMethod,
    pub destination: Address,
}

/// What the customer does next.
#[derive(Debug, Clone)]
pub enum PaymentInstruction {
    /// Complete payment at the gateway.
    Redirect {
        redirect_url: String,
        access_code: String,
    },

    /// Nothing; the wallet already paid.
    Paid,

    /// Pay the courier on delivery.
    CashOnDelivery,
}

/// Result of a successful checkout.
pub struct CheckoutOutcome {
    pub order: Order,
    pub payment: PaymentInstruction,
    /// Pricing confidence for the shipping portion, when the order has
    /// physical goods.
    pub rate_source: Option<RateSource>,
}

/// Drives the settlement workflow end to end.
pub struct CheckoutService<S: EventStore + Clone> {
    orders: OrderService<S>,
    wallets: WalletService<S>,
    gateway: Arc<dyn PaymentGateway>,
    carts: Arc<dyn CartStore>,
    catalog: Arc<dyn Catalog>,
    vendors: Arc<dyn VendorDirectory>,
    coupons: Arc<dyn CouponService>,
    rewards: Arc<dyn RewardsService>,
    carrier: Arc<dyn CarrierClient>,
    rates: RateAggregator,
    booker: ShipmentBooker<S>,
    outbox: Outbox,
    config: CheckoutConfig,
}

impl<S: EventStore + Clone + 'static> CheckoutService<S> {
    /// Creates a new checkout service.
    pub fn new(
        store: S,
        collaborators: CollaboratorSet,
        cache: Arc<AddressCodeCache>,
        config: CheckoutConfig,
    ) -> Self {
        let orders = OrderService::new(store.clone());
        let rates = RateAggregator::new(collaborators.carrier.clone(), cache.clone());
        let booker = ShipmentBooker::new(
            collaborators.carrier.clone(),
            cache,
            orders.clone(),
        );

        Self {
            orders,
            wallets: WalletService::new(store),
            gateway: collaborators.gateway,
            carts: collaborators.carts,
            catalog: collaborators.catalog,
            vendors: collaborators.vendors,
            coupons: collaborators.coupons,
            rewards: collaborators.rewards,
            carrier: collaborators.carrier,
            rates,
            booker,
            outbox: Outbox::new(),
            config,
        }
    }

    /// Returns the order service sharing this orchestrator's store.
    pub fn orders(&self) -> &OrderService<S> {
        &self.orders
    }

    /// Returns the wallet service sharing this orchestrator's store.
    pub fn wallets(&self) -> &WalletService<S> {
        &self.wallets
    }

    /// The quote phase: delivery options for the customer's current cart.
    #[tracing::instrument(skip(self, destination))]
    pub async fn delivery_options(
        &self,
        customer_id: CustomerId,
        destination: &Address,
    ) -> Result<AggregatedRates, SettlementError> {
        let (_, resolved) = self.resolve_cart(customer_id).await?;
        let groups = partition(self.vendors.as_ref(), resolved).await?;
        Ok(self.rates.quote(&groups, destination).await)
    }

    /// Settles the customer's cart into an order.
    #[tracing::instrument(skip(self, request), fields(customer_id = %request.customer_id, method = %request.payment_method))]
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutOutcome, SettlementError> {
        metrics::counter!("checkout_total").increment(1);
        let started = std::time::Instant::now();

        let result = self.run_checkout(&request).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        if result.is_err() {
            metrics::counter!("checkout_failed_total").increment(1);
        }
        result
    }

    async fn run_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutOutcome, SettlementError> {
        // Validation happens entirely before the order exists: no partial
        // order may survive a failed validation.
        let (cart, resolved) = self.resolve_cart(request.customer_id).await?;

        let is_digital = resolved.iter().all(|l| !l.is_physical());

        if request.payment_method == PaymentMethod::CashOnDelivery
            && let Some(line) = resolved.iter().find(|l| !l.is_physical())
        {
            return Err(SettlementError::MethodNotAllowed(format!(
                "cash on delivery is not available for {} item {}",
                line.product.kind, line.product.id
            )));
        }

        let delivery = if is_digital {
            DeliveryKind::Digital
        } else if request.delivery == DeliveryKind::Digital {
            return Err(SettlementError::DeliveryUnavailable(
                "cart contains physical items".to_string(),
            ));
        } else {
            request.delivery
        };

        let groups = partition(self.vendors.as_ref(), resolved).await?;

        let (shipping, rate_source, rates) = if is_digital {
            (Money::zero(), None, None)
        } else {
            let rates = self.rates.quote(&groups, &request.destination).await;
            let tier = RateTier::for_delivery(delivery);
            let option = rates.option_for(tier).ok_or_else(|| {
                SettlementError::DeliveryUnavailable(format!(
                    "no {} option for this cart",
                    tier.label()
                ))
            })?;
            (option.price, Some(rates.source), Some(rates))
        };

        let subtotal = cart.subtotal();
        let tax = (subtotal - cart.discount).apply_bps(self.config.tax_rate_bps);
        let totals = Totals::compute(subtotal, cart.discount, shipping, tax);

        // Wallet balance is pre-checked before the order exists; the
        // debit itself re-checks atomically at settlement time.
        if request.payment_method == PaymentMethod::Wallet {
            let wallet = self.wallets.get_wallet(request.customer_id).await?;
            if wallet.balance() < totals.total {
                return Err(SettlementError::InsufficientFunds {
                    required: totals.total.minor(),
                    available: wallet.balance().minor(),
                });
            }
        }

        let order_number = OrderNumber::generate();
        let (items, shipments) = build_order_lines(&groups, &rates, delivery);

        let data = OrderPlacedData {
            order_number: order_number.clone(),
            customer_id: request.customer_id,
            items,
            shipments,
            totals,
            delivery,
            payment_method: request.payment_method,
            coupon_code: cart.coupon_code.clone(),
            shipping_address: (!is_digital).then(|| request.destination.clone()),
            placed_at: Utc::now(),
        };

        let placed = self.orders.place_order(data).await?;

        // The source cart is cleared only after the order is durable.
        if let Err(e) = self.carts.clear(request.customer_id).await {
            tracing::warn!(order_number = %order_number, error = %e, "cart clear failed after order creation");
        }

        let strategy = strategy_for(
            request.payment_method,
            self.gateway.clone(),
            self.wallets.clone(),
        );
        let outcome = strategy
            .settle(SettlementContext {
                order: &placed.aggregate,
                customer_email: &request.email,
                callback_url: &self.config.callback_url,
            })
            .await;

        match outcome {
            Ok(SettlementOutcome::Redirect {
                redirect_url,
                access_code,
            }) => Ok(CheckoutOutcome {
                order: placed.aggregate,
                payment: PaymentInstruction::Redirect {
                    redirect_url,
                    access_code,
                },
                rate_source,
            }),

            Ok(SettlementOutcome::Paid { gateway_ref }) => {
                let order = self.complete_settlement(&order_number, gateway_ref).await?;
                Ok(CheckoutOutcome {
                    order,
                    payment: PaymentInstruction::Paid,
                    rate_source,
                })
            }

            Ok(SettlementOutcome::ConfirmedPendingCollection) => {
                let confirmed = self.orders.confirm(&order_number).await?;
                self.run_confirmation_effects(&confirmed.aggregate).await?;
                self.drain_outbox().await;

                let order = self.load_order(&order_number).await?;
                Ok(CheckoutOutcome {
                    order,
                    payment: PaymentInstruction::CashOnDelivery,
                    rate_source,
                })
            }

            Err(e) => {
                // The order exists but its settlement is dead; mark it
                // failed/failed so the customer can recreate it.
                tracing::warn!(order_number = %order_number, error = %e, "settlement failed, marking order failed");
                self.orders
                    .fail_payment(&order_number, e.to_string())
                    .await?;
                Err(e)
            }
        }
    }

    /// Verifies an out-of-band gateway payment.
    ///
    /// Idempotent: verifying an already-settled order returns the
    /// existing order without re-running any side effect.
    #[tracing::instrument(skip(self))]
    pub async fn verify_payment(&self, number: &OrderNumber) -> Result<Order, SettlementError> {
        let order = self.load_order(number).await?;

        match order.payment() {
            PaymentStatus::Completed | PaymentStatus::Refunded => return Ok(order),
            PaymentStatus::Failed => {
                return Err(SettlementError::PaymentAlreadyFailed(number.clone()));
            }
            PaymentStatus::Pending => {}
        }

        let verification = self.gateway.verify(number).await?;

        match verification.status {
            GatewayStatus::Success => {
                let expected = order.totals().total.minor();
                if verification.amount_minor < expected {
                    return Err(SettlementError::AmountMismatch {
                        expected,
                        received: verification.amount_minor,
                    });
                }

                self.complete_settlement(number, Some(number.as_str().to_string()))
                    .await
            }
            GatewayStatus::Failed => {
                self.orders
                    .fail_payment(number, "gateway reported failure".to_string())
                    .await?;
                Err(SettlementError::Gateway(
                    "payment verification failed".to_string(),
                ))
            }
        }
    }

    /// Cancels an order: restock, best-effort carrier cancellation, and
    /// an exactly-once wallet refund when the order was paid.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        number: &OrderNumber,
        reason: &str,
    ) -> Result<Order, SettlementError> {
        let cancelled = self.orders.cancel(number, reason.to_string()).await?;
        let order = cancelled.aggregate;

        // Physical stock goes back iff it was actually committed.
        if order.stock_committed() {
            for item in order.physical_items() {
                if let Err(e) = self
                    .catalog
                    .increment_stock(&item.product_id, item.quantity)
                    .await
                {
                    tracing::error!(order_number = %number, product_id = %item.product_id, error = %e, "restock failed");
                }
            }
        }

        // Carrier cancellations are best-effort; a failure here must
        // never block the refund below.
        for shipment in order.shipments() {
            if let Some(tracking_ref) = shipment.tracking_ref.as_deref()
                && let Err(e) = self.carrier.cancel(tracking_ref).await
            {
                tracing::warn!(order_number = %number, tracking_ref, error = %e, "carrier cancellation failed");
            }
        }

        if order.payment() == PaymentStatus::Completed {
            let total = order.totals().total;
            let customer = order.customer_id().ok_or_else(|| {
                SettlementError::Domain(domain::DomainError::Rejected(
                    "order has no customer".to_string(),
                ))
            })?;

            self.wallets
                .credit(
                    customer,
                    total,
                    "order refund",
                    number.as_str(),
                    Some(number.clone()),
                )
                .await?;
            self.orders
                .record_refund(number, total, reason.to_string())
                .await?;
            metrics::counter!("refunds_total").increment(1);
        }

        self.load_order(number).await
    }

    /// Retries any tasks left pending by earlier failures.
    pub async fn retry_pending_tasks(&self) {
        self.drain_outbox().await;
    }

    /// Completes settlement after money moved: payment transition, then
    /// the exactly-once side effects and the outbox.
    async fn complete_settlement(
        &self,
        number: &OrderNumber,
        gateway_ref: Option<String>,
    ) -> Result<Order, SettlementError> {
        let completed = self.orders.complete_payment(number, gateway_ref).await?;
        metrics::counter!("settlements_completed_total").increment(1);

        self.run_confirmation_effects(&completed.aggregate).await?;

        self.outbox.enqueue(Task::AwardPoints {
            order: number.clone(),
        });
        self.drain_outbox().await;

        self.load_order(number).await
    }

    /// Stock decrement, coupon usage and licenses. The durable
    /// `stock_committed` flag makes the decrement and the coupon
    /// increment fire once per order no matter how often settlement is
    /// replayed.
    async fn run_confirmation_effects(&self, order: &Order) -> Result<(), SettlementError> {
        let number = order.order_number().ok_or_else(|| {
            SettlementError::Domain(domain::DomainError::Rejected(
                "order has no number".to_string(),
            ))
        })?;

        let commit = self.orders.commit_stock(number).await?;
        let first_commit = !commit.events.is_empty();

        if first_commit {
            for item in order.physical_items() {
                if let Err(e) = self
                    .catalog
                    .decrement_stock(&item.product_id, item.quantity)
                    .await
                {
                    tracing::error!(order_number = %number, product_id = %item.product_id, error = %e, "stock decrement failed");
                }
            }

            if let Some(code) = order.coupon_code()
                && let Err(e) = self.coupons.increment_usage(code).await
            {
                tracing::warn!(order_number = %number, coupon = code, error = %e, "coupon usage increment failed");
            }
        }

        // License issuance is per-item idempotent in the aggregate.
        for item in order.items() {
            if !item.kind.requires_shipping() && order.payment() != PaymentStatus::Pending {
                let key = format!("LIC-{}", Uuid::new_v4().simple());
                self.orders
                    .issue_license(number, item.item_id, key)
                    .await?;
            }
        }

        for shipment in order.shipments() {
            if shipment.status == ShipmentStatus::Pending {
                self.outbox.enqueue(Task::BookShipment {
                    order: number.clone(),
                    vendor: shipment.vendor_id,
                });
            }
        }

        Ok(())
    }

    /// Executes queued tasks. Booking failures stay queued for retry;
    /// reward failures are logged and swallowed by design.
    async fn drain_outbox(&self) {
        for task in self.outbox.drain() {
            match &task {
                Task::AwardPoints { order } => match self.rewards.award_order_points(order).await {
                    Ok(()) => self.outbox.mark_done(&task),
                    Err(e) => {
                        tracing::warn!(order_number = %order, error = %e, "reward award failed (ignored)");
                        self.outbox.mark_done(&task);
                    }
                },
                Task::BookShipment { order, vendor } => {
                    match self.booker.book_vendor(order, *vendor).await {
                        Ok(()) => self.outbox.mark_done(&task),
                        Err(e) => {
                            metrics::counter!("shipment_bookings_failed_total").increment(1);
                            tracing::warn!(order_number = %order, vendor_id = %vendor, error = %e, "shipment booking failed, will retry");
                            self.outbox.requeue(task.clone());
                        }
                    }
                }
            }
        }
    }

    /// Reads the cart and joins every line with its catalog product,
    /// enforcing the shared pre-settlement validation.
    async fn resolve_cart(
        &self,
        customer_id: CustomerId,
    ) -> Result<(Cart, Vec<ResolvedLine>), SettlementError> {
        let cart = self
            .carts
            .cart_for(customer_id)
            .await?
            .ok_or(SettlementError::EmptyCart)?;

        if cart.lines.is_empty() {
            return Err(SettlementError::EmptyCart);
        }

        let mut resolved = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            if line.quantity == 0 {
                return Err(SettlementError::InvalidQuantity {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                });
            }

            let product = self
                .catalog
                .product(&line.product_id)
                .await?
                .ok_or_else(|| SettlementError::ProductNotFound(line.product_id.clone()))?;

            if !product.active {
                return Err(SettlementError::ProductInactive(line.product_id.clone()));
            }

            if product.kind.requires_shipping() && product.stock < line.quantity {
                return Err(SettlementError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    requested: line.quantity,
                    available: product.stock,
                });
            }

            resolved.push(ResolvedLine {
                product,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }

        Ok((cart, resolved))
    }

    async fn load_order(&self, number: &OrderNumber) -> Result<Order, SettlementError> {
        self.orders
            .get_order(number)
            .await?
            .ok_or_else(|| SettlementError::OrderNotFound(number.clone()))
    }
}

/// Builds the immutable order lines and per-vendor shipments from the
/// partitioned cart.
fn build_order_lines(
    groups: &[VendorGroup],
    rates: &Option<AggregatedRates>,
    delivery: DeliveryKind,
) -> (Vec<OrderItem>, Vec<VendorShipment>) {
    let tier = RateTier::for_delivery(delivery);
    let mut items = Vec::new();
    let mut shipments = Vec::new();

    for group in groups {
        let mut physical_ids = Vec::new();

        for line in &group.lines {
            let item = OrderItem {
                item_id: Uuid::new_v4(),
                product_id: line.product.id.clone(),
                name: line.product.name.clone(),
                image: line.product.image.clone(),
                unit_price: line.unit_price,
                quantity: line.quantity,
                vendor_id: group.vendor_id,
                kind: line.product.kind,
            };
            if line.is_physical() {
                physical_ids.push(item.item_id);
            }
            items.push(item);
        }

        if group.has_physical() {
            let shipping_cost = rates
                .as_ref()
                .and_then(|r| r.vendor_cost(group.vendor_id, tier))
                .unwrap_or(Money::zero());

            shipments.push(VendorShipment {
                vendor_id: group.vendor_id,
                origin: group.origin.clone(),
                item_ids: physical_ids,
                weight_grams: group.physical_weight_grams(),
                shipping_cost,
                courier: None,
                tracking_ref: None,
                status: ShipmentStatus::Pending,
            });
        }
    }

    (items, shipments)
}
