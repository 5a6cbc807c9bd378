//! Settlement strategies: polymorphic over the payment method fixed at
//! order-creation time.

use std::sync::Arc;

use async_trait::async_trait;

use domain::{DomainError, Order, PaymentMethod, WalletError, WalletService};
use event_store::EventStore;

use crate::collaborators::gateway::PaymentGateway;
use crate::error::SettlementError;

/// Everything a strategy needs to settle a freshly placed order.
pub struct SettlementContext<'a> {
    pub order: &'a Order,
    pub customer_email: &'a str,
    pub callback_url: &'a str,
}

/// What settling produced.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// Send the customer to the gateway; the order stays pending/pending
    /// until the out-of-band verification call.
    Redirect {
        redirect_url: String,
        access_code: String,
    },

    /// The money moved; the order is paid.
    Paid { gateway_ref: Option<String> },

    /// Cash on delivery: fulfill now, collect later.
    ConfirmedPendingCollection,
}

/// A way of resolving an order's payment.
#[async_trait]
pub trait SettlementStrategy: Send + Sync {
    async fn settle(&self, ctx: SettlementContext<'_>) -> Result<SettlementOutcome, SettlementError>;
}

/// Creates a remote payment intent keyed by the order number and hands
/// back the redirect payload.
pub struct GatewayRedirectStrategy {
    gateway: Arc<dyn PaymentGateway>,
}

impl GatewayRedirectStrategy {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl SettlementStrategy for GatewayRedirectStrategy {
    async fn settle(
        &self,
        ctx: SettlementContext<'_>,
    ) -> Result<SettlementOutcome, SettlementError> {
        let number = ctx
            .order
            .order_number()
            .ok_or_else(|| SettlementError::Gateway("order has no number".to_string()))?;

        let metadata = serde_json::json!({
            "order_number": number.as_str(),
            "customer_id": ctx.order.customer_id(),
        });

        let init = self
            .gateway
            .initialize(
                ctx.customer_email,
                ctx.order.totals().total.minor(),
                number,
                ctx.callback_url,
                metadata,
            )
            .await?;

        Ok(SettlementOutcome::Redirect {
            redirect_url: init.redirect_url,
            access_code: init.access_code,
        })
    }
}

/// Debits the order total from the customer's wallet.
///
/// The balance decrement and the ledger append are one wallet event, so
/// they are never observable independently.
pub struct WalletDebitStrategy<S: EventStore> {
    wallets: WalletService<S>,
}

impl<S: EventStore> WalletDebitStrategy<S> {
    pub fn new(wallets: WalletService<S>) -> Self {
        Self { wallets }
    }
}

#[async_trait]
impl<S: EventStore> SettlementStrategy for WalletDebitStrategy<S> {
    async fn settle(
        &self,
        ctx: SettlementContext<'_>,
    ) -> Result<SettlementOutcome, SettlementError> {
        let number = ctx
            .order
            .order_number()
            .ok_or_else(|| SettlementError::Gateway("order has no number".to_string()))?;
        let customer = ctx
            .order
            .customer_id()
            .ok_or_else(|| SettlementError::Gateway("order has no customer".to_string()))?;
        let total = ctx.order.totals().total;

        let result = self
            .wallets
            .debit(
                customer,
                total,
                "order payment",
                number.as_str(),
                Some(number.clone()),
            )
            .await;

        match result {
            Ok(_) => Ok(SettlementOutcome::Paid { gateway_ref: None }),
            Err(DomainError::Wallet(WalletError::InsufficientFunds {
                requested,
                available,
            })) => Err(SettlementError::InsufficientFunds {
                required: requested,
                available,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Accepts the order for fulfillment; cash is collected out of band.
pub struct CashOnDeliveryStrategy;

#[async_trait]
impl SettlementStrategy for CashOnDeliveryStrategy {
    async fn settle(
        &self,
        ctx: SettlementContext<'_>,
    ) -> Result<SettlementOutcome, SettlementError> {
        // Digital and service lines can never be paid for at a doorstep.
        if let Some(item) = ctx
            .order
            .items()
            .iter()
            .find(|i| !i.kind.requires_shipping())
        {
            return Err(SettlementError::MethodNotAllowed(format!(
                "cash on delivery is not available for {} item {}",
                item.kind, item.product_id
            )));
        }

        Ok(SettlementOutcome::ConfirmedPendingCollection)
    }
}

/// Selects the strategy for a payment method.
pub fn strategy_for<S>(
    method: PaymentMethod,
    gateway: Arc<dyn PaymentGateway>,
    wallets: WalletService<S>,
) -> Box<dyn SettlementStrategy>
where
    S: EventStore + Clone + 'static,
{
    match method {
        PaymentMethod::Gateway => Box::new(GatewayRedirectStrategy::new(gateway)),
        PaymentMethod::Wallet => Box::new(WalletDebitStrategy::new(wallets)),
        PaymentMethod::CashOnDelivery => Box::new(CashOnDeliveryStrategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use common::{Address, CustomerId, Money, OrderNumber, ProductId, ProductKind, VendorId};
    use domain::{
        Aggregate, DeliveryKind, OrderItem, Totals,
        order::OrderPlacedData,
    };
    use event_store::InMemoryEventStore;

    use crate::collaborators::gateway::InMemoryPaymentGateway;

    fn item(kind: ProductKind, unit_minor: i64) -> OrderItem {
        OrderItem {
            item_id: Uuid::new_v4(),
            product_id: ProductId::new("SKU-1"),
            name: "Item".to_string(),
            image: None,
            unit_price: Money::from_minor(unit_minor),
            quantity: 1,
            vendor_id: VendorId::new(),
            kind,
        }
    }

    fn placed_order(items: Vec<OrderItem>, method: PaymentMethod) -> Order {
        let subtotal: Money = items.iter().map(|i| i.total_price()).sum();
        let data = OrderPlacedData {
            order_number: OrderNumber::generate(),
            customer_id: CustomerId::new(),
            items,
            shipments: vec![],
            totals: Totals::compute(subtotal, Money::zero(), Money::zero(), Money::zero()),
            delivery: DeliveryKind::Standard,
            payment_method: method,
            coupon_code: None,
            shipping_address: Some(Address::new("1 Fleet St", "Lagos", "LA", "NG")),
            placed_at: Utc::now(),
        };
        let mut order = Order::default();
        order.apply_events(order.place(data).unwrap());
        order
    }

    #[tokio::test]
    async fn gateway_strategy_returns_redirect() {
        let gateway = InMemoryPaymentGateway::new();
        let strategy = GatewayRedirectStrategy::new(Arc::new(gateway.clone()));
        let order = placed_order(vec![item(ProductKind::Physical, 5_000)], PaymentMethod::Gateway);

        let outcome = strategy
            .settle(SettlementContext {
                order: &order,
                customer_email: "a@b.c",
                callback_url: "http://cb",
            })
            .await
            .unwrap();

        assert!(matches!(outcome, SettlementOutcome::Redirect { .. }));
        assert_eq!(gateway.intent_count(), 1);
    }

    #[tokio::test]
    async fn wallet_strategy_debits_exactly_the_total() {
        let store = InMemoryEventStore::new();
        let wallets = WalletService::new(store.clone());
        let order = placed_order(vec![item(ProductKind::Physical, 5_000)], PaymentMethod::Wallet);
        let customer = order.customer_id().unwrap();

        wallets
            .credit(customer, Money::from_minor(8_000), "top-up", "r", None)
            .await
            .unwrap();

        let strategy = WalletDebitStrategy::new(wallets.clone());
        let outcome = strategy
            .settle(SettlementContext {
                order: &order,
                customer_email: "a@b.c",
                callback_url: "http://cb",
            })
            .await
            .unwrap();

        assert!(matches!(outcome, SettlementOutcome::Paid { gateway_ref: None }));
        let wallet = wallets.get_wallet(customer).await.unwrap();
        assert_eq!(wallet.balance().minor(), 3_000);
        assert_eq!(wallet.transactions().len(), 2);
    }

    #[tokio::test]
    async fn wallet_strategy_rejects_insufficient_funds() {
        let wallets = WalletService::new(InMemoryEventStore::new());
        let order = placed_order(vec![item(ProductKind::Physical, 5_000)], PaymentMethod::Wallet);

        let strategy = WalletDebitStrategy::new(wallets);
        let result = strategy
            .settle(SettlementContext {
                order: &order,
                customer_email: "a@b.c",
                callback_url: "http://cb",
            })
            .await;

        assert!(matches!(
            result,
            Err(SettlementError::InsufficientFunds {
                required: 5_000,
                available: 0
            })
        ));
    }

    #[tokio::test]
    async fn cod_rejects_digital_lines() {
        let order = placed_order(
            vec![
                item(ProductKind::Physical, 5_000),
                item(ProductKind::Digital, 2_000),
            ],
            PaymentMethod::CashOnDelivery,
        );

        let result = CashOnDeliveryStrategy
            .settle(SettlementContext {
                order: &order,
                customer_email: "a@b.c",
                callback_url: "http://cb",
            })
            .await;

        assert!(matches!(result, Err(SettlementError::MethodNotAllowed(_))));
    }

    #[tokio::test]
    async fn cod_accepts_all_physical_carts() {
        let order = placed_order(
            vec![item(ProductKind::Physical, 5_000)],
            PaymentMethod::CashOnDelivery,
        );

        let outcome = CashOnDeliveryStrategy
            .settle(SettlementContext {
                order: &order,
                customer_email: "a@b.c",
                callback_url: "http://cb",
            })
            .await
            .unwrap();

        assert!(matches!(outcome, SettlementOutcome::ConfirmedPendingCollection));
    }
}
