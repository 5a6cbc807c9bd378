//! Cart service contract and in-memory implementation.
//!
//! The cart itself is owned by an external service; the orchestrator
//! reads it once, prices it, and clears it only after the order is
//! durably created.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use common::{CustomerId, Money, ProductId};

use crate::error::SettlementError;

/// One line of a customer's cart.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price snapshot taken when the line was added.
    pub unit_price: Money,
}

/// A customer's cart as read from the cart service.
#[derive(Debug, Clone)]
pub struct Cart {
    pub customer_id: CustomerId,
    pub lines: Vec<CartLine>,
    pub coupon_code: Option<String>,
    pub discount: Money,
}

impl Cart {
    /// Sum of line totals before discount, shipping and tax.
    pub fn subtotal(&self) -> Money {
        self.lines
            .iter()
            .map(|l| l.unit_price.multiply(l.quantity))
            .sum()
    }
}

/// Contract the orchestrator requires from the cart service.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Reads a customer's current cart, or None if they have none.
    async fn cart_for(&self, customer_id: CustomerId) -> Result<Option<Cart>, SettlementError>;

    /// Clears a customer's cart after order creation.
    async fn clear(&self, customer_id: CustomerId) -> Result<(), SettlementError>;
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<CustomerId, Cart>,
    clear_calls: u32,
}

/// In-memory cart store for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartStore {
    /// Creates a new empty cart store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a customer's cart.
    pub fn set_cart(&self, cart: Cart) {
        self.state
            .write()
            .unwrap()
            .carts
            .insert(cart.customer_id, cart);
    }

    /// Returns true if the customer currently has a cart.
    pub fn has_cart(&self, customer_id: CustomerId) -> bool {
        self.state.read().unwrap().carts.contains_key(&customer_id)
    }

    /// Returns how many times clear was called.
    pub fn clear_calls(&self) -> u32 {
        self.state.read().unwrap().clear_calls
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn cart_for(&self, customer_id: CustomerId) -> Result<Option<Cart>, SettlementError> {
        Ok(self.state.read().unwrap().carts.get(&customer_id).cloned())
    }

    async fn clear(&self, customer_id: CustomerId) -> Result<(), SettlementError> {
        let mut state = self.state.write().unwrap();
        state.clear_calls += 1;
        state.carts.remove(&customer_id);
        Ok(())
    }
}
