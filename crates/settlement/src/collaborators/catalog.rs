//! Catalog contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use common::{Money, ProductId, ProductKind, VendorId};

use crate::error::SettlementError;

/// A catalog product as the orchestrator sees it.
///
/// The product kind is resolved from the catalog's raw type string
/// exactly once, when the product record is built.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub vendor_id: VendorId,
    pub kind: ProductKind,
    pub unit_price: Money,
    pub weight_grams: u32,
    pub stock: u32,
    pub active: bool,
}

/// Contract the orchestrator requires from the catalog service.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Reads a product by ID.
    async fn product(&self, id: &ProductId) -> Result<Option<Product>, SettlementError>;

    /// Decrements stock for a product.
    async fn decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<(), SettlementError>;

    /// Increments stock for a product (restock on cancellation).
    async fn increment_stock(&self, id: &ProductId, quantity: u32) -> Result<(), SettlementError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, Product>,
    decrement_calls: HashMap<ProductId, u32>,
}

/// In-memory catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a product.
    pub fn insert(&self, product: Product) {
        self.state
            .write()
            .unwrap()
            .products
            .insert(product.id.clone(), product);
    }

    /// Inserts a product whose kind comes from a raw type string, the
    /// way catalog records arrive from the outside world. Unknown or
    /// missing strings are logged and resolved to physical.
    pub fn insert_with_raw_kind(&self, mut product: Product, raw_kind: Option<&str>) {
        if raw_kind.is_none_or(|raw| ProductKind::parse(raw).is_none()) {
            tracing::warn!(
                product_id = %product.id,
                raw_kind = raw_kind.unwrap_or("<missing>"),
                "unresolvable product type, defaulting to physical"
            );
        }
        product.kind = ProductKind::resolve(raw_kind);
        self.insert(product);
    }

    /// Returns a product's current stock.
    pub fn stock_of(&self, id: &ProductId) -> Option<u32> {
        self.state.read().unwrap().products.get(id).map(|p| p.stock)
    }

    /// Returns how many times stock was decremented for a product.
    pub fn decrement_calls(&self, id: &ProductId) -> u32 {
        self.state
            .read()
            .unwrap()
            .decrement_calls
            .get(id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn product(&self, id: &ProductId) -> Result<Option<Product>, SettlementError> {
        Ok(self.state.read().unwrap().products.get(id).cloned())
    }

    async fn decrement_stock(&self, id: &ProductId, quantity: u32) -> Result<(), SettlementError> {
        let mut state = self.state.write().unwrap();

        let product = state
            .products
            .get_mut(id)
            .ok_or_else(|| SettlementError::ProductNotFound(id.clone()))?;

        if product.stock < quantity {
            return Err(SettlementError::InsufficientStock {
                product_id: id.clone(),
                requested: quantity,
                available: product.stock,
            });
        }

        product.stock -= quantity;
        *state.decrement_calls.entry(id.clone()).or_insert(0) += 1;
        Ok(())
    }

    async fn increment_stock(&self, id: &ProductId, quantity: u32) -> Result<(), SettlementError> {
        let mut state = self.state.write().unwrap();

        let product = state
            .products
            .get_mut(id)
            .ok_or_else(|| SettlementError::ProductNotFound(id.clone()))?;

        product.stock += quantity;
        Ok(())
    }
}
