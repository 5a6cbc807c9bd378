//! Coupon usage tracking contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::SettlementError;

/// Post-settlement coupon bookkeeping.
#[async_trait]
pub trait CouponService: Send + Sync {
    /// Increments the usage counter for a coupon code.
    async fn increment_usage(&self, code: &str) -> Result<(), SettlementError>;
}

/// In-memory coupon service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCouponService {
    usage: Arc<RwLock<HashMap<String, u32>>>,
}

impl InMemoryCouponService {
    /// Creates a new in-memory coupon service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded usage count for a code.
    pub fn usage_of(&self, code: &str) -> u32 {
        self.usage.read().unwrap().get(code).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CouponService for InMemoryCouponService {
    async fn increment_usage(&self, code: &str) -> Result<(), SettlementError> {
        *self
            .usage
            .write()
            .unwrap()
            .entry(code.to_string())
            .or_insert(0) += 1;
        Ok(())
    }
}
