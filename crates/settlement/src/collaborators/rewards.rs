//! Rewards service contract and in-memory implementation.
//!
//! Awarding points is fire-and-forget: a failure here is logged and must
//! never fail the checkout.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use common::OrderNumber;

use crate::error::SettlementError;

/// The rewards/points collaborator.
#[async_trait]
pub trait RewardsService: Send + Sync {
    /// Awards purchase points for a completed order.
    async fn award_order_points(&self, order: &OrderNumber) -> Result<(), SettlementError>;
}

#[derive(Debug, Default)]
struct InMemoryRewardsState {
    awards: Vec<OrderNumber>,
    fail_on_award: bool,
}

/// In-memory rewards service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRewardsService {
    state: Arc<RwLock<InMemoryRewardsState>>,
}

impl InMemoryRewardsService {
    /// Creates a new in-memory rewards service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail award calls.
    pub fn set_fail_on_award(&self, fail: bool) {
        self.state.write().unwrap().fail_on_award = fail;
    }

    /// Returns how many times points were awarded for an order.
    pub fn awards_for(&self, order: &OrderNumber) -> usize {
        self.state
            .read()
            .unwrap()
            .awards
            .iter()
            .filter(|o| *o == order)
            .count()
    }
}

#[async_trait]
impl RewardsService for InMemoryRewardsService {
    async fn award_order_points(&self, order: &OrderNumber) -> Result<(), SettlementError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_award {
            return Err(SettlementError::Gateway("rewards service down".to_string()));
        }

        state.awards.push(order.clone());
        Ok(())
    }
}
