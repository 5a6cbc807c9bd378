//! Payment gateway contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use common::OrderNumber;

use crate::error::SettlementError;

/// Result of initializing a remote payment intent.
#[derive(Debug, Clone)]
pub struct GatewayInit {
    /// Where to send the customer to complete payment.
    pub redirect_url: String,

    /// Gateway access code for the payment session.
    pub access_code: String,
}

/// Terminal status of a gateway payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Success,
    Failed,
}

/// Result of verifying a payment by reference.
#[derive(Debug, Clone)]
pub struct GatewayVerification {
    pub status: GatewayStatus,
    /// Amount actually settled, in minor units.
    pub amount_minor: i64,
}

/// Contract the orchestrator requires from the payment gateway.
///
/// `reference` is the order number: globally unique, and reused on
/// verification so retries are idempotent on the gateway side.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a remote payment intent and returns the redirect payload.
    async fn initialize(
        &self,
        email: &str,
        amount_minor: i64,
        reference: &OrderNumber,
        callback_url: &str,
        metadata: serde_json::Value,
    ) -> Result<GatewayInit, SettlementError>;

    /// Verifies the payment for a reference.
    async fn verify(&self, reference: &OrderNumber) -> Result<GatewayVerification, SettlementError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    /// reference -> (amount, access code)
    intents: HashMap<String, (i64, String)>,
    next_id: u32,
    fail_on_initialize: bool,
    verify_succeeds: bool,
    verify_calls: u32,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl Default for InMemoryPaymentGateway {
    fn default() -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryGatewayState {
                verify_succeeds: true,
                ..Default::default()
            })),
        }
    }
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway whose verifications succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail the next initialize call.
    pub fn set_fail_on_initialize(&self, fail: bool) {
        self.state.write().unwrap().fail_on_initialize = fail;
    }

    /// Configures whether verification reports success.
    pub fn set_verify_succeeds(&self, succeeds: bool) {
        self.state.write().unwrap().verify_succeeds = succeeds;
    }

    /// Returns the number of initialized intents.
    pub fn intent_count(&self) -> usize {
        self.state.read().unwrap().intents.len()
    }

    /// Returns how many times verify was called.
    pub fn verify_calls(&self) -> u32 {
        self.state.read().unwrap().verify_calls
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn initialize(
        &self,
        _email: &str,
        amount_minor: i64,
        reference: &OrderNumber,
        _callback_url: &str,
        _metadata: serde_json::Value,
    ) -> Result<GatewayInit, SettlementError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_initialize {
            return Err(SettlementError::Gateway(
                "gateway unavailable".to_string(),
            ));
        }

        // Re-initializing a known reference returns the existing session.
        if let Some((_, access_code)) = state.intents.get(reference.as_str()) {
            return Ok(GatewayInit {
                redirect_url: format!("https://gateway.test/pay/{access_code}"),
                access_code: access_code.clone(),
            });
        }

        state.next_id += 1;
        let access_code = format!("AC-{:04}", state.next_id);
        state
            .intents
            .insert(reference.as_str().to_string(), (amount_minor, access_code.clone()));

        Ok(GatewayInit {
            redirect_url: format!("https://gateway.test/pay/{access_code}"),
            access_code,
        })
    }

    async fn verify(&self, reference: &OrderNumber) -> Result<GatewayVerification, SettlementError> {
        let mut state = self.state.write().unwrap();
        state.verify_calls += 1;

        let Some((amount, _)) = state.intents.get(reference.as_str()) else {
            return Ok(GatewayVerification {
                status: GatewayStatus::Failed,
                amount_minor: 0,
            });
        };

        let status = if state.verify_succeeds {
            GatewayStatus::Success
        } else {
            GatewayStatus::Failed
        };

        Ok(GatewayVerification {
            status,
            amount_minor: *amount,
        })
    }
}
