//! Carrier-rate service contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use common::Money;

use crate::error::SettlementError;
use crate::rates::RateTier;

/// Opaque carrier code for a validated address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressCode(String);

impl AddressCode {
    /// Creates an address code from a raw string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AddressCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What one vendor group ships: total weight and declared value.
#[derive(Debug, Clone, Copy)]
pub struct Parcel {
    pub weight_grams: u32,
    pub declared_value: Money,
}

/// One courier's offer for a parcel.
#[derive(Debug, Clone)]
pub struct CourierQuote {
    pub courier_id: String,
    pub courier_name: String,
    pub tier: RateTier,
    pub price: Money,
    pub estimated_days: u32,
}

impl CourierQuote {
    pub fn new(
        courier_id: impl Into<String>,
        courier_name: impl Into<String>,
        tier: RateTier,
        price_minor: i64,
        estimated_days: u32,
    ) -> Self {
        Self {
            courier_id: courier_id.into(),
            courier_name: courier_name.into(),
            tier,
            price: Money::from_minor(price_minor),
            estimated_days,
        }
    }
}

/// A rate response: a booking token plus the couriers willing to carry.
#[derive(Debug, Clone)]
pub struct RateSheet {
    pub request_token: String,
    pub couriers: Vec<CourierQuote>,
}

/// A confirmed courier booking.
#[derive(Debug, Clone)]
pub struct CarrierBooking {
    pub tracking_ref: String,
}

/// Contract the orchestrator requires from the carrier-rate service.
#[async_trait]
pub trait CarrierClient: Send + Sync {
    /// Validates a freeform address, returning the carrier's code for it.
    async fn validate_address(&self, freeform: &str) -> Result<AddressCode, SettlementError>;

    /// Fetches courier quotes for a parcel between two validated addresses.
    async fn fetch_rates(
        &self,
        sender: &AddressCode,
        receiver: &AddressCode,
        parcel: &Parcel,
    ) -> Result<RateSheet, SettlementError>;

    /// Books a courier against a rate request token.
    async fn book(
        &self,
        request_token: &str,
        courier_id: &str,
    ) -> Result<CarrierBooking, SettlementError>;

    /// Returns the carrier's status string for a tracking reference.
    async fn track(&self, tracking_ref: &str) -> Result<String, SettlementError>;

    /// Cancels a booking. Best-effort on the caller's side.
    async fn cancel(&self, tracking_ref: &str) -> Result<(), SettlementError>;
}

#[derive(Debug, Default)]
struct InMemoryCarrierState {
    /// sender address code -> quotes offered from there
    quotes: HashMap<String, Vec<CourierQuote>>,
    /// tracking ref -> courier id
    bookings: HashMap<String, String>,
    cancelled: Vec<String>,
    next_token: u32,
    next_tracking: u32,
    validate_calls: u32,
    fail_on_validate: bool,
    fail_on_rates: bool,
    fail_on_book: bool,
    fail_on_cancel: bool,
}

/// In-memory carrier client for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCarrierClient {
    state: Arc<RwLock<InMemoryCarrierState>>,
}

impl InMemoryCarrierClient {
    /// Creates a new in-memory carrier client with no registered quotes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the address code this client assigns to a freeform address.
    pub fn code_for(freeform: &str) -> AddressCode {
        AddressCode::new(format!("AC:{freeform}"))
    }

    /// Registers the quotes offered from a sender address.
    pub fn set_quotes(&self, sender_freeform: &str, quotes: Vec<CourierQuote>) {
        self.state
            .write()
            .unwrap()
            .quotes
            .insert(Self::code_for(sender_freeform).as_str().to_string(), quotes);
    }

    pub fn set_fail_on_validate(&self, fail: bool) {
        self.state.write().unwrap().fail_on_validate = fail;
    }

    pub fn set_fail_on_rates(&self, fail: bool) {
        self.state.write().unwrap().fail_on_rates = fail;
    }

    pub fn set_fail_on_book(&self, fail: bool) {
        self.state.write().unwrap().fail_on_book = fail;
    }

    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    /// Returns the number of active bookings.
    pub fn booking_count(&self) -> usize {
        self.state.read().unwrap().bookings.len()
    }

    /// Returns how many times validate_address was called.
    pub fn validate_calls(&self) -> u32 {
        self.state.read().unwrap().validate_calls
    }

    /// Returns the tracking refs that were cancelled.
    pub fn cancelled_refs(&self) -> Vec<String> {
        self.state.read().unwrap().cancelled.clone()
    }
}

#[async_trait]
impl CarrierClient for InMemoryCarrierClient {
    async fn validate_address(&self, freeform: &str) -> Result<AddressCode, SettlementError> {
        let mut state = self.state.write().unwrap();
        state.validate_calls += 1;

        if state.fail_on_validate {
            return Err(SettlementError::Carrier("address service down".to_string()));
        }

        if freeform.trim().is_empty() {
            return Err(SettlementError::Carrier("empty address".to_string()));
        }

        Ok(Self::code_for(freeform))
    }

    async fn fetch_rates(
        &self,
        sender: &AddressCode,
        _receiver: &AddressCode,
        _parcel: &Parcel,
    ) -> Result<RateSheet, SettlementError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_rates {
            return Err(SettlementError::Carrier("rate service down".to_string()));
        }

        let couriers = state
            .quotes
            .get(sender.as_str())
            .cloned()
            .unwrap_or_default();
        if couriers.is_empty() {
            return Err(SettlementError::Carrier("no couriers returned".to_string()));
        }

        state.next_token += 1;
        Ok(RateSheet {
            request_token: format!("REQ-{:04}", state.next_token),
            couriers,
        })
    }

    async fn book(
        &self,
        _request_token: &str,
        courier_id: &str,
    ) -> Result<CarrierBooking, SettlementError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_book {
            return Err(SettlementError::Carrier("booking failed".to_string()));
        }

        state.next_tracking += 1;
        let tracking_ref = format!("TRACK-{:04}", state.next_tracking);
        state
            .bookings
            .insert(tracking_ref.clone(), courier_id.to_string());

        Ok(CarrierBooking { tracking_ref })
    }

    async fn track(&self, tracking_ref: &str) -> Result<String, SettlementError> {
        let state = self.state.read().unwrap();
        if state.bookings.contains_key(tracking_ref) {
            Ok("created".to_string())
        } else if state.cancelled.iter().any(|r| r == tracking_ref) {
            Ok("cancelled".to_string())
        } else {
            Err(SettlementError::Carrier(format!(
                "unknown tracking ref {tracking_ref}"
            )))
        }
    }

    async fn cancel(&self, tracking_ref: &str) -> Result<(), SettlementError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_cancel {
            return Err(SettlementError::Carrier("cancel failed".to_string()));
        }

        state.bookings.remove(tracking_ref);
        state.cancelled.push(tracking_ref.to_string());
        Ok(())
    }
}
