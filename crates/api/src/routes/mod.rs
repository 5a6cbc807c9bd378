//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod wallets;

use event_store::EventStore;
use settlement::CheckoutService;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore + Clone> {
    pub checkout: CheckoutService<S>,
}
