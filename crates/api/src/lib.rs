//! HTTP delivery layer for the marketplace settlement system.
//!
//! Exposes the checkout orchestrator (checkout / verify / cancel), order
//! and wallet queries, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use settlement::collaborators::{
    InMemoryCarrierClient, InMemoryCartStore, InMemoryCatalog, InMemoryCouponService,
    InMemoryPaymentGateway, InMemoryRewardsService, InMemoryVendorDirectory,
};
use settlement::{AddressCodeCache, CheckoutConfig, CheckoutService, CollaboratorSet};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/checkout", post(routes::orders::checkout::<S>))
        .route(
            "/delivery-options",
            post(routes::orders::delivery_options::<S>),
        )
        .route("/orders/{number}", get(routes::orders::get::<S>))
        .route("/orders/{number}/verify", post(routes::orders::verify::<S>))
        .route("/orders/{number}/cancel", post(routes::orders::cancel::<S>))
        .route(
            "/orders/{number}/fulfillment",
            post(routes::orders::advance_fulfillment::<S>),
        )
        .route("/wallets/{customer}", get(routes::wallets::get::<S>))
        .route(
            "/wallets/{customer}/credit",
            post(routes::wallets::credit::<S>),
        )
        .route(
            "/wallets/{customer}/withdrawals",
            post(routes::wallets::reserve_withdrawal::<S>),
        )
        .route(
            "/wallets/{customer}/withdrawals/{transaction}/resolve",
            post(routes::wallets::resolve_withdrawal::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state wired to in-memory
/// collaborator doubles. Real deployments swap these for live clients.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let collaborators = CollaboratorSet {
        gateway: Arc::new(InMemoryPaymentGateway::new()),
        carrier: Arc::new(InMemoryCarrierClient::new()),
        carts: Arc::new(InMemoryCartStore::new()),
        catalog: Arc::new(InMemoryCatalog::new()),
        vendors: Arc::new(InMemoryVendorDirectory::new()),
        coupons: Arc::new(InMemoryCouponService::new()),
        rewards: Arc::new(InMemoryRewardsService::new()),
    };

    let checkout = CheckoutService::new(
        event_store,
        collaborators,
        Arc::new(AddressCodeCache::new(256, Duration::from_secs(15 * 60))),
        CheckoutConfig {
            tax_rate_bps: config.tax_rate_bps,
            callback_url: config.payment_callback_url.clone(),
        },
    );

    Arc::new(AppState { checkout })
}
