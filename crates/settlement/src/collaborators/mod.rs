//! Abstract contracts for the external systems the orchestrator calls,
//! each with an in-memory double for tests and local runs.

pub mod carrier;
pub mod cart;
pub mod catalog;
pub mod coupons;
pub mod gateway;
pub mod rewards;
pub mod vendors;

pub use carrier::{
    AddressCode, CarrierBooking, CarrierClient, CourierQuote, InMemoryCarrierClient, Parcel,
    RateSheet,
};
pub use cart::{Cart, CartLine, CartStore, InMemoryCartStore};
pub use catalog::{Catalog, InMemoryCatalog, Product};
pub use coupons::{CouponService, InMemoryCouponService};
pub use gateway::{
    GatewayInit, GatewayStatus, GatewayVerification, InMemoryPaymentGateway, PaymentGateway,
};
pub use rewards::{InMemoryRewardsService, RewardsService};
pub use vendors::{InMemoryVendorDirectory, VendorDirectory, VendorProfile};
