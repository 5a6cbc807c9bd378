//! Rate aggregator: merges per-vendor carrier quotes into one
//! customer-facing set of delivery options.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use common::{Address, Money, VendorId};
use domain::DeliveryKind;

use crate::cache::{AddressCodeCache, resolve_address};
use crate::collaborators::carrier::{AddressCode, CarrierClient, CourierQuote, Parcel};
use crate::partition::VendorGroup;

/// Fallback pricing used when the carrier is unavailable.
pub const FALLBACK_STANDARD_MINOR: i64 = 2_000;
pub const FALLBACK_STANDARD_DAYS: u32 = 5;
pub const FALLBACK_EXPRESS_MINOR: i64 = 3_500;
pub const FALLBACK_EXPRESS_DAYS: u32 = 2;

/// The customer-facing rate tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateTier {
    Pickup,
    Standard,
    Express,
    /// Zero-cost electronic delivery for digital-only carts.
    Digital,
}

impl RateTier {
    /// The tier a delivery kind is priced against.
    pub fn for_delivery(kind: DeliveryKind) -> Self {
        match kind {
            DeliveryKind::Standard => RateTier::Standard,
            DeliveryKind::Express | DeliveryKind::SameDay => RateTier::Express,
            DeliveryKind::Pickup => RateTier::Pickup,
            DeliveryKind::Digital => RateTier::Digital,
        }
    }

    /// Display label for the tier.
    pub fn label(&self) -> &'static str {
        match self {
            RateTier::Pickup => "Store Pickup",
            RateTier::Standard => "Standard Delivery",
            RateTier::Express => "Express Delivery",
            RateTier::Digital => "Digital Delivery",
        }
    }
}

/// Whether the quoted prices came from the carrier or local fallback.
///
/// Always surfaced to the caller so pricing confidence is observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Every vendor was priced with live carrier data.
    Carrier,

    /// Every vendor was priced with local fallback rates.
    Fallback,

    /// Some vendors fell back while others had carrier data.
    Mixed,
}

/// One customer-facing delivery option for the whole order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateOption {
    pub tier: RateTier,
    pub label: String,
    pub courier_name: String,
    pub price: Money,
    /// Slowest contributing vendor: a multi-vendor order is not complete
    /// until every parcel arrives.
    pub estimated_days: u32,
}

/// One vendor's kept (cheapest) quote for a tier.
#[derive(Debug, Clone)]
pub struct VendorRate {
    pub vendor_id: VendorId,
    pub tier: RateTier,
    pub courier_id: Option<String>,
    pub courier_name: String,
    pub price: Money,
    pub estimated_days: u32,
    pub from_fallback: bool,
}

/// The aggregated quote: customer-facing options plus the per-vendor
/// breakdown the checkout needs to price each shipment.
#[derive(Debug, Clone)]
pub struct AggregatedRates {
    pub options: Vec<RateOption>,
    pub source: RateSource,
    vendor_rates: Vec<VendorRate>,
}

impl AggregatedRates {
    /// Returns the option for a tier, if offered.
    pub fn option_for(&self, tier: RateTier) -> Option<&RateOption> {
        self.options.iter().find(|o| o.tier == tier)
    }

    /// Returns one vendor's cost at a tier, if quoted.
    pub fn vendor_cost(&self, vendor_id: VendorId, tier: RateTier) -> Option<Money> {
        self.vendor_rates
            .iter()
            .find(|r| r.vendor_id == vendor_id && r.tier == tier)
            .map(|r| r.price)
    }

    /// Returns the per-vendor breakdown.
    pub fn vendor_rates(&self) -> &[VendorRate] {
        &self.vendor_rates
    }
}

/// Merges per-vendor carrier quotes into one delivery-option set.
pub struct RateAggregator {
    carrier: Arc<dyn CarrierClient>,
    cache: Arc<AddressCodeCache>,
}

impl RateAggregator {
    /// Creates a new aggregator.
    pub fn new(carrier: Arc<dyn CarrierClient>, cache: Arc<AddressCodeCache>) -> Self {
        Self { carrier, cache }
    }

    /// Quotes delivery options for a partitioned cart.
    ///
    /// Never fails: any carrier error degrades that vendor to the fixed
    /// two-tier fallback, and the `source` flag reports it.
    #[tracing::instrument(skip(self, groups, destination), fields(vendors = groups.len()))]
    pub async fn quote(&self, groups: &[VendorGroup], destination: &Address) -> AggregatedRates {
        let physical: Vec<&VendorGroup> = groups.iter().filter(|g| g.has_physical()).collect();

        // A cart with no physical goods has exactly one delivery shape.
        if physical.is_empty() {
            return AggregatedRates {
                options: vec![RateOption {
                    tier: RateTier::Digital,
                    label: RateTier::Digital.label().to_string(),
                    courier_name: RateTier::Digital.label().to_string(),
                    price: Money::zero(),
                    estimated_days: 0,
                }],
                source: RateSource::Carrier,
                vendor_rates: vec![],
            };
        }

        let destination_code =
            match resolve_address(self.carrier.as_ref(), &self.cache, &destination.freeform())
                .await
            {
                Ok(code) => Some(code),
                Err(e) => {
                    tracing::warn!(error = %e, "destination validation failed, using fallback rates");
                    None
                }
            };

        // Vendor groups are disjoint, so their quotes fetch in parallel.
        let quotes = join_all(
            physical
                .iter()
                .map(|group| self.vendor_quotes(group, destination_code.as_ref())),
        )
        .await;

        let fallback_vendors = quotes.iter().filter(|(_, _, fb)| *fb).count();
        let source = if fallback_vendors == 0 {
            RateSource::Carrier
        } else if fallback_vendors == quotes.len() {
            metrics::counter!("rate_quotes_fallback_total").increment(1);
            RateSource::Fallback
        } else {
            metrics::counter!("rate_quotes_fallback_total").increment(1);
            RateSource::Mixed
        };

        let mut vendor_rates = Vec::new();
        for (group, (vendor_id, couriers, from_fallback)) in physical.iter().zip(&quotes) {
            for tier in [RateTier::Standard, RateTier::Express] {
                if let Some(cheapest) = couriers
                    .iter()
                    .filter(|q| q.tier == tier)
                    .min_by_key(|q| q.price)
                {
                    vendor_rates.push(VendorRate {
                        vendor_id: *vendor_id,
                        tier,
                        courier_id: Some(cheapest.courier_id.clone()),
                        courier_name: cheapest.courier_name.clone(),
                        price: cheapest.price,
                        estimated_days: cheapest.estimated_days,
                        from_fallback: *from_fallback,
                    });
                }
            }

            if physical.iter().all(|g| g.supports_pickup) {
                vendor_rates.push(VendorRate {
                    vendor_id: group.vendor_id,
                    tier: RateTier::Pickup,
                    courier_id: None,
                    courier_name: RateTier::Pickup.label().to_string(),
                    price: Money::zero(),
                    estimated_days: 0,
                    from_fallback: false,
                });
            }
        }

        let mut options = Vec::new();
        for tier in [RateTier::Pickup, RateTier::Standard, RateTier::Express] {
            let contributing: Vec<&VendorRate> =
                vendor_rates.iter().filter(|r| r.tier == tier).collect();

            // A tier is only offered when every physical vendor can ship
            // at it; otherwise the order can't travel as one choice.
            if contributing.len() != physical.len() {
                continue;
            }

            let price: Money = contributing.iter().map(|r| r.price).sum();
            let estimated_days = contributing
                .iter()
                .map(|r| r.estimated_days)
                .max()
                .unwrap_or(0);
            let courier_name = if tier == RateTier::Pickup {
                RateTier::Pickup.label().to_string()
            } else if contributing.len() > 1 {
                "Multiple Couriers".to_string()
            } else {
                contributing[0].courier_name.clone()
            };

            options.push(RateOption {
                tier,
                label: tier.label().to_string(),
                courier_name,
                price,
                estimated_days,
            });
        }

        AggregatedRates {
            options,
            source,
            vendor_rates,
        }
    }

    /// Quotes one vendor group, degrading to fallback on any error.
    async fn vendor_quotes(
        &self,
        group: &VendorGroup,
        destination: Option<&AddressCode>,
    ) -> (VendorId, Vec<CourierQuote>, bool) {
        let Some(destination) = destination else {
            return (group.vendor_id, fallback_quotes(), true);
        };

        if group.origin.is_empty() {
            tracing::warn!(vendor_id = %group.vendor_id, "vendor has no origin address, using fallback rates");
            return (group.vendor_id, fallback_quotes(), true);
        }

        let origin =
            match resolve_address(self.carrier.as_ref(), &self.cache, &group.origin.freeform())
                .await
            {
                Ok(code) => code,
                Err(e) => {
                    tracing::warn!(vendor_id = %group.vendor_id, error = %e, "origin validation failed, using fallback rates");
                    return (group.vendor_id, fallback_quotes(), true);
                }
            };

        let parcel = Parcel {
            weight_grams: group.physical_weight_grams(),
            declared_value: group.physical_value(),
        };

        match self.carrier.fetch_rates(&origin, destination, &parcel).await {
            Ok(sheet) if !sheet.couriers.is_empty() => (group.vendor_id, sheet.couriers, false),
            Ok(_) => {
                tracing::warn!(vendor_id = %group.vendor_id, "carrier returned no couriers, using fallback rates");
                (group.vendor_id, fallback_quotes(), true)
            }
            Err(e) => {
                tracing::warn!(vendor_id = %group.vendor_id, error = %e, "rate fetch failed, using fallback rates");
                (group.vendor_id, fallback_quotes(), true)
            }
        }
    }
}

/// The fixed two-tier fallback substituted when the carrier is
/// unavailable.
pub fn fallback_quotes() -> Vec<CourierQuote> {
    vec![
        CourierQuote::new(
            "fallback-standard",
            "Standard Courier",
            RateTier::Standard,
            FALLBACK_STANDARD_MINOR,
            FALLBACK_STANDARD_DAYS,
        ),
        CourierQuote::new(
            "fallback-express",
            "Express Courier",
            RateTier::Express,
            FALLBACK_EXPRESS_MINOR,
            FALLBACK_EXPRESS_DAYS,
        ),
    ]
}
