//! Benchmarks for the rate aggregation path.

use std::sync::Arc;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};

use common::{Address, Money, ProductId, ProductKind, VendorId};
use settlement::collaborators::{CourierQuote, InMemoryCarrierClient, Product};
use settlement::{AddressCodeCache, RateAggregator, RateTier, ResolvedLine, VendorGroup};

fn vendor_group(index: usize) -> VendorGroup {
    let vendor_id = VendorId::new();
    VendorGroup {
        vendor_id,
        vendor_name: format!("Vendor {index}"),
        origin: Address::new(format!("{index} Depot Rd"), "Ibadan", "OY", "NG"),
        supports_pickup: true,
        lines: vec![ResolvedLine {
            product: Product {
                id: ProductId::new(format!("SKU-{index}")),
                name: format!("Product {index}"),
                image: None,
                vendor_id,
                kind: ProductKind::Physical,
                unit_price: Money::from_minor(5_000),
                weight_grams: 750,
                stock: 100,
                active: true,
            },
            quantity: 2,
            unit_price: Money::from_minor(5_000),
        }],
    }
}

fn bench_quote(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let carrier = InMemoryCarrierClient::new();
    let groups: Vec<VendorGroup> = (0..8).map(vendor_group).collect();
    for group in &groups {
        carrier.set_quotes(
            &group.origin.freeform(),
            vec![
                CourierQuote::new("std-a", "Courier A", RateTier::Standard, 1_500, 4),
                CourierQuote::new("std-b", "Courier B", RateTier::Standard, 1_200, 6),
                CourierQuote::new("exp-a", "Courier A", RateTier::Express, 3_000, 1),
            ],
        );
    }

    let aggregator = RateAggregator::new(
        Arc::new(carrier),
        Arc::new(AddressCodeCache::new(64, Duration::from_secs(300))),
    );
    let destination = Address::new("1 Fleet St", "Lagos", "LA", "NG");

    c.bench_function("aggregate_rates_8_vendors", |b| {
        b.to_async(&rt)
            .iter(|| aggregator.quote(&groups, &destination));
    });
}

criterion_group!(benches, bench_quote);
criterion_main!(benches);
