//! Vendor partitioner: splits resolved cart lines into per-vendor groups.

use std::collections::BTreeMap;

use common::{Address, Money, VendorId};

use crate::collaborators::catalog::Product;
use crate::collaborators::vendors::VendorDirectory;
use crate::error::SettlementError;

/// A cart line joined with its catalog product.
///
/// The unit price is the cart's snapshot, not the product's live price.
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub product: Product,
    pub quantity: u32,
    pub unit_price: Money,
}

impl ResolvedLine {
    /// Returns true if this line must be shipped.
    pub fn is_physical(&self) -> bool {
        self.product.kind.requires_shipping()
    }

    /// Total weight of this line.
    pub fn weight_grams(&self) -> u32 {
        self.product.weight_grams * self.quantity
    }

    /// Total price of this line.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// One vendor's slice of the cart.
#[derive(Debug, Clone)]
pub struct VendorGroup {
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub origin: Address,
    pub supports_pickup: bool,
    pub lines: Vec<ResolvedLine>,
}

impl VendorGroup {
    /// Returns true if any line must be shipped.
    pub fn has_physical(&self) -> bool {
        self.lines.iter().any(|l| l.is_physical())
    }

    /// Total weight of the physical lines.
    pub fn physical_weight_grams(&self) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.is_physical())
            .map(|l| l.weight_grams())
            .sum()
    }

    /// Declared value of the physical lines.
    pub fn physical_value(&self) -> Money {
        self.lines
            .iter()
            .filter(|l| l.is_physical())
            .map(|l| l.line_total())
            .sum()
    }
}

/// Splits resolved lines into per-vendor groups, ordered by vendor ID.
///
/// A missing vendor profile does not fail the quote: the group falls
/// back to an empty origin address (forcing fallback pricing later) and
/// the gap is logged.
pub async fn partition(
    directory: &dyn VendorDirectory,
    lines: Vec<ResolvedLine>,
) -> Result<Vec<VendorGroup>, SettlementError> {
    let mut groups: BTreeMap<VendorId, VendorGroup> = BTreeMap::new();

    for line in lines {
        let vendor_id = line.product.vendor_id;

        if let Some(group) = groups.get_mut(&vendor_id) {
            group.lines.push(line);
            continue;
        }

        let profile = directory.profile(vendor_id).await?;
        let group = match profile {
            Some(profile) => VendorGroup {
                vendor_id,
                vendor_name: profile.name,
                origin: profile.origin,
                supports_pickup: profile.supports_pickup,
                lines: vec![line],
            },
            None => {
                tracing::warn!(%vendor_id, "vendor profile missing, using empty origin");
                VendorGroup {
                    vendor_id,
                    vendor_name: String::new(),
                    origin: Address::default(),
                    supports_pickup: false,
                    lines: vec![line],
                }
            }
        };
        groups.insert(vendor_id, group);
    }

    Ok(groups.into_values().collect())
}
