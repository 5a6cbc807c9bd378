//! Vendor directory contract and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use common::{Address, VendorId};

use crate::error::SettlementError;

/// A vendor's shipping profile.
#[derive(Debug, Clone)]
pub struct VendorProfile {
    pub vendor_id: VendorId,
    pub name: String,
    pub origin: Address,
    pub supports_pickup: bool,
}

/// Read-only vendor profile lookups.
#[async_trait]
pub trait VendorDirectory: Send + Sync {
    /// Reads a vendor's profile, or None if unknown.
    async fn profile(&self, vendor_id: VendorId) -> Result<Option<VendorProfile>, SettlementError>;
}

/// In-memory vendor directory for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVendorDirectory {
    profiles: Arc<RwLock<HashMap<VendorId, VendorProfile>>>,
}

impl InMemoryVendorDirectory {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a vendor profile.
    pub fn insert(&self, profile: VendorProfile) {
        self.profiles
            .write()
            .unwrap()
            .insert(profile.vendor_id, profile);
    }
}

#[async_trait]
impl VendorDirectory for InMemoryVendorDirectory {
    async fn profile(&self, vendor_id: VendorId) -> Result<Option<VendorProfile>, SettlementError> {
        Ok(self.profiles.read().unwrap().get(&vendor_id).cloned())
    }
}
