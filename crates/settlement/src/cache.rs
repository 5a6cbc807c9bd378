//! Bounded, TTL-evicting cache for carrier address codes.
//!
//! Injected wherever address validation happens, so tests can clear or
//! bypass it; never a module-global.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::collaborators::carrier::{AddressCode, CarrierClient};
use crate::error::SettlementError;

/// Caches `freeform address -> carrier address code` lookups.
#[derive(Debug)]
pub struct AddressCodeCache {
    capacity: usize,
    ttl: Duration,
    entries: Mutex<HashMap<String, (AddressCode, Instant)>>,
}

impl AddressCodeCache {
    /// Creates a cache holding at most `capacity` entries, each valid
    /// for `ttl`.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up a fresh entry, dropping it if expired.
    pub fn get(&self, freeform: &str) -> Option<AddressCode> {
        let mut entries = self.entries.lock().unwrap();

        match entries.get(freeform) {
            Some((code, inserted)) if inserted.elapsed() < self.ttl => Some(code.clone()),
            Some(_) => {
                entries.remove(freeform);
                None
            }
            None => None,
        }
    }

    /// Inserts an entry, evicting the oldest when full.
    pub fn insert(&self, freeform: &str, code: AddressCode) {
        let mut entries = self.entries.lock().unwrap();

        if entries.len() >= self.capacity && !entries.contains_key(freeform) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, (_, inserted))| *inserted)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                entries.remove(&key);
            }
        }

        entries.insert(freeform.to_string(), (code, Instant::now()));
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl Default for AddressCodeCache {
    fn default() -> Self {
        Self::new(256, Duration::from_secs(15 * 60))
    }
}

/// Validates an address through the cache.
pub async fn resolve_address(
    carrier: &dyn CarrierClient,
    cache: &AddressCodeCache,
    freeform: &str,
) -> Result<AddressCode, SettlementError> {
    if let Some(code) = cache.get(freeform) {
        return Ok(code);
    }

    let code = carrier.validate_address(freeform).await?;
    cache.insert(freeform, code.clone());
    Ok(code)
}
