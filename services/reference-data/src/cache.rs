//! TTL-bounded cache of computed option chains
//!
//! Cardinality is small (symbols x exchanges), so the only eviction is lazy
//! TTL expiry on lookup. An expired entry is never returned.

use crate::chain::OptionChainResult;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};

/// Case-sensitive (exchange, underlying symbol) cache key
///
/// No normalization: broker symbol conventions are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Exchange code
    pub exchange: String,
    /// Underlying symbol
    pub symbol: String,
}

struct CacheEntry {
    value: OptionChainResult,
    inserted_at: Instant,
}

/// Query-result cache with fixed time-to-live
pub struct ResultCache {
    ttl: Duration,
    entries: RwLock<FxHashMap<CacheKey, CacheEntry>>,
}

impl ResultCache {
    /// Create a cache whose entries expire `ttl` after insertion.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Look up a chain; an expired entry behaves as a miss and is evicted.
    pub fn get(&self, key: &CacheKey) -> Option<OptionChainResult> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // The entry may have been refreshed between the locks; only evict
        // it if it is still expired.
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or replace the chain for `key`, restarting its TTL.
    pub fn put(&self, key: CacheKey, value: OptionChainResult) {
        self.entries.write().insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Number of stored entries, including any not yet lazily evicted.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
