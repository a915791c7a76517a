use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub backend: String,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    /// Live entries, when the backend can count them cheaply.
    pub total_entries: Option<u64>,
    pub invalidated_keys: u64,
}

/// Per-instance counters shared by every backend.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    invalidated: AtomicU64,
}

impl CacheCounters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidated(&self, keys: u64) {
        self.invalidated.fetch_add(keys, Ordering::Relaxed);
    }

    pub fn snapshot(&self, backend: &str, total_entries: Option<u64>) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            backend: backend.to_string(),
            hits,
            misses,
            hit_rate: if lookups == 0 { 0.0 } else { hits as f64 / lookups as f64 },
            total_entries,
            invalidated_keys: self.invalidated.load(Ordering::Relaxed),
        }
    }
}
