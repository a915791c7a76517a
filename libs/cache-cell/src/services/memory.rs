use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::services::{glob_match, ResponseCache};
use crate::{CacheCounters, CacheError, CacheStats};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Process-local cache. Used when no Redis is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    counters: CacheCounters,
}

impl MemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ResponseCache for MemoryResponseCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    self.counters.record_hit();
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => {
                    self.counters.record_miss();
                    return Ok(None);
                }
            }
        }

        // expired: drop it unless someone refreshed it in the meantime
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            debug!("Evicted expired cache entry {}", key);
        }
        self.counters.record_miss();
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !glob_match(pattern, key));
        let removed = (before - entries.len()) as u64;

        self.counters.record_invalidated(removed);
        debug!("Invalidated {} cache entries matching {}", removed, pattern);
        Ok(removed)
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let live = self.len().await as u64;
        Ok(self.counters.snapshot(self.backend(), Some(live)))
    }
}
