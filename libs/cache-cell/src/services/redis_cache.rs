use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::{AsyncCommands, AsyncIter};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::services::ResponseCache;
use crate::{CacheCounters, CacheError, CacheStats};

/// Unreadable payloads count as a miss; the next `set` overwrites them.
fn decode_payload(key: &str, payload: &str) -> Option<Value> {
    match serde_json::from_str(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring unreadable cache entry {}: {}", key, e);
            None
        }
    }
}

/// Shared cache for multi-instance deployments.
pub struct RedisResponseCache {
    pool: Pool,
    counters: CacheCounters,
}

impl RedisResponseCache {
    pub async fn new(redis_url: &str) -> Result<Self, CacheError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Pool(format!("Pool creation error: {}", e)))?;

        // fail fast on a bad URL rather than on the first request
        let mut conn = pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis response cache initialized successfully");

        Ok(Self {
            pool,
            counters: CacheCounters::default(),
        })
    }

    async fn get_connection(&self) -> Result<Connection, CacheError> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl ResponseCache for RedisResponseCache {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.get_connection().await?;
        let raw: Option<String> = conn.get(key).await?;

        match raw.and_then(|payload| decode_payload(key, &payload)) {
            Some(value) => {
                self.counters.record_hit();
                Ok(Some(value))
            }
            None => {
                self.counters.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.get_connection().await?;
        let payload = serde_json::to_string(&value)?;

        // EX 0 is rejected by Redis
        let seconds = ttl.as_secs().max(1);
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(seconds)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.get_connection().await?;

        let keys: Vec<String> = {
            let mut iter: AsyncIter<String> = conn.scan_match(pattern).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        if keys.is_empty() {
            return Ok(0);
        }

        let removed: u64 = conn.del(&keys).await?;
        self.counters.record_invalidated(removed);
        debug!("Invalidated {} redis keys matching {}", removed, pattern);
        Ok(removed)
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(self.counters.snapshot(self.backend(), None))
    }
}
