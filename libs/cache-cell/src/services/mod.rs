use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{CacheError, CacheStats};

pub mod memory;
pub mod redis_cache;

pub use memory::MemoryResponseCache;
pub use redis_cache::RedisResponseCache;

/// Key-value store for computed responses. Values are JSON so any backend
/// can hold them, and writes are last-writer-wins.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    /// Removes every key matching a Redis-style glob and returns how many
    /// were removed.
    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    async fn stats(&self) -> Result<CacheStats, CacheError>;
}

/// Glob matching with Redis `KEYS` semantics for `*` and `?`. Every other
/// byte matches literally.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern = pattern.as_bytes();
    let key = key.as_bytes();

    let (mut p, mut k) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some(b'*') => {
                star = Some((p, k));
                p += 1;
            }
            Some(&c) if c == b'?' || c == key[k] => {
                p += 1;
                k += 1;
            }
            _ => match star {
                // backtrack: let the last `*` swallow one more byte
                Some((sp, sk)) => {
                    p = sp + 1;
                    k = sk + 1;
                    star = Some((sp, sk + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

#[cfg(test)]
mod tests {
    use super::glob_match;

    #[test]
    fn matches_prefix_wildcard() {
        assert!(glob_match("appointments:*", "appointments:limit=10&offset=0"));
        assert!(glob_match("appointments:*", "appointments:"));
        assert!(!glob_match("appointments:*", "doctors:limit=10&offset=0"));
        assert!(!glob_match("appointments:*", "appointments"));
    }

    #[test]
    fn matches_inner_wildcards() {
        assert!(glob_match("a*c", "abbbc"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
    }

    #[test]
    fn exact_pattern_matches_only_itself() {
        assert!(glob_match("key", "key"));
        assert!(!glob_match("key", "key2"));
        assert!(glob_match("*", ""));
    }
}
