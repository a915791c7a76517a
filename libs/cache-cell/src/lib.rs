// =====================================================================================
// CACHE CELL - RESPONSE CACHING & INVALIDATION
// =====================================================================================

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::CacheError;
pub use models::*;
pub use router::create_cache_router;
pub use services::{glob_match, MemoryResponseCache, RedisResponseCache, ResponseCache};
