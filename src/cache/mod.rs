// src/cache/mod.rs
pub mod backend;
pub mod cached_matcher;
pub mod codec;
pub mod keys;
pub mod metrics;
pub mod redis_backend;

pub use backend::{CacheBackend, InMemoryCacheBackend};
pub use cached_matcher::CachedMatcher;
pub use metrics::CacheMetrics;
pub use redis_backend::RedisCacheBackend;
