// src/utils/config.rs
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::constants::*;
use crate::utils::env::env_or;

/// Settings for the matcher core and its dictionaries.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    pub threshold: f64,
    /// Directory holding the optional dictionary override files.
    pub dictionary_dir: PathBuf,
    pub normalize_cache_size: usize,
    pub use_fast_similarity: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            dictionary_dir: PathBuf::from(DEFAULT_DICTIONARY_DIR),
            normalize_cache_size: DEFAULT_NORMALIZE_CACHE_SIZE,
            use_fast_similarity: true,
        }
    }
}

impl MatcherConfig {
    pub fn from_env() -> Self {
        let threshold: f64 = env_or("FUZZY_MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD);
        Self {
            threshold: if (0.0..=1.0).contains(&threshold) {
                threshold
            } else {
                DEFAULT_MATCH_THRESHOLD
            },
            dictionary_dir: PathBuf::from(env_or(
                "FUZZY_DICTIONARY_DIR",
                DEFAULT_DICTIONARY_DIR.to_string(),
            )),
            normalize_cache_size: env_or("FUZZY_NORMALIZE_CACHE_SIZE", DEFAULT_NORMALIZE_CACHE_SIZE),
            use_fast_similarity: env_or("FUZZY_USE_FAST_SIMILARITY", true),
        }
    }
}

/// Settings for the optimized/batch matcher.
#[derive(Debug, Clone)]
pub struct OptimizedConfig {
    pub normalize_cache_size: usize,
    /// Candidate count above which the batch comparator is used.
    pub batch_threshold: usize,
    /// Candidate count above which scoring fans out to the worker pool.
    pub parallel_threshold: usize,
    pub enable_parallel: bool,
    pub max_workers: usize,
    /// Candidates not yet scored when this elapses are treated as non-matching.
    pub parallel_deadline: Duration,
    pub use_fast_similarity: bool,
}

impl Default for OptimizedConfig {
    fn default() -> Self {
        Self {
            normalize_cache_size: DEFAULT_NORMALIZE_CACHE_SIZE,
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            enable_parallel: true,
            max_workers: num_cpus::get(),
            parallel_deadline: Duration::from_millis(DEFAULT_PARALLEL_DEADLINE_MS),
            use_fast_similarity: true,
        }
    }
}

impl OptimizedConfig {
    pub fn from_env() -> Self {
        Self {
            normalize_cache_size: env_or("FUZZY_NORMALIZE_CACHE_SIZE", DEFAULT_NORMALIZE_CACHE_SIZE),
            batch_threshold: env_or("FUZZY_BATCH_THRESHOLD", DEFAULT_BATCH_THRESHOLD),
            parallel_threshold: env_or("FUZZY_PARALLEL_THRESHOLD", DEFAULT_PARALLEL_THRESHOLD),
            enable_parallel: env_or("FUZZY_ENABLE_PARALLEL", true),
            max_workers: env_or("FUZZY_MAX_WORKERS", num_cpus::get()).max(1),
            parallel_deadline: Duration::from_millis(env_or(
                "FUZZY_PARALLEL_DEADLINE_MS",
                DEFAULT_PARALLEL_DEADLINE_MS,
            )),
            use_fast_similarity: env_or("FUZZY_USE_FAST_SIMILARITY", true),
        }
    }
}

/// Settings for the external match cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub redis_url: String,
    pub key_prefix: String,
    pub default_ttl_secs: u64,
    pub warm_ttl_secs: u64,
    pub compression_threshold_bytes: usize,
    /// Upper bound on every backend round trip.
    pub operation_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            key_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            default_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            warm_ttl_secs: DEFAULT_WARM_CACHE_TTL_SECS,
            compression_threshold_bytes: DEFAULT_COMPRESSION_THRESHOLD_BYTES,
            operation_timeout: Duration::from_millis(DEFAULT_CACHE_TIMEOUT_MS),
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_or("FUZZY_CACHE_ENABLED", false),
            redis_url: env_or("REDIS_URL", DEFAULT_REDIS_URL.to_string()),
            key_prefix: env_or("FUZZY_CACHE_PREFIX", DEFAULT_CACHE_PREFIX.to_string()),
            default_ttl_secs: env_or("FUZZY_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS).max(1),
            warm_ttl_secs: env_or("FUZZY_CACHE_WARM_TTL_SECS", DEFAULT_WARM_CACHE_TTL_SECS).max(1),
            compression_threshold_bytes: env_or(
                "FUZZY_CACHE_COMPRESSION_THRESHOLD",
                DEFAULT_COMPRESSION_THRESHOLD_BYTES,
            ),
            operation_timeout: Duration::from_millis(
                env_or("FUZZY_CACHE_TIMEOUT_MS", DEFAULT_CACHE_TIMEOUT_MS).max(1),
            ),
        }
    }
}

/// All resolver settings, loaded together at startup.
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    pub matcher: MatcherConfig,
    pub optimized: OptimizedConfig,
    pub cache: CacheConfig,
}

impl ResolverConfig {
    pub fn from_env() -> Self {
        Self {
            matcher: MatcherConfig::from_env(),
            optimized: OptimizedConfig::from_env(),
            cache: CacheConfig::from_env(),
        }
    }

    pub fn log_config(&self) {
        info!("🔧 Resolver configuration");
        info!(
            "   Threshold: {:.2}, dictionaries: {}",
            self.matcher.threshold,
            self.matcher.dictionary_dir.display()
        );
        info!(
            "   Optimized matcher: batch>{} parallel>{} (enabled={}, workers={}), fast similarity={}",
            self.optimized.batch_threshold,
            self.optimized.parallel_threshold,
            self.optimized.enable_parallel,
            self.optimized.max_workers,
            self.optimized.use_fast_similarity
        );
        if self.cache.enabled {
            info!(
                "   Match cache ENABLED at {} (prefix '{}', ttl {}s, warm ttl {}s)",
                self.cache.redis_url,
                self.cache.key_prefix,
                self.cache.default_ttl_secs,
                self.cache.warm_ttl_secs
            );
        } else {
            info!("   Match cache DISABLED - matching runs uncached");
        }
    }
}
