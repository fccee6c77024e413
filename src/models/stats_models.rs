// src/models/stats_models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of the cache layer counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetricsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub avg_hit_time_ms: f64,
    pub avg_miss_time_ms: f64,
    pub total_bytes_cached: u64,
    pub evictions: u64,
    pub backend_errors: u64,
}

/// Telemetry counters for the optimized matcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizedMatcherStats {
    pub total_matches: u64,
    pub exact_matches: u64,
    pub early_terminations: u64,
    pub parallel_executions: u64,
    pub batch_extractions: u64,
    pub normalize_cache_size: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionarySizes {
    pub acronyms: usize,
    pub common_mistakes: usize,
    pub it_terms: usize,
    pub company_aliases: usize,
}

/// Aggregate report consumed by health/admin endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealthReport {
    pub cache_configured: bool,
    pub backend_reachable: bool,
    pub cached_entries: Option<usize>,
    pub metrics: CacheMetricsSnapshot,
    pub dictionaries: DictionarySizes,
    pub generated_at: DateTime<Utc>,
}
