// src/utils/constants.rs

/// Default similarity threshold for a candidate to be reported.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.7;

/// Maximum number of results returned by the matcher core.
pub const MAX_MATCH_RESULTS: usize = 5;

pub const DEFAULT_DICTIONARY_DIR: &str = "data";
pub const COMMON_MISTAKES_FILE: &str = "common_mistakes.json";
pub const IT_TERMS_FILE: &str = "it_terms.json";
pub const COMPANY_ALIASES_FILE: &str = "company_aliases.json";

pub const DEFAULT_NORMALIZE_CACHE_SIZE: usize = 10_000;
pub const DEFAULT_BATCH_THRESHOLD: usize = 20;
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 100;
pub const DEFAULT_PARALLEL_DEADLINE_MS: u64 = 5_000;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_CACHE_PREFIX: &str = "fuzzy";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_WARM_CACHE_TTL_SECS: u64 = 7200;
pub const DEFAULT_COMPRESSION_THRESHOLD_BYTES: usize = 1024;
pub const DEFAULT_CACHE_TIMEOUT_MS: u64 = 250;

/// Confidence reported for an organization pattern that could not be resolved.
pub const UNRESOLVED_ENTITY_CONFIDENCE: f64 = 0.5;
