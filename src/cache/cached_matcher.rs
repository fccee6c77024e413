// src/cache/cached_matcher.rs
//! Content-addressed caching in front of [`FuzzyMatcher`].
//!
//! The backend is strictly an optimization. Every round trip is bounded by the
//! configured timeout, and any failure is logged and handled as a miss (reads)
//! or dropped (writes), so callers always get the same answer as an uncached match.

use anyhow::Result;
use chrono::Utc;
use futures::future::BoxFuture;
use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::backend::CacheBackend;
use crate::cache::codec::{decode_payload, encode_payload, CachedPayload};
use crate::cache::keys::{candidates_hash, match_key, namespace_pattern};
use crate::cache::metrics::CacheMetrics;
use crate::cache::redis_backend::RedisCacheBackend;
use crate::matching::matcher::FuzzyMatcher;
use crate::models::stats_models::{CacheHealthReport, CacheMetricsSnapshot};
use crate::models::{Candidate, EnhancedMatchResult, MatchResult, MatchType};
use crate::utils::config::CacheConfig;
use crate::utils::logging::{ResolverComponent, ResolverLogger};

/// A hit-rate summary is logged every this many cache requests.
const SUMMARY_INTERVAL: u64 = 100;

pub struct CachedMatcher {
    matcher: Arc<FuzzyMatcher>,
    backend: Option<Arc<dyn CacheBackend>>,
    config: CacheConfig,
    metrics: Arc<CacheMetrics>,
    match_invocations: AtomicU64,
    logger: ResolverLogger,
}

impl CachedMatcher {
    pub fn new(matcher: Arc<FuzzyMatcher>, backend: Option<Arc<dyn CacheBackend>>, config: CacheConfig) -> Self {
        Self {
            matcher,
            backend,
            config,
            metrics: Arc::new(CacheMetrics::new()),
            match_invocations: AtomicU64::new(0),
            logger: ResolverLogger::new(ResolverComponent::Cache),
        }
    }

    /// Pass-through wrapper with no backend.
    pub fn uncached(matcher: Arc<FuzzyMatcher>) -> Self {
        Self::new(matcher, None, CacheConfig::default())
    }

    /// Uses Redis when `config.enabled`, otherwise pass-through.
    pub fn from_config(matcher: Arc<FuzzyMatcher>, config: CacheConfig) -> Result<Self> {
        let backend: Option<Arc<dyn CacheBackend>> = if config.enabled {
            Some(Arc::new(RedisCacheBackend::new(&config.redis_url)?))
        } else {
            None
        };
        let cached = Self::new(matcher, backend, config);
        match &cached.backend {
            Some(backend) => cached.logger.log_phase(
                "Cache backend configured",
                Some(&format!("{} (prefix '{}')", backend.name(), cached.config.key_prefix)),
            ),
            None => cached.logger.log_phase("Cache disabled, matching pass-through", None),
        }
        Ok(cached)
    }

    pub fn matcher(&self) -> &Arc<FuzzyMatcher> {
        &self.matcher
    }

    pub fn metrics(&self) -> Arc<CacheMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Number of times the underlying matcher actually ran.
    pub fn match_invocations(&self) -> u64 {
        self.match_invocations.load(Ordering::Relaxed)
    }

    pub async fn match_cached(&self, input: &str, candidates: &[Candidate], threshold: f64) -> Vec<EnhancedMatchResult> {
        self.match_cached_with_type(input, candidates, threshold, None).await
    }

    pub async fn match_cached_with_type(
        &self,
        input: &str,
        candidates: &[Candidate],
        threshold: f64,
        match_type: Option<MatchType>,
    ) -> Vec<EnhancedMatchResult> {
        let start = Instant::now();
        let Some(backend) = self.backend.as_ref() else {
            let (results, elapsed_ms) = self.compute(input, candidates, threshold, match_type);
            return fresh(results, elapsed_ms);
        };

        let key = self.key_for(input, candidates, threshold, match_type);
        if let Some(Some(bytes)) = self.run_backend("get", backend.get(&key)).await {
            if let Some(payload) = self.decode(&key, &bytes) {
                let elapsed_ms = elapsed_ms(start);
                self.metrics.record_hit(elapsed_ms);
                self.maybe_log_summary();
                return payload
                    .results
                    .into_iter()
                    .map(|r| EnhancedMatchResult::cached(r, elapsed_ms))
                    .collect();
            }
        }

        let (results, match_ms) = self.compute(input, candidates, threshold, match_type);
        if let Some(bytes) = self.encode(&results, match_ms) {
            let len = bytes.len();
            if self
                .run_backend("set", backend.set(&key, bytes, self.config.default_ttl_secs))
                .await
                .is_some()
            {
                self.metrics.record_bytes_cached(len);
            }
        }
        self.metrics.record_miss(elapsed_ms(start));
        self.maybe_log_summary();
        fresh(results, match_ms)
    }

    /// Match several `(input, candidates)` pairs with one multi-get and one
    /// pipelined multi-set. Output order follows `requests`.
    pub async fn match_batch_cached(
        &self,
        requests: &[(String, Vec<Candidate>)],
        threshold: f64,
    ) -> Vec<Vec<EnhancedMatchResult>> {
        let Some(backend) = self.backend.as_ref() else {
            return requests
                .iter()
                .map(|(input, candidates)| {
                    let (results, elapsed_ms) = self.compute(input, candidates, threshold, None);
                    fresh(results, elapsed_ms)
                })
                .collect();
        };
        if requests.is_empty() {
            return Vec::new();
        }

        let start = Instant::now();
        let keys: Vec<String> = requests
            .iter()
            .map(|(input, candidates)| self.key_for(input, candidates, threshold, None))
            .collect();
        let mut stored = self
            .run_backend("get_many", backend.get_many(&keys))
            .await
            .unwrap_or_default();
        if stored.len() != keys.len() {
            stored = vec![None; keys.len()];
        }
        let lookup_ms = elapsed_ms(start);

        let mut outputs = Vec::with_capacity(requests.len());
        let mut to_store = Vec::new();
        for (((input, candidates), key), value) in requests.iter().zip(&keys).zip(stored) {
            let hit = value.and_then(|bytes| self.decode(key, &bytes));
            match hit {
                Some(payload) => {
                    self.metrics.record_hit(lookup_ms);
                    outputs.push(
                        payload
                            .results
                            .into_iter()
                            .map(|r| EnhancedMatchResult::cached(r, lookup_ms))
                            .collect(),
                    );
                }
                None => {
                    let (results, match_ms) = self.compute(input, candidates, threshold, None);
                    if let Some(bytes) = self.encode(&results, match_ms) {
                        to_store.push((key.clone(), bytes));
                    }
                    self.metrics.record_miss(lookup_ms + match_ms);
                    outputs.push(fresh(results, match_ms));
                }
            }
        }

        self.store_many(backend.as_ref(), to_store, self.config.default_ttl_secs)
            .await;
        self.maybe_log_summary();
        outputs
    }

    /// Precompute and store results for anticipated queries with the warm TTL.
    /// Returns the number of entries written.
    pub async fn warm_cache(&self, queries: &[String], candidates: &[Candidate], threshold: f64) -> usize {
        let Some(backend) = self.backend.as_ref() else {
            return 0;
        };
        let entries: Vec<(String, Vec<u8>)> = queries
            .iter()
            .filter_map(|query| {
                let (results, match_ms) = self.compute(query, candidates, threshold, None);
                self.encode(&results, match_ms)
                    .map(|bytes| (self.key_for(query, candidates, threshold, None), bytes))
            })
            .collect();
        let written = self
            .store_many(backend.as_ref(), entries, self.config.warm_ttl_secs)
            .await;
        self.logger.log_phase(
            "Cache warmed",
            Some(&format!("{} of {} queries stored", written, queries.len())),
        );
        written
    }

    /// Delete keys matching `pattern` inside this matcher's namespace.
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        let Some(backend) = self.backend.as_ref() else {
            return 0;
        };
        let scoped = if pattern.starts_with(&format!("{}:", self.config.key_prefix)) {
            pattern.to_string()
        } else {
            format!("{}:{}", self.config.key_prefix, pattern)
        };
        let deleted = self
            .run_backend("delete_pattern", backend.delete_pattern(&scoped))
            .await
            .unwrap_or(0);
        self.metrics.record_evictions(deleted);
        deleted
    }

    pub async fn invalidate_all(&self) -> usize {
        self.invalidate_pattern(&namespace_pattern(&self.config.key_prefix))
            .await
    }

    /// Flush the entire backend, not just this namespace.
    pub async fn flush_all(&self) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };
        let flushed = self.run_backend("flush_all", backend.flush_all()).await.is_some();
        if flushed {
            self.logger.log_phase("Cache backend flushed", None);
        }
        flushed
    }

    pub fn stats(&self) -> CacheMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn health(&self) -> CacheHealthReport {
        let (backend_reachable, cached_entries) = match self.backend.as_ref() {
            Some(backend) => {
                let reachable = self.run_backend("ping", backend.ping()).await.is_some();
                let pattern = namespace_pattern(&self.config.key_prefix);
                let entries = if reachable {
                    self.run_backend("count_keys", backend.count_keys(&pattern)).await
                } else {
                    None
                };
                (reachable, entries)
            }
            None => (false, None),
        };
        CacheHealthReport {
            cache_configured: self.backend.is_some(),
            backend_reachable,
            cached_entries,
            metrics: self.metrics.snapshot(),
            dictionaries: self.matcher.dictionary_sizes(),
            generated_at: Utc::now(),
        }
    }

    fn key_for(&self, input: &str, candidates: &[Candidate], threshold: f64, match_type: Option<MatchType>) -> String {
        match_key(
            &self.config.key_prefix,
            input,
            &candidates_hash(candidates),
            threshold,
            match_type,
        )
    }

    fn compute(
        &self,
        input: &str,
        candidates: &[Candidate],
        threshold: f64,
        match_type: Option<MatchType>,
    ) -> (Vec<MatchResult>, f64) {
        let start = Instant::now();
        self.match_invocations.fetch_add(1, Ordering::Relaxed);
        let results = self
            .matcher
            .match_with_type(input, candidates, threshold, match_type);
        (results, elapsed_ms(start))
    }

    fn encode(&self, results: &[MatchResult], match_ms: f64) -> Option<Vec<u8>> {
        let payload = CachedPayload::new(results.to_vec(), match_ms);
        match encode_payload(&payload, self.config.compression_threshold_bytes) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Cache encode failed, skipping write: {:#}", e);
                self.metrics.record_backend_error();
                None
            }
        }
    }

    fn decode(&self, key: &str, bytes: &[u8]) -> Option<CachedPayload> {
        match decode_payload(bytes) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!("Ignoring undecodable cache entry {}: {:#}", key, e);
                self.metrics.record_backend_error();
                None
            }
        }
    }

    async fn store_many(&self, backend: &dyn CacheBackend, entries: Vec<(String, Vec<u8>)>, ttl_secs: u64) -> usize {
        if entries.is_empty() {
            return 0;
        }
        let count = entries.len();
        let bytes: usize = entries.iter().map(|(_, value)| value.len()).sum();
        if self
            .run_backend("set_many", backend.set_many(entries, ttl_secs))
            .await
            .is_some()
        {
            self.metrics.record_bytes_cached(bytes);
            count
        } else {
            0
        }
    }

    /// Await one backend operation under the configured timeout. Failures become `None`.
    async fn run_backend<T>(&self, operation: &str, fut: BoxFuture<'_, Result<T>>) -> Option<T> {
        match tokio::time::timeout(self.config.operation_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!("Cache {} failed, continuing without cache: {:#}", operation, e);
                self.metrics.record_backend_error();
                None
            }
            Err(_) => {
                warn!(
                    "Cache {} timed out after {:?}, continuing without cache",
                    operation, self.config.operation_timeout
                );
                self.metrics.record_backend_error();
                None
            }
        }
    }

    fn maybe_log_summary(&self) {
        let snapshot = self.metrics.snapshot();
        if snapshot.total_requests > 0 && snapshot.total_requests % SUMMARY_INTERVAL == 0 {
            self.logger
                .log_cache_summary(snapshot.cache_hits, snapshot.cache_misses);
        }
    }
}

fn fresh(results: Vec<MatchResult>, match_time_ms: f64) -> Vec<EnhancedMatchResult> {
    results
        .into_iter()
        .map(|r| EnhancedMatchResult::fresh(r, match_time_ms))
        .collect()
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::InMemoryCacheBackend;
    use crate::matching::dictionaries::Dictionaries;
    use crate::models::matching::{ALGO_CACHE, ALGO_CORE};
    use anyhow::anyhow;
    use std::time::Duration;

    struct FailingCacheBackend;

    impl CacheBackend for FailingCacheBackend {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
            Box::pin(async { Err(anyhow!("connection refused")) })
        }
        fn get_many<'a>(&'a self, _keys: &'a [String]) -> BoxFuture<'a, Result<Vec<Option<Vec<u8>>>>> {
            Box::pin(async { Err(anyhow!("connection refused")) })
        }
        fn set<'a>(&'a self, _key: &'a str, _value: Vec<u8>, _ttl: u64) -> BoxFuture<'a, Result<()>> {
            Box::pin(async { Err(anyhow!("connection refused")) })
        }
        fn set_many<'a>(&'a self, _entries: Vec<(String, Vec<u8>)>, _ttl: u64) -> BoxFuture<'a, Result<()>> {
            Box::pin(async { Err(anyhow!("connection refused")) })
        }
        fn delete_pattern<'a>(&'a self, _pattern: &'a str) -> BoxFuture<'a, Result<usize>> {
            Box::pin(async { Err(anyhow!("connection refused")) })
        }
        fn count_keys<'a>(&'a self, _pattern: &'a str) -> BoxFuture<'a, Result<usize>> {
            Box::pin(async { Err(anyhow!("connection refused")) })
        }
        fn flush_all(&self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Err(anyhow!("connection refused")) })
        }
        fn ping(&self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Err(anyhow!("connection refused")) })
        }
    }

    /// Never answers a read within any sane timeout.
    struct StalledCacheBackend(InMemoryCacheBackend);

    impl CacheBackend for StalledCacheBackend {
        fn name(&self) -> &'static str {
            "stalled"
        }
        fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                self.0.get(key).await
            })
        }
        fn get_many<'a>(&'a self, keys: &'a [String]) -> BoxFuture<'a, Result<Vec<Option<Vec<u8>>>>> {
            self.0.get_many(keys)
        }
        fn set<'a>(&'a self, key: &'a str, value: Vec<u8>, ttl: u64) -> BoxFuture<'a, Result<()>> {
            self.0.set(key, value, ttl)
        }
        fn set_many<'a>(&'a self, entries: Vec<(String, Vec<u8>)>, ttl: u64) -> BoxFuture<'a, Result<()>> {
            self.0.set_many(entries, ttl)
        }
        fn delete_pattern<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<usize>> {
            self.0.delete_pattern(pattern)
        }
        fn count_keys<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Result<usize>> {
            self.0.count_keys(pattern)
        }
        fn flush_all(&self) -> BoxFuture<'_, Result<()>> {
            self.0.flush_all()
        }
        fn ping(&self) -> BoxFuture<'_, Result<()>> {
            self.0.ping()
        }
    }

    fn matcher() -> Arc<FuzzyMatcher> {
        Arc::new(FuzzyMatcher::with_dictionaries(Dictionaries::defaults()))
    }

    fn test_config() -> CacheConfig {
        CacheConfig {
            enabled: true,
            operation_timeout: Duration::from_millis(50),
            ..CacheConfig::default()
        }
    }

    fn in_memory() -> CachedMatcher {
        CachedMatcher::new(matcher(), Some(Arc::new(InMemoryCacheBackend::new())), test_config())
    }

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("1", "Microsoft Corporation"),
            Candidate::new("2", "Acme Holdings"),
            Candidate::new("3", "International Business Machines"),
        ]
    }

    fn content(results: &[EnhancedMatchResult]) -> Vec<MatchResult> {
        results.iter().map(|r| r.result.clone()).collect()
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let cached = in_memory();
        let first = cached.match_cached("Microsft Corporation", &candidates(), 0.7).await;
        assert!(!first.is_empty());
        assert!(first.iter().all(|r| !r.from_cache && r.algorithm_used == ALGO_CORE));
        assert_eq!(cached.match_invocations(), 1);

        let second = cached.match_cached("Microsft Corporation", &candidates(), 0.7).await;
        assert!(second.iter().all(|r| r.from_cache && r.algorithm_used == ALGO_CACHE));
        assert_eq!(content(&first), content(&second));
        assert_eq!(cached.match_invocations(), 1);

        let stats = cached.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert!(stats.total_bytes_cached > 0);
    }

    #[tokio::test]
    async fn test_key_ignores_candidate_order_but_not_threshold_or_type() {
        let cached = in_memory();
        let mut reversed = candidates();
        reversed.reverse();

        cached.match_cached("IBM", &candidates(), 0.7).await;
        let hit = cached.match_cached("IBM", &reversed, 0.7).await;
        assert!(hit.iter().all(|r| r.from_cache));
        assert_eq!(cached.match_invocations(), 1);

        cached.match_cached("IBM", &candidates(), 0.8).await;
        cached
            .match_cached_with_type("IBM", &candidates(), 0.7, Some(MatchType::Acronym))
            .await;
        assert_eq!(cached.match_invocations(), 3);
    }

    #[tokio::test]
    async fn test_failing_backend_degrades_to_uncached_results() {
        let reference = CachedMatcher::uncached(matcher());
        let failing = CachedMatcher::new(matcher(), Some(Arc::new(FailingCacheBackend)), test_config());

        for _ in 0..2 {
            let expected = reference.match_cached("Microsft Corporation", &candidates(), 0.7).await;
            let got = failing.match_cached("Microsft Corporation", &candidates(), 0.7).await;
            assert_eq!(content(&expected), content(&got));
            assert!(got.iter().all(|r| !r.from_cache));
        }

        let stats = failing.stats();
        assert_eq!(stats.cache_hits, 0);
        assert_eq!(stats.cache_misses, 2);
        assert_eq!(stats.backend_errors, 4);
        assert_eq!(stats.total_bytes_cached, 0);

        let requests = vec![("IBM".to_string(), candidates())];
        assert_eq!(failing.match_batch_cached(&requests, 0.7).await[0].len(), 1);
        assert_eq!(failing.warm_cache(&["IBM".to_string()], &candidates(), 0.7).await, 0);
        assert_eq!(failing.invalidate_all().await, 0);
        assert!(!failing.flush_all().await);

        let health = failing.health().await;
        assert!(health.cache_configured);
        assert!(!health.backend_reachable);
        assert_eq!(health.cached_entries, None);
    }

    #[tokio::test]
    async fn test_stalled_backend_times_out_as_miss() {
        let cached = CachedMatcher::new(
            matcher(),
            Some(Arc::new(StalledCacheBackend(InMemoryCacheBackend::new()))),
            test_config(),
        );
        let started = Instant::now();
        let results = cached.match_cached("IBM", &candidates(), 0.7).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(results.len(), 1);
        assert!(!results[0].from_cache);
        assert_eq!(cached.stats().backend_errors, 1);
    }

    #[tokio::test]
    async fn test_pass_through_records_no_metrics() {
        let cached = CachedMatcher::uncached(matcher());
        assert!(!cached.is_cache_enabled());
        for _ in 0..2 {
            let results = cached.match_cached("IBM", &candidates(), 0.7).await;
            assert_eq!(results.len(), 1);
            assert!(!results[0].from_cache);
            assert!(results[0].match_time_ms >= 0.0);
        }
        assert_eq!(cached.match_invocations(), 2);
        assert_eq!(cached.stats(), CacheMetricsSnapshot::default());
        assert!(!cached.health().await.cache_configured);
    }

    #[tokio::test]
    async fn test_batch_warm_and_invalidate() {
        let cached = in_memory();
        let warmed = cached
            .warm_cache(&["IBM".to_string(), "Acme".to_string()], &candidates(), 0.7)
            .await;
        assert_eq!(warmed, 2);
        assert_eq!(cached.match_invocations(), 2);

        let requests = vec![
            ("IBM".to_string(), candidates()),
            ("Acme".to_string(), candidates()),
            ("Microsoft Corporation".to_string(), candidates()),
        ];
        let batch = cached.match_batch_cached(&requests, 0.7).await;
        assert_eq!(batch.len(), 3);
        assert!(batch[0].iter().all(|r| r.from_cache));
        assert!(batch[1].iter().all(|r| r.from_cache));
        assert!(batch[2].iter().all(|r| !r.from_cache));
        assert_eq!(batch[2][0].result.match_type, MatchType::Exact);
        assert_eq!(cached.match_invocations(), 3);

        let health = cached.health().await;
        assert!(health.backend_reachable);
        assert_eq!(health.cached_entries, Some(3));

        assert_eq!(cached.invalidate_all().await, 3);
        assert_eq!(cached.stats().evictions, 3);
        let again = cached.match_cached("IBM", &candidates(), 0.7).await;
        assert!(again.iter().all(|r| !r.from_cache));
    }

    #[tokio::test]
    async fn test_invalidate_pattern_is_scoped_to_namespace() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        backend.set("other:match:1", vec![1], 60).await.unwrap();
        let cached = CachedMatcher::new(matcher(), Some(backend.clone()), test_config());
        cached.match_cached("IBM", &candidates(), 0.7).await;

        assert_eq!(cached.invalidate_pattern("match:*").await, 1);
        assert_eq!(backend.count_keys("*").await.unwrap(), 1);
        assert!(cached.flush_all().await);
        assert_eq!(backend.count_keys("*").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_treated_as_miss() {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let cached = CachedMatcher::new(matcher(), Some(backend.clone()), test_config());
        let key = cached.key_for("IBM", &candidates(), 0.7, None);
        backend.set(&key, b"z:garbage".to_vec(), 60).await.unwrap();

        let results = cached.match_cached("IBM", &candidates(), 0.7).await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].from_cache);
        let healed = cached.match_cached("IBM", &candidates(), 0.7).await;
        assert!(healed[0].from_cache);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_lookups_keep_consistent_counts() {
        const TASKS: u64 = 8;
        const PER_TASK: u64 = 25;
        let config = CacheConfig {
            operation_timeout: Duration::from_secs(5),
            ..test_config()
        };
        let cached = Arc::new(CachedMatcher::new(
            matcher(),
            Some(Arc::new(InMemoryCacheBackend::new())),
            config,
        ));

        let handles: Vec<_> = (0..TASKS)
            .map(|task| {
                let cached = Arc::clone(&cached);
                tokio::spawn(async move {
                    let inputs = ["IBM", "Microsoft Corp", "Acme Holdings"];
                    for i in 0..PER_TASK {
                        let input = inputs[((task + i) % 3) as usize];
                        cached.match_cached(input, &candidates(), 0.7).await;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let snap = cached.stats();
        assert_eq!(snap.total_requests, TASKS * PER_TASK);
        assert_eq!(snap.cache_hits + snap.cache_misses, snap.total_requests);
        assert!(snap.cache_misses >= 3);
        assert_eq!(cached.match_invocations(), snap.cache_misses);
    }
}
