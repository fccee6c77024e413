// src/cache/metrics.rs
use std::sync::{Mutex, PoisonError};

use crate::models::stats_models::CacheMetricsSnapshot;

/// Weight given to the newest sample in the latency moving averages.
const LATENCY_EMA_ALPHA: f64 = 0.1;

#[derive(Debug, Default)]
struct MetricsState {
    total_requests: u64,
    hits: u64,
    misses: u64,
    avg_hit_time_ms: f64,
    avg_miss_time_ms: f64,
    bytes_cached: u64,
    evictions: u64,
    backend_errors: u64,
}

/// Request counters and latency averages for the cache layer.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    state: Mutex<MetricsState>,
}

fn ema(current: f64, sample: f64) -> f64 {
    current * (1.0 - LATENCY_EMA_ALPHA) + sample * LATENCY_EMA_ALPHA
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MetricsState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn record_hit(&self, elapsed_ms: f64) {
        self.with_state(|s| {
            s.total_requests += 1;
            s.hits += 1;
            s.avg_hit_time_ms = ema(s.avg_hit_time_ms, elapsed_ms);
        });
    }

    pub fn record_miss(&self, elapsed_ms: f64) {
        self.with_state(|s| {
            s.total_requests += 1;
            s.misses += 1;
            s.avg_miss_time_ms = ema(s.avg_miss_time_ms, elapsed_ms);
        });
    }

    pub fn record_bytes_cached(&self, bytes: usize) {
        self.with_state(|s| s.bytes_cached += bytes as u64);
    }

    pub fn record_evictions(&self, count: usize) {
        self.with_state(|s| s.evictions += count as u64);
    }

    pub fn record_backend_error(&self) {
        self.with_state(|s| s.backend_errors += 1);
    }

    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        self.with_state(|s| {
            let (hit_rate, miss_rate) = if s.total_requests == 0 {
                (0.0, 0.0)
            } else {
                let total = s.total_requests as f64;
                (s.hits as f64 / total, s.misses as f64 / total)
            };
            CacheMetricsSnapshot {
                total_requests: s.total_requests,
                cache_hits: s.hits,
                cache_misses: s.misses,
                hit_rate,
                miss_rate,
                avg_hit_time_ms: s.avg_hit_time_ms,
                avg_miss_time_ms: s.avg_miss_time_ms,
                total_bytes_cached: s.bytes_cached,
                evictions: s.evictions,
                backend_errors: s.backend_errors,
            }
        })
    }

    pub fn reset(&self) {
        self.with_state(|s| *s = MetricsState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_rates_and_latency_average() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.snapshot().hit_rate, 0.0);

        metrics.record_miss(10.0);
        metrics.record_hit(2.0);
        metrics.record_hit(2.0);
        metrics.record_bytes_cached(128);

        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 3);
        assert_eq!(snap.cache_hits, 2);
        assert_eq!(snap.cache_misses, 1);
        assert!((snap.hit_rate + snap.miss_rate - 1.0).abs() < 1e-12);
        assert!((snap.avg_miss_time_ms - 1.0).abs() < 1e-12);
        assert!((snap.avg_hit_time_ms - 0.38).abs() < 1e-12);
        assert_eq!(snap.total_bytes_cached, 128);
    }

    #[test]
    fn test_reset_clears_everything() {
        let metrics = CacheMetrics::new();
        metrics.record_hit(1.0);
        metrics.record_backend_error();
        metrics.record_evictions(3);
        metrics.reset();
        assert_eq!(metrics.snapshot(), CacheMetricsSnapshot::default());
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 1_000;
        let metrics = Arc::new(CacheMetrics::new());

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for j in 0..PER_THREAD {
                        if (i + j) % 2 == 0 {
                            metrics.record_hit(1.0);
                        } else {
                            metrics.record_miss(1.0);
                        }
                        metrics.record_bytes_cached(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, THREADS * PER_THREAD);
        assert_eq!(snap.cache_hits + snap.cache_misses, snap.total_requests);
        assert_eq!(snap.cache_hits, THREADS * PER_THREAD / 2);
        assert_eq!(snap.total_bytes_cached, THREADS * PER_THREAD);
    }
}
