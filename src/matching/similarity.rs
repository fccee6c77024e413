// src/matching/similarity.rs
//! Pluggable edit-distance similarity.
//!
//! Both backends compute the normalized Levenshtein similarity
//! `1 - distance / max(len_a, len_b)` over chars, so swapping one for the other
//! never changes a score.

use log::info;
use rapidfuzz::distance::levenshtein;
use std::sync::Arc;

pub trait SimilarityBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Similarity ratio in `[0, 1]`; symmetric.
    fn ratio(&self, a: &str, b: &str) -> f64;
}

/// Baseline implementation on top of `strsim`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrsimLevenshtein;

impl SimilarityBackend for StrsimLevenshtein {
    fn name(&self) -> &'static str {
        "strsim_levenshtein"
    }

    fn ratio(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        strsim::normalized_levenshtein(a, b)
    }
}

/// High-performance implementation on top of `rapidfuzz`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RapidFuzzLevenshtein;

impl SimilarityBackend for RapidFuzzLevenshtein {
    fn name(&self) -> &'static str {
        "rapidfuzz_levenshtein"
    }

    fn ratio(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        levenshtein::normalized_similarity(a.chars(), b.chars())
    }
}

pub fn select_backend(prefer_fast: bool) -> Arc<dyn SimilarityBackend> {
    let backend: Arc<dyn SimilarityBackend> = if prefer_fast {
        Arc::new(RapidFuzzLevenshtein)
    } else {
        Arc::new(StrsimLevenshtein)
    };
    info!("Using similarity backend: {}", backend.name());
    backend
}

/// One query preprocessed once and compared against many candidates.
pub struct QueryComparator {
    query_is_empty: bool,
    inner: levenshtein::BatchComparator<char>,
}

impl QueryComparator {
    pub fn new(query: &str) -> Self {
        Self {
            query_is_empty: query.is_empty(),
            inner: levenshtein::BatchComparator::new(query.chars()),
        }
    }

    pub fn ratio(&self, candidate: &str) -> f64 {
        if self.query_is_empty || candidate.is_empty() {
            return 0.0;
        }
        self.inner.normalized_similarity(candidate.chars())
    }
}

/// Best ratio of the shorter string against every equally long window of the longer one.
pub fn partial_ratio(backend: &dyn SimilarityBackend, a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = shorter.chars().count();
    let longer_chars: Vec<char> = longer.chars().collect();
    if short_len == longer_chars.len() {
        return backend.ratio(shorter, longer);
    }

    let mut best = 0.0_f64;
    for start in 0..=(longer_chars.len() - short_len) {
        let window: String = longer_chars[start..start + short_len].iter().collect();
        let score = backend.ratio(shorter, &window);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backends_agree() {
        let pairs = [
            ("microsft corp", "microsoft corp"),
            ("co 50", "co 50 corp"),
            ("acme", "zenith"),
            ("kitten", "sitting"),
            ("café", "cafe"),
        ];
        for (a, b) in pairs {
            let slow = StrsimLevenshtein.ratio(a, b);
            let fast = RapidFuzzLevenshtein.ratio(a, b);
            assert!((slow - fast).abs() < 1e-9, "{a} / {b}: {slow} vs {fast}");
            assert!((QueryComparator::new(a).ratio(b) - slow).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ratio_is_symmetric_and_bounded() {
        let backend = StrsimLevenshtein;
        let ab = backend.ratio("hewlett packard", "packard bell");
        let ba = backend.ratio("packard bell", "hewlett packard");
        assert!((ab - ba).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&ab));
        assert_eq!(backend.ratio("", "anything"), 0.0);
        assert_eq!(backend.ratio("same", "same"), 1.0);
    }

    #[test]
    fn test_partial_ratio_finds_embedded_string() {
        let backend = StrsimLevenshtein;
        assert_eq!(partial_ratio(&backend, "mkrs", "xxmkrsyy"), 1.0);
        assert_eq!(partial_ratio(&backend, "", "mkrs"), 0.0);
        let score = partial_ratio(&backend, "mkr", "akrt");
        assert!(score > 0.6 && score < 1.0);
    }
}
