// src/utils/logging.rs - Logging helpers for resolver components
use log::{debug, info, warn};
use std::time::Instant;

use crate::models::stats_models::DictionarySizes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverComponent {
    Matcher,
    Optimized,
    Cache,
    Dictionaries,
    QueryEnhancer,
    QueryBuilder,
}

#[derive(Clone)]
pub struct ResolverLogger {
    component_name: &'static str,
    component_emoji: &'static str,
    start_time: Instant,
}

impl ResolverLogger {
    pub fn new(component: ResolverComponent) -> Self {
        let (component_name, component_emoji) = match component {
            ResolverComponent::Matcher => ("MATCHER", "🎯"),
            ResolverComponent::Optimized => ("OPTIMIZED", "⚡"),
            ResolverComponent::Cache => ("CACHE", "🗄️"),
            ResolverComponent::Dictionaries => ("DICTIONARIES", "📚"),
            ResolverComponent::QueryEnhancer => ("ENHANCER", "🔎"),
            ResolverComponent::QueryBuilder => ("QUERY", "🕸️"),
        };

        Self {
            component_name,
            component_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.component_name,
                self.component_emoji,
                phase,
                details,
                elapsed.as_secs_f32()
            ),
            None => info!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.component_name,
                self.component_emoji,
                phase,
                elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_dictionaries_loaded(&self, sizes: &DictionarySizes) {
        info!(
            "[{}] {} ✅ Loaded {} acronyms, {} misspellings, {} IT terms, {} company aliases",
            self.component_name,
            self.component_emoji,
            sizes.acronyms,
            sizes.common_mistakes,
            sizes.it_terms,
            sizes.company_aliases
        );
    }

    pub fn log_match_completion(&self, input: &str, candidates: usize, results: usize, elapsed_ms: f64) {
        debug!(
            "[{}] {} '{}' against {} candidates → {} results in {:.2}ms",
            self.component_name, self.component_emoji, input, candidates, results, elapsed_ms
        );
    }

    pub fn log_parallel_fanout(&self, candidates: usize, workers: usize) {
        debug!(
            "[{}] {} 🔀 Scoring {} candidates across {} workers",
            self.component_name, self.component_emoji, candidates, workers
        );
    }

    pub fn log_cache_summary(&self, hits: u64, misses: u64) {
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        info!(
            "[{}] {} 📊 Cache stats - hits: {}, misses: {}, hit rate: {:.2}%",
            self.component_name, self.component_emoji, hits, misses, hit_rate
        );
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} {}", self.component_name, self.component_emoji, message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️ {}", self.component_name, self.component_emoji, message);
    }
}
