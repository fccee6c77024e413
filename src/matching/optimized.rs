// src/matching/optimized.rs
//! Performance-tuned sibling of [`FuzzyMatcher`] for large candidate sets.
//!
//! Per candidate, checks run cheapest first and each one can reject early:
//! exact equality, a length-ratio window, the fuzzy ratio against a relaxed
//! cut-off, and finally a phonetic bonus only for strong fuzzy scores.

use anyhow::{Context, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::matching::dictionaries::DictionaryStore;
use crate::matching::matcher::{build_result, FuzzyMatcher};
use crate::matching::similarity::{select_backend, QueryComparator, SimilarityBackend};
use crate::matching::strategies::phonetic_score;
use crate::models::stats_models::{DictionarySizes, OptimizedMatcherStats};
use crate::models::{Candidate, MatchResult, MatchType, OptimizedMatchResult};
use crate::utils::config::{MatcherConfig, OptimizedConfig};
use crate::utils::logging::{ResolverComponent, ResolverLogger};

const MIN_LENGTH_RATIO: f64 = 0.5;
const MAX_LENGTH_RATIO: f64 = 2.0;
/// Fuzzy scores below `threshold * FUZZY_CUTOFF_FACTOR` cannot reach the threshold.
const FUZZY_CUTOFF_FACTOR: f64 = 0.8;
/// Phonetic encoding only runs above this fuzzy score.
const PHONETIC_GATE: f64 = 0.6;
const FUZZY_BLEND_WEIGHT: f64 = 0.7;
const PHONETIC_BLEND_WEIGHT: f64 = 0.3;

const ALGO_SEQUENTIAL: &str = "sequential";
const ALGO_EXACT_SHORT_CIRCUIT: &str = "exact_short_circuit";
const ALGO_PARALLEL: &str = "parallel";
const ALGO_BATCH: &str = "batch_extract";

enum CandidateOutcome {
    Exact(MatchResult),
    Scored(MatchResult),
    Rejected,
}

#[derive(Default)]
struct MatcherCounters {
    total_matches: AtomicU64,
    exact_matches: AtomicU64,
    early_terminations: AtomicU64,
    parallel_executions: AtomicU64,
    batch_extractions: AtomicU64,
}

pub struct OptimizedMatcher {
    core: Arc<FuzzyMatcher>,
    similarity: Arc<dyn SimilarityBackend>,
    config: OptimizedConfig,
    pool: Option<ThreadPool>,
    counters: MatcherCounters,
    logger: ResolverLogger,
}

impl OptimizedMatcher {
    pub fn new(core: Arc<FuzzyMatcher>, config: OptimizedConfig) -> Result<Self> {
        let pool = if config.enable_parallel {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.max_workers.max(1))
                .thread_name(|i| format!("fuzzy-worker-{}", i))
                .build()
                .context("Failed to build fuzzy matching worker pool")?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            similarity: select_backend(config.use_fast_similarity),
            core,
            config,
            pool,
            counters: MatcherCounters::default(),
            logger: ResolverLogger::new(ResolverComponent::Optimized),
        })
    }

    /// Builds its own core matcher sized by `config.normalize_cache_size`.
    pub fn from_config(matcher: &MatcherConfig, config: OptimizedConfig) -> Result<Self> {
        let core = FuzzyMatcher::build(
            DictionaryStore::from_dir(matcher.dictionary_dir.clone()),
            select_backend(config.use_fast_similarity),
            config.normalize_cache_size,
        );
        Self::new(Arc::new(core), config)
    }

    pub fn core(&self) -> &Arc<FuzzyMatcher> {
        &self.core
    }

    /// Rank `candidates` against `input`, returning at most `top_n` results.
    pub fn match_optimized(
        &self,
        input: &str,
        candidates: &[Candidate],
        threshold: f64,
        top_n: usize,
    ) -> Vec<OptimizedMatchResult> {
        let start = Instant::now();
        self.counters.total_matches.fetch_add(1, Ordering::Relaxed);

        let normalized_input = self.core.normalize(input);
        if normalized_input.is_empty() || candidates.is_empty() || top_n == 0 {
            return Vec::new();
        }

        let (mut results, algorithm) = if self.config.use_fast_similarity
            && candidates.len() > self.config.batch_threshold
        {
            (
                self.match_batch_extract(input, &normalized_input, candidates, threshold),
                ALGO_BATCH,
            )
        } else if self.pool.is_some() && candidates.len() > self.config.parallel_threshold {
            (
                self.match_parallel(input, &normalized_input, candidates, threshold),
                ALGO_PARALLEL,
            )
        } else {
            self.match_sequential(input, &normalized_input, candidates, threshold)
        };

        results.sort_by(MatchResult::rank_cmp);
        results.truncate(top_n);

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.logger
            .log_match_completion(input, candidates.len(), results.len(), elapsed_ms);
        results
            .into_iter()
            .map(|result| OptimizedMatchResult {
                result,
                algorithm_used: algorithm.to_string(),
                match_time_ms: elapsed_ms,
            })
            .collect()
    }

    /// Runs [`match_optimized`](Self::match_optimized) on the blocking thread pool so
    /// an async caller's executor is never stalled.
    pub async fn match_optimized_async(
        self: Arc<Self>,
        input: String,
        candidates: Vec<Candidate>,
        threshold: f64,
        top_n: usize,
    ) -> Result<Vec<OptimizedMatchResult>> {
        tokio::task::spawn_blocking(move || self.match_optimized(&input, &candidates, threshold, top_n))
            .await
            .context("Optimized matching task failed")
    }

    fn match_sequential(
        &self,
        input: &str,
        normalized_input: &str,
        candidates: &[Candidate],
        threshold: f64,
    ) -> (Vec<MatchResult>, &'static str) {
        let mut results = Vec::new();
        for candidate in candidates {
            match self.score_candidate(input, normalized_input, candidate, threshold, |c| {
                self.similarity.ratio(normalized_input, c)
            }) {
                CandidateOutcome::Exact(result) => {
                    self.counters.exact_matches.fetch_add(1, Ordering::Relaxed);
                    self.counters.early_terminations.fetch_add(1, Ordering::Relaxed);
                    return (vec![result], ALGO_EXACT_SHORT_CIRCUIT);
                }
                CandidateOutcome::Scored(result) => results.push(result),
                CandidateOutcome::Rejected => {}
            }
        }
        (results, ALGO_SEQUENTIAL)
    }

    fn match_parallel(
        &self,
        input: &str,
        normalized_input: &str,
        candidates: &[Candidate],
        threshold: f64,
    ) -> Vec<MatchResult> {
        let Some(pool) = self.pool.as_ref() else {
            return self.match_sequential(input, normalized_input, candidates, threshold).0;
        };
        self.counters.parallel_executions.fetch_add(1, Ordering::Relaxed);
        self.logger
            .log_parallel_fanout(candidates.len(), pool.current_num_threads());

        let deadline = Instant::now() + self.config.parallel_deadline;
        let expired = AtomicU64::new(0);
        let outcomes: Vec<CandidateOutcome> = pool.install(|| {
            candidates
                .par_iter()
                .map(|candidate| {
                    if Instant::now() >= deadline {
                        expired.fetch_add(1, Ordering::Relaxed);
                        return CandidateOutcome::Rejected;
                    }
                    panic::catch_unwind(AssertUnwindSafe(|| {
                        self.score_candidate(input, normalized_input, candidate, threshold, |c| {
                            self.similarity.ratio(normalized_input, c)
                        })
                    }))
                    .unwrap_or_else(|_| {
                        self.logger.log_warning(&format!(
                            "Scoring candidate {} panicked; treating as non-matching",
                            candidate.id
                        ));
                        CandidateOutcome::Rejected
                    })
                })
                .collect()
        });
        let expired = expired.into_inner();
        if expired > 0 {
            self.logger.log_warning(&format!(
                "Parallel scoring deadline of {:?} passed; {} candidates left unscored",
                self.config.parallel_deadline, expired
            ));
        }
        self.collect_outcomes(outcomes)
    }

    fn match_batch_extract(
        &self,
        input: &str,
        normalized_input: &str,
        candidates: &[Candidate],
        threshold: f64,
    ) -> Vec<MatchResult> {
        self.counters.batch_extractions.fetch_add(1, Ordering::Relaxed);
        let comparator = QueryComparator::new(normalized_input);
        let outcomes = candidates
            .iter()
            .map(|candidate| {
                self.score_candidate(input, normalized_input, candidate, threshold, |c| {
                    comparator.ratio(c)
                })
            })
            .collect();
        self.collect_outcomes(outcomes)
    }

    fn collect_outcomes(&self, outcomes: Vec<CandidateOutcome>) -> Vec<MatchResult> {
        outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                CandidateOutcome::Exact(result) => {
                    self.counters.exact_matches.fetch_add(1, Ordering::Relaxed);
                    Some(result)
                }
                CandidateOutcome::Scored(result) => Some(result),
                CandidateOutcome::Rejected => None,
            })
            .collect()
    }

    fn score_candidate<F>(
        &self,
        input: &str,
        normalized_input: &str,
        candidate: &Candidate,
        threshold: f64,
        fuzzy_ratio: F,
    ) -> CandidateOutcome
    where
        F: Fn(&str) -> f64,
    {
        let normalized_candidate = self.core.normalize(candidate.name_or_empty());
        if normalized_candidate.is_empty() {
            return CandidateOutcome::Rejected;
        }
        if normalized_candidate == normalized_input {
            return CandidateOutcome::Exact(build_result(
                input,
                candidate,
                1.0,
                MatchType::Exact,
                normalized_input,
                &normalized_candidate,
            ));
        }

        let length_ratio =
            normalized_candidate.chars().count() as f64 / normalized_input.chars().count() as f64;
        if !(MIN_LENGTH_RATIO..=MAX_LENGTH_RATIO).contains(&length_ratio) {
            return CandidateOutcome::Rejected;
        }

        let fuzzy = fuzzy_ratio(&normalized_candidate);
        if fuzzy < threshold * FUZZY_CUTOFF_FACTOR {
            return CandidateOutcome::Rejected;
        }

        // The blend can only raise the fuzzy score, never lower it.
        let (score, phonetic) = if fuzzy > PHONETIC_GATE {
            let phonetic = phonetic_score(normalized_input, &normalized_candidate, self.similarity.as_ref());
            let blended = fuzzy * FUZZY_BLEND_WEIGHT + phonetic * PHONETIC_BLEND_WEIGHT;
            (blended.max(fuzzy), Some(phonetic))
        } else {
            (fuzzy, None)
        };
        if score < threshold {
            return CandidateOutcome::Rejected;
        }

        let mut result = build_result(
            input,
            candidate,
            score,
            MatchType::Fuzzy,
            normalized_input,
            &normalized_candidate,
        );
        if let Some(metadata) = result.metadata.as_mut() {
            metadata.insert("fuzzy_score".to_string(), Value::from(fuzzy));
            if let Some(phonetic) = phonetic {
                metadata.insert("phonetic_score".to_string(), Value::from(phonetic));
            }
        }
        CandidateOutcome::Scored(result)
    }

    pub fn get_stats(&self) -> OptimizedMatcherStats {
        OptimizedMatcherStats {
            total_matches: self.counters.total_matches.load(Ordering::Relaxed),
            exact_matches: self.counters.exact_matches.load(Ordering::Relaxed),
            early_terminations: self.counters.early_terminations.load(Ordering::Relaxed),
            parallel_executions: self.counters.parallel_executions.load(Ordering::Relaxed),
            batch_extractions: self.counters.batch_extractions.load(Ordering::Relaxed),
            normalize_cache_size: self.core.normalize_cache_len(),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.total_matches.store(0, Ordering::Relaxed);
        self.counters.exact_matches.store(0, Ordering::Relaxed);
        self.counters.early_terminations.store(0, Ordering::Relaxed);
        self.counters.parallel_executions.store(0, Ordering::Relaxed);
        self.counters.batch_extractions.store(0, Ordering::Relaxed);
    }

    pub fn reload_dictionaries(&self) -> DictionarySizes {
        self.core.reload_dictionaries()
    }

    /// Release the worker pool; later calls fall back to sequential scoring.
    pub fn shutdown(&mut self) {
        if self.pool.take().is_some() {
            self.logger.log_debug("Worker pool released");
        }
    }
}
