// src/matching/matcher.rs
use log::debug;
use lru::LruCache;
use serde_json::{Map, Value};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::matching::dictionaries::{Dictionaries, DictionaryStore};
use crate::matching::normalize::normalize_entity_name;
use crate::matching::similarity::{select_backend, SimilarityBackend};
use crate::matching::strategies::{best_strategy, calculate_confidence};
use crate::models::stats_models::DictionarySizes;
use crate::models::{Candidate, MatchResult, MatchType};
use crate::utils::config::MatcherConfig;
use crate::utils::constants::{DEFAULT_NORMALIZE_CACHE_SIZE, MAX_MATCH_RESULTS};
use crate::utils::logging::{ResolverComponent, ResolverLogger};

/// Minimum similarity for an IT-term spelling suggestion.
const SUGGESTION_SIMILARITY_THRESHOLD: f64 = 0.8;
const MIN_SUGGESTION_WORD_LEN: usize = 3;

/// Multi-strategy fuzzy matcher for entity names.
///
/// Scoring only reads the current dictionary snapshot, so one matcher can be shared
/// across threads behind an `Arc`.
pub struct FuzzyMatcher {
    dictionaries: DictionaryStore,
    similarity: Arc<dyn SimilarityBackend>,
    normalize_cache: Mutex<NormalizeMemo>,
    logger: ResolverLogger,
}

/// Normalized forms tagged with the dictionary generation they were built from.
struct NormalizeMemo {
    generation: u64,
    entries: LruCache<String, String>,
}

impl FuzzyMatcher {
    /// Matcher backed by the override files in the configured dictionary directory.
    pub fn new(config: &MatcherConfig) -> Self {
        Self::build(
            DictionaryStore::from_dir(config.dictionary_dir.clone()),
            select_backend(config.use_fast_similarity),
            config.normalize_cache_size,
        )
    }

    /// Matcher over fixed dictionaries.
    pub fn with_dictionaries(dictionaries: Dictionaries) -> Self {
        Self::build(
            DictionaryStore::fixed(dictionaries),
            select_backend(true),
            DEFAULT_NORMALIZE_CACHE_SIZE,
        )
    }

    pub fn build(
        dictionaries: DictionaryStore,
        similarity: Arc<dyn SimilarityBackend>,
        normalize_cache_size: usize,
    ) -> Self {
        let logger = ResolverLogger::new(ResolverComponent::Dictionaries);
        logger.log_dictionaries_loaded(&dictionaries.snapshot().sizes());
        let capacity = NonZeroUsize::new(normalize_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            dictionaries,
            similarity,
            normalize_cache: Mutex::new(NormalizeMemo {
                generation: 0,
                entries: LruCache::new(capacity),
            }),
            logger: ResolverLogger::new(ResolverComponent::Matcher),
        }
    }

    pub fn dictionaries(&self) -> Arc<Dictionaries> {
        self.dictionaries.snapshot()
    }

    pub fn similarity(&self) -> &dyn SimilarityBackend {
        self.similarity.as_ref()
    }

    pub fn dictionary_sizes(&self) -> DictionarySizes {
        self.dictionaries.snapshot().sizes()
    }

    pub fn normalize_cache_len(&self) -> usize {
        self.memo().entries.len()
    }

    fn memo(&self) -> MutexGuard<'_, NormalizeMemo> {
        self.normalize_cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Memoized form of `text` if present, plus the current dictionary generation.
    fn memo_lookup(&self, text: &str) -> (Option<String>, u64) {
        let mut memo = self.memo();
        let hit = memo.entries.get(text).cloned();
        (hit, memo.generation)
    }

    /// Store `normalized` unless the dictionaries were reloaded since `generation`.
    fn memo_store(&self, generation: u64, text: &str, normalized: &str) {
        let mut memo = self.memo();
        if memo.generation == generation {
            memo.entries.put(text.to_string(), normalized.to_string());
        }
    }

    /// Canonical form of `text`, memoized in a bounded LRU.
    pub fn normalize(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }
        let (hit, generation) = self.memo_lookup(text);
        if let Some(hit) = hit {
            return hit;
        }
        // Snapshot after reading the generation so a stale result is never stored.
        let normalized = normalize_entity_name(text, self.dictionaries.snapshot().mistake_rules());
        self.memo_store(generation, text, &normalized);
        normalized
    }

    /// Best `(score, match_type)` between two normalized strings.
    pub fn score_normalized(&self, input: &str, candidate: &str, dictionaries: &Dictionaries) -> (f64, MatchType) {
        best_strategy(input, candidate, dictionaries, self.similarity.as_ref())
    }

    /// Rank `candidates` against `input_name`; at most five results, best first.
    pub fn match_entities(&self, input_name: &str, candidates: &[Candidate], threshold: f64) -> Vec<MatchResult> {
        self.match_with_type(input_name, candidates, threshold, None)
    }

    pub fn match_organization(&self, input_name: &str, candidates: &[Candidate], threshold: f64) -> Vec<MatchResult> {
        self.match_entities(input_name, candidates, threshold)
    }

    /// Like [`match_entities`](Self::match_entities), keeping only candidates whose
    /// winning strategy is `only` when a filter is given.
    pub fn match_with_type(
        &self,
        input_name: &str,
        candidates: &[Candidate],
        threshold: f64,
        only: Option<MatchType>,
    ) -> Vec<MatchResult> {
        let start = Instant::now();
        let normalized_input = self.normalize(input_name);
        if normalized_input.is_empty() || candidates.is_empty() {
            return Vec::new();
        }
        let dictionaries = self.dictionaries.snapshot();

        let mut results: Vec<MatchResult> = candidates
            .iter()
            .filter_map(|candidate| {
                let normalized_candidate = self.normalize(candidate.name_or_empty());
                if normalized_candidate.is_empty() {
                    return None;
                }
                let (score, match_type) =
                    self.score_normalized(&normalized_input, &normalized_candidate, &dictionaries);
                if score <= 0.0 || score < threshold {
                    return None;
                }
                if only.is_some_and(|wanted| wanted != match_type) {
                    return None;
                }
                Some(build_result(
                    input_name,
                    candidate,
                    score,
                    match_type,
                    &normalized_input,
                    &normalized_candidate,
                ))
            })
            .collect();

        results.sort_by(MatchResult::rank_cmp);
        results.truncate(MAX_MATCH_RESULTS);

        self.logger.log_match_completion(
            input_name,
            candidates.len(),
            results.len(),
            start.elapsed().as_secs_f64() * 1000.0,
        );
        results
    }

    /// Spelling suggestions for the words of `text`: direct misspelling hits first,
    /// otherwise the closest IT term above the similarity threshold.
    pub fn suggest_correction(&self, text: &str) -> Vec<String> {
        let dictionaries = self.dictionaries.snapshot();
        let mut suggestions: Vec<String> = Vec::new();

        for raw_word in text.split_whitespace() {
            let word = raw_word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.is_empty() {
                continue;
            }

            let suggestion = if let Some(fix) = dictionaries.common_mistakes.get(&word) {
                Some(fix.clone())
            } else if word.chars().count() >= MIN_SUGGESTION_WORD_LEN && !dictionaries.it_terms.contains(&word) {
                dictionaries
                    .it_terms
                    .iter()
                    .map(|term| (term, self.similarity.ratio(&word, term)))
                    .filter(|(_, score)| *score > SUGGESTION_SIMILARITY_THRESHOLD)
                    .fold(None, |best: Option<(&String, f64)>, (term, score)| match best {
                        Some((_, best_score)) if best_score >= score => best,
                        _ => Some((term, score)),
                    })
                    .map(|(term, _)| term.clone())
            } else {
                None
            };

            if let Some(s) = suggestion {
                if !suggestions.contains(&s) {
                    suggestions.push(s);
                }
            }
        }
        suggestions
    }

    /// Re-read all dictionary sources and drop derived caches.
    pub fn reload_dictionaries(&self) -> DictionarySizes {
        let sizes = self.dictionaries.reload();
        {
            let mut memo = self.memo();
            memo.entries.clear();
            memo.generation += 1;
        }
        debug!("Normalization cache cleared after dictionary reload");
        ResolverLogger::new(ResolverComponent::Dictionaries).log_dictionaries_loaded(&sizes);
        sizes
    }
}

pub(crate) fn build_result(
    input_name: &str,
    candidate: &Candidate,
    score: f64,
    match_type: MatchType,
    normalized_input: &str,
    normalized_candidate: &str,
) -> MatchResult {
    let mut metadata = Map::new();
    metadata.insert("normalized_input".to_string(), Value::from(normalized_input));
    metadata.insert("normalized_candidate".to_string(), Value::from(normalized_candidate));
    MatchResult {
        original: input_name.to_string(),
        matched: candidate.name_or_empty().to_string(),
        score,
        match_type,
        confidence: calculate_confidence(score, match_type),
        entity_id: Some(candidate.id.clone()),
        metadata: Some(metadata),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::similarity::StrsimLevenshtein;

    fn matcher() -> FuzzyMatcher {
        FuzzyMatcher::with_dictionaries(Dictionaries::defaults())
    }

    fn single(name: &str) -> Vec<Candidate> {
        vec![Candidate::new("1", name)]
    }

    #[test]
    fn test_exact_match_scenario() {
        let results = matcher().match_organization("Microsoft Corporation", &single("Microsoft Corporation"), 0.7);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);
        assert_eq!(results[0].match_type, MatchType::Exact);
        assert_eq!(results[0].confidence, 1.0);
        assert_eq!(results[0].entity_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_typo_resolves_by_fuzzy_match() {
        let results = matcher().match_organization("Microsft Corporation", &single("Microsoft Corporation"), 0.7);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched, "Microsoft Corporation");
        assert!(results[0].score > 0.85);
        assert_eq!(results[0].match_type, MatchType::Fuzzy);
    }

    #[test]
    fn test_acronym_resolves_via_table() {
        let results = matcher().match_organization("IBM", &single("International Business Machines"), 0.7);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::Acronym);
        assert!(results[0].score >= 0.85);
    }

    #[test]
    fn test_unrelated_input_yields_nothing() {
        let results = matcher().match_organization("totally-unrelated-xyz", &single("Microsoft Corporation"), 0.9);
        assert!(results.is_empty());
    }

    #[test]
    fn test_degenerate_inputs() {
        let m = matcher();
        assert!(m.match_entities("", &single("Acme"), 0.0).is_empty());
        assert!(m.match_entities("   ", &single("Acme"), 0.0).is_empty());
        assert!(m.match_entities("Acme", &[], 0.0).is_empty());
        let with_null = vec![Candidate::unnamed("1"), Candidate::new("2", ""), Candidate::new("3", "Acme")];
        let results = m.match_entities("Acme", &with_null, 0.0);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity_id.as_deref(), Some("3"));
    }

    #[test]
    fn test_top_five_bound_and_ordering() {
        let candidates: Vec<Candidate> = (0..40)
            .map(|i| Candidate::new(i.to_string(), format!("Acme Holdings {}", i)))
            .collect();
        let results = matcher().match_entities("Acme Holdings", &candidates, 0.0);
        assert_eq!(results.len(), 5);
        for pair in results.windows(2) {
            assert_ne!(MatchResult::rank_cmp(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
        }
    }

    #[test]
    fn test_threshold_monotonicity_and_determinism() {
        let m = matcher();
        let candidates = vec![
            Candidate::new("1", "Acme Corporation"),
            Candidate::new("2", "Acme Corp West"),
            Candidate::new("3", "Akme Industries"),
            Candidate::new("4", "Northwind Traders"),
            Candidate::new("5", "ACME"),
        ];
        let mut previous = usize::MAX;
        for step in 0..=10 {
            let threshold = step as f64 / 10.0;
            let first = m.match_entities("acme corp", &candidates, threshold);
            let second = m.match_entities("acme corp", &candidates, threshold);
            assert_eq!(first, second);
            assert!(first.len() <= previous);
            previous = first.len();
        }
    }

    #[test]
    fn test_match_type_filter() {
        let m = matcher();
        let candidates = vec![
            Candidate::new("1", "International Business Machines"),
            Candidate::new("2", "IBM"),
        ];
        let only_acronym = m.match_with_type("IBM", &candidates, 0.5, Some(MatchType::Acronym));
        assert_eq!(only_acronym.len(), 1);
        assert_eq!(only_acronym[0].entity_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_suggest_correction() {
        let m = matcher();
        let suggestions = m.suggest_correction("show the pasword for the firewal at acme");
        assert_eq!(suggestions, vec!["password".to_string(), "firewall".to_string()]);
        assert!(m.suggest_correction("").is_empty());
        assert!(m.suggest_correction("firewall server").is_empty());
    }

    #[test]
    fn test_alias_match_uses_override_dictionary() {
        let mut aliases = std::collections::HashMap::new();
        aliases.insert("Big Blue".to_string(), vec!["International Business Machines".to_string()]);
        let dicts = Dictionaries::merge(None, None, Some(aliases));
        let m = FuzzyMatcher::build(DictionaryStore::fixed(dicts), Arc::new(StrsimLevenshtein), 16);
        let results = m.match_entities("big blue", &single("International Business Machines"), 0.9);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::Exact);
        assert_eq!(results[0].score, 0.95);
    }

    #[test]
    fn test_reload_clears_normalize_cache() {
        let m = matcher();
        m.normalize("Acme Corporation");
        assert_eq!(m.normalize_cache_len(), 1);
        m.reload_dictionaries();
        assert_eq!(m.normalize_cache_len(), 0);
    }

    #[test]
    fn test_normalization_started_before_reload_is_not_memoized() {
        let m = matcher();
        let (hit, generation) = m.memo_lookup("Acme Corporation");
        assert!(hit.is_none());
        m.reload_dictionaries();
        m.memo_store(generation, "Acme Corporation", "stale form");
        assert_eq!(m.normalize_cache_len(), 0);
        assert_eq!(m.normalize("Acme Corporation"), "acme corp");
        assert_eq!(m.normalize_cache_len(), 1);
    }

    #[test]
    fn test_config_selects_similarity_backend() {
        let config = MatcherConfig {
            use_fast_similarity: false,
            ..MatcherConfig::default()
        };
        assert_eq!(FuzzyMatcher::new(&config).similarity().name(), "strsim_levenshtein");
        let fast = FuzzyMatcher::new(&MatcherConfig::default());
        assert_eq!(fast.similarity().name(), "rapidfuzz_levenshtein");
    }
}
