// src/matching/strategies.rs
//! The five scoring strategies. Every scorer takes two already-normalized strings,
//! returns a score in `[0, 1]` and yields 0.0 for empty input instead of failing.

use log::warn;
use once_cell::sync::Lazy;
use rphonetic::{DoubleMetaphone, Encoder, Soundex};
use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};

use crate::matching::dictionaries::Dictionaries;
use crate::matching::similarity::{partial_ratio, SimilarityBackend};
use crate::models::MatchType;

pub const EXACT_SCORE: f64 = 1.0;
pub const ALIAS_SCORE: f64 = 0.95;
pub const PHONETIC_PRIMARY_SCORE: f64 = 0.9;
pub const PHONETIC_SECONDARY_SCORE: f64 = 0.85;
pub const PHONETIC_PARTIAL_WEIGHT: f64 = 0.8;
pub const ACRONYM_TABLE_SCORE: f64 = 0.95;
pub const ACRONYM_SYNTHESIZED_SCORE: f64 = 0.85;
pub const PARTIAL_CONTAINMENT_WEIGHT: f64 = 0.9;
pub const PARTIAL_TOKEN_WEIGHT: f64 = 0.8;

static DOUBLE_METAPHONE: Lazy<DoubleMetaphone> = Lazy::new(DoubleMetaphone::default);
static SOUNDEX: Lazy<Soundex> = Lazy::new(Soundex::default);

pub fn exact_score(input: &str, candidate: &str, aliases: &HashMap<String, Vec<String>>) -> f64 {
    if input.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if input == candidate {
        return EXACT_SCORE;
    }
    match aliases.get(input) {
        Some(listed) if listed.iter().any(|alias| alias == candidate) => ALIAS_SCORE,
        _ => 0.0,
    }
}

pub fn fuzzy_score(input: &str, candidate: &str, similarity: &dyn SimilarityBackend) -> f64 {
    if input.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    similarity.ratio(input, candidate).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneticCodes {
    pub primary: String,
    pub secondary: String,
}

/// Metaphone-class primary code plus a Soundex secondary code.
///
/// Returns `None` when the input has nothing encodable or the encoder panics.
pub fn encode_phonetic(text: &str) -> Option<PhoneticCodes> {
    let letters: String = text
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();
    let letters = letters.split_whitespace().collect::<Vec<_>>().join(" ");
    if letters.is_empty() {
        return None;
    }

    let encoded = panic::catch_unwind(AssertUnwindSafe(|| {
        let primary = DOUBLE_METAPHONE.double_metaphone(&letters).primary().to_string();
        let secondary = SOUNDEX.encode(&letters);
        (primary, secondary)
    }));
    match encoded {
        Ok((primary, secondary)) => Some(PhoneticCodes { primary, secondary }),
        Err(_) => {
            warn!("Phonetic encoding failed for {:?}", text);
            None
        }
    }
}

pub fn phonetic_score(input: &str, candidate: &str, similarity: &dyn SimilarityBackend) -> f64 {
    if input.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    let (a, b) = match (encode_phonetic(input), encode_phonetic(candidate)) {
        (Some(a), Some(b)) => (a, b),
        _ => return 0.0,
    };
    if a.primary.is_empty() || b.primary.is_empty() {
        return 0.0;
    }
    if a.primary == b.primary {
        return PHONETIC_PRIMARY_SCORE;
    }
    if !a.secondary.is_empty() && a.secondary == b.secondary {
        return PHONETIC_SECONDARY_SCORE;
    }
    partial_ratio(similarity, &a.primary, &b.primary) * PHONETIC_PARTIAL_WEIGHT
}

/// Table lookup first; otherwise first letters of a multi-word candidate.
///
/// Single-word candidates are only reachable through the table.
pub fn acronym_score(input: &str, candidate: &str, acronyms: &HashMap<String, Vec<String>>) -> f64 {
    if input.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    let key = input.to_lowercase();
    if let Some(expansions) = acronyms.get(&key) {
        if expansions.iter().any(|exp| candidate.contains(exp.as_str())) {
            return ACRONYM_TABLE_SCORE;
        }
    }

    let words: Vec<&str> = candidate.split_whitespace().collect();
    if words.len() >= 2 {
        let synthesized: String = words.iter().filter_map(|w| w.chars().next()).collect();
        if synthesized.to_lowercase() == key {
            return ACRONYM_SYNTHESIZED_SCORE;
        }
    }
    0.0
}

pub fn partial_score(input: &str, candidate: &str) -> f64 {
    if input.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if input.contains(candidate) || candidate.contains(input) {
        let (a, b) = (input.chars().count() as f64, candidate.chars().count() as f64);
        return a.min(b) / a.max(b) * PARTIAL_CONTAINMENT_WEIGHT;
    }

    let input_tokens: HashSet<&str> = input.split_whitespace().collect();
    let candidate_tokens: HashSet<&str> = candidate.split_whitespace().collect();
    let union = input_tokens.union(&candidate_tokens).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = input_tokens.intersection(&candidate_tokens).count();
    intersection as f64 / union as f64 * PARTIAL_TOKEN_WEIGHT
}

/// Confidence weighted by match type, with a small boost for near-perfect scores.
pub fn calculate_confidence(score: f64, match_type: MatchType) -> f64 {
    let mut base = score * match_type.confidence_multiplier();
    if score > 0.95 {
        base = (base * 1.1).min(1.0);
    }
    base.min(1.0)
}

/// Run every strategy and keep the best one; earlier strategies win ties.
pub fn best_strategy(
    input: &str,
    candidate: &str,
    dictionaries: &Dictionaries,
    similarity: &dyn SimilarityBackend,
) -> (f64, MatchType) {
    let mut best = (0.0, MatchType::Exact);
    for match_type in MatchType::STRATEGY_ORDER {
        let score = match match_type {
            MatchType::Exact => exact_score(input, candidate, &dictionaries.company_aliases),
            MatchType::Fuzzy => fuzzy_score(input, candidate, similarity),
            MatchType::Phonetic => phonetic_score(input, candidate, similarity),
            MatchType::Acronym => acronym_score(input, candidate, &dictionaries.acronyms),
            MatchType::Partial => partial_score(input, candidate),
        };
        if score > best.0 {
            best = (score, match_type);
            if score >= EXACT_SCORE {
                break;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::similarity::StrsimLevenshtein;

    #[test]
    fn test_exact_and_alias() {
        let mut aliases = HashMap::new();
        aliases.insert("big blue".to_string(), vec!["ibm".to_string()]);
        assert_eq!(exact_score("acme", "acme", &aliases), 1.0);
        assert_eq!(exact_score("big blue", "ibm", &aliases), ALIAS_SCORE);
        assert_eq!(exact_score("ibm", "big blue", &aliases), 0.0);
        assert_eq!(exact_score("", "", &aliases), 0.0);
    }

    #[test]
    fn test_acronym_table_and_synthesis() {
        let dicts = Dictionaries::defaults();
        assert_eq!(
            acronym_score("ibm", "international business machines", &dicts.acronyms),
            ACRONYM_TABLE_SCORE
        );
        assert_eq!(
            acronym_score("nbc", "northwind brewing co", &dicts.acronyms),
            ACRONYM_SYNTHESIZED_SCORE
        );
        // single-word candidates are only reachable through the table
        assert_eq!(acronym_score("a", "acme", &dicts.acronyms), 0.0);
        assert_eq!(acronym_score("", "acme corp", &dicts.acronyms), 0.0);
    }

    #[test]
    fn test_partial_containment_and_tokens() {
        assert!((partial_score("acme", "acme corp") - 4.0 / 9.0 * 0.9).abs() < 1e-12);
        assert!((partial_score("north acme", "acme north labs") - 2.0 / 3.0 * 0.8).abs() < 1e-12);
        assert_eq!(partial_score("", "acme"), 0.0);
        assert_eq!(partial_score("alpha", "omega"), 0.0);
    }

    #[test]
    fn test_phonetic_sound_alike() {
        let backend = StrsimLevenshtein;
        assert_eq!(phonetic_score("smith", "smyth", &backend), PHONETIC_PRIMARY_SCORE);
        assert_eq!(phonetic_score("", "smyth", &backend), 0.0);
        assert_eq!(phonetic_score("1234", "smyth", &backend), 0.0);
        let unrelated = phonetic_score("zebra", "kitchen", &backend);
        assert!(unrelated < PHONETIC_SECONDARY_SCORE);
    }

    #[test]
    fn test_confidence_formula() {
        assert_eq!(calculate_confidence(1.0, MatchType::Exact), 1.0);
        assert!((calculate_confidence(0.9, MatchType::Fuzzy) - 0.81).abs() < 1e-12);
        assert!((calculate_confidence(0.95, MatchType::Acronym) - 0.8075).abs() < 1e-12);
        assert!((calculate_confidence(0.96, MatchType::Fuzzy) - 0.96 * 0.9 * 1.1).abs() < 1e-12);
        assert!((calculate_confidence(0.8, MatchType::Partial) - 0.56).abs() < 1e-12);
    }

    #[test]
    fn test_all_scorers_stay_in_bounds() {
        let dicts = Dictionaries::defaults();
        let backend = StrsimLevenshtein;
        let samples = ["", "a", "ibm", "microsoft corp", "co 50", "smith & sons", "é ü", "x-y-z"];
        for a in samples {
            for b in samples {
                let scores = [
                    exact_score(a, b, &dicts.company_aliases),
                    fuzzy_score(a, b, &backend),
                    phonetic_score(a, b, &backend),
                    acronym_score(a, b, &dicts.acronyms),
                    partial_score(a, b),
                ];
                for s in scores {
                    assert!((0.0..=1.0).contains(&s), "{a:?} / {b:?} → {s}");
                }
            }
        }
    }
}
