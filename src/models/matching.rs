// src/models/matching.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Strategy that produced the winning score for a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Phonetic,
    Acronym,
    Partial,
}

impl MatchType {
    /// Fixed evaluation order. Ties between strategies go to the earlier entry.
    pub const STRATEGY_ORDER: [MatchType; 5] = [
        MatchType::Exact,
        MatchType::Fuzzy,
        MatchType::Phonetic,
        MatchType::Acronym,
        MatchType::Partial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Fuzzy => "fuzzy",
            MatchType::Phonetic => "phonetic",
            MatchType::Acronym => "acronym",
            MatchType::Partial => "partial",
        }
    }

    /// Weight applied to the raw score when deriving confidence.
    pub fn confidence_multiplier(&self) -> f64 {
        match self {
            MatchType::Exact => 1.0,
            MatchType::Fuzzy => 0.9,
            MatchType::Acronym => 0.85,
            MatchType::Phonetic => 0.8,
            MatchType::Partial => 0.7,
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(MatchType::Exact),
            "fuzzy" => Ok(MatchType::Fuzzy),
            "phonetic" => Ok(MatchType::Phonetic),
            "acronym" => Ok(MatchType::Acronym),
            "partial" => Ok(MatchType::Partial),
            other => Err(anyhow::anyhow!("Unknown match type: '{}'", other)),
        }
    }
}

/// One resolved candidate for an input name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub original: String,
    pub matched: String,
    pub score: f64,
    pub match_type: MatchType,
    pub confidence: f64,
    pub entity_id: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl MatchResult {
    /// Descending `(score, confidence)` ordering used for ranking.
    pub fn rank_cmp(a: &MatchResult, b: &MatchResult) -> std::cmp::Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    }
}

/// `algorithm_used` for results computed by the matcher core on a cache miss.
pub const ALGO_CORE: &str = "core";
/// `algorithm_used` for results read back from the cache.
pub const ALGO_CACHE: &str = "cache";

/// A match result as returned by the cache layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedMatchResult {
    #[serde(flatten)]
    pub result: MatchResult,
    pub from_cache: bool,
    pub match_time_ms: f64,
    /// Which path produced the result: [`ALGO_CORE`] or [`ALGO_CACHE`].
    pub algorithm_used: String,
}

impl EnhancedMatchResult {
    pub fn fresh(result: MatchResult, match_time_ms: f64) -> Self {
        Self {
            result,
            from_cache: false,
            match_time_ms,
            algorithm_used: ALGO_CORE.to_string(),
        }
    }

    pub fn cached(result: MatchResult, match_time_ms: f64) -> Self {
        Self {
            result,
            from_cache: true,
            match_time_ms,
            algorithm_used: ALGO_CACHE.to_string(),
        }
    }
}

/// A match result produced by the optimized matcher, tagged with the code path used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedMatchResult {
    #[serde(flatten)]
    pub result: MatchResult,
    pub algorithm_used: String,
    pub match_time_ms: f64,
}
