// src/cache/keys.rs
use sha2::{Digest, Sha256};

use crate::models::{Candidate, MatchType};

/// Order-insensitive fingerprint of a candidate list, by id.
pub fn candidates_hash(candidates: &[Candidate]) -> String {
    let mut ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();

    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Deterministic key for one match request. The threshold is rounded to four
/// decimals so float noise does not split entries.
pub fn match_key(
    prefix: &str,
    input: &str,
    candidates_hash: &str,
    threshold: f64,
    match_type: Option<MatchType>,
) -> String {
    let type_part = match_type.map(|t| t.as_str()).unwrap_or("all");
    let material = format!("{}|{}|{:.4}|{}", input, candidates_hash, threshold, type_part);
    format!("{}:match:{}", prefix, hex::encode(Sha256::digest(material.as_bytes())))
}

/// Pattern covering every key written under `prefix`.
pub fn namespace_pattern(prefix: &str) -> String {
    format!("{}:*", prefix)
}
