// src/matching/normalize.rs
use once_cell::sync::Lazy;
use regex::Regex;

/// Legal-form and common word folds, longest phrase first.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("limited liability company", "llc"),
    ("manufacturing", "mfg"),
    ("incorporated", "inc"),
    ("corporation", "corp"),
    ("associates", "assoc"),
    ("department", "dept"),
    ("brothers", "bros"),
    ("company", "co"),
    ("limited", "ltd"),
];

static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s&-]").unwrap());

/// Upper bound on rewrite passes; a rule set that keeps growing the string stops here.
const MAX_REWRITE_PASSES: usize = 8;

/// Canonical lowercase form of an entity name.
///
/// `mistake_rules` are `(typo, correction)` pairs applied as whole-string substring
/// replacements, so multi-word typos work. Rules run on the cleaned string and are
/// reapplied until nothing changes, so normalizing twice gives the same result.
/// Empty input yields an empty string.
pub fn normalize_entity_name(text: &str, mistake_rules: &[(String, String)]) -> String {
    let mut normalized = clean(&text.to_lowercase());
    for _ in 0..MAX_REWRITE_PASSES {
        if normalized.is_empty() {
            break;
        }
        let rewritten = clean(&apply_rewrites(&normalized, mistake_rules));
        if rewritten == normalized {
            break;
        }
        normalized = rewritten;
    }
    normalized
}

fn apply_rewrites(text: &str, mistake_rules: &[(String, String)]) -> String {
    let mut rewritten = text.to_string();
    for (typo, correction) in mistake_rules {
        if !typo.is_empty() && rewritten.contains(typo.as_str()) {
            rewritten = rewritten.replace(typo.as_str(), correction);
        }
    }
    for (long_form, short_form) in ABBREVIATIONS {
        if rewritten.contains(long_form) {
            rewritten = rewritten.replace(long_form, short_form);
        }
    }
    rewritten
}

/// Drop disallowed punctuation and collapse whitespace runs.
fn clean(text: &str) -> String {
    let stripped = DISALLOWED_CHARS.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
