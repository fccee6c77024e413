// src/query/enhancer.rs
//! Free-text query annotation: intent detection, organization resolution and
//! spelling suggestions.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

use crate::matching::matcher::FuzzyMatcher;
use crate::models::{Candidate, MatchResult, MatchType};
use crate::query::QueryIntent;
use crate::utils::constants::DEFAULT_MATCH_THRESHOLD;
use crate::utils::logging::{ResolverComponent, ResolverLogger};

/// Key of the candidate list used to resolve extracted organization names.
pub const ORGANIZATIONS_KEY: &str = "organizations";
/// Key under which the resolved organization appears in [`EnhancedQuery::entities`].
pub const ORGANIZATION_ENTITY: &str = "organization";
const MAX_ALTERNATIVES: usize = 2;

/// Ordered intent patterns; the first match wins, so specific phrasings precede
/// the generic "show X for Y" form. Named groups: `org`, `target`, `days`.
const INTENT_PATTERNS: &[(&str, QueryIntent)] = &[
    (
        r"(?i)^(?:audit|review|check)\s+(?:all\s+)?(?:the\s+)?(?:credentials?|pas+words?)(?:\s+(?:for|at|of)\s+(?P<org>.+?))?\s*\??$",
        QueryIntent::CredentialAudit,
    ),
    (
        r"(?i)^(?:show|find|get|list|what\s+(?:is|are))\s+(?:me\s+)?(?:all\s+)?(?:the\s+)?(?:pas+words?|credentials?|logins?)(?:\s+for\s+(?:the\s+)?(?P<target>.+?))?\s+(?:at|from|in|for)\s+(?P<org>.+?)\s*\??$",
        QueryIntent::FindPasswords,
    ),
    (
        r"(?i)^(?:what\s+(?:is\s+)?(?:the\s+)?impact\s+(?:of|if)|impact\s+of|what\s+breaks\s+if)\s+(?P<target>.+?)(?:\s+(?:at|for|in)\s+(?P<org>.+?))?(?:\s+(?:fails|goes\s+down|is\s+down))?\s*\??$",
        QueryIntent::ImpactAnalysis,
    ),
    (
        r"(?i)^(?:what|which\s+\w+)\s+does\s+(?P<target>.+?)\s+depend\s+on(?:\s+(?:at|for|in)\s+(?P<org>.+?))?\s*\??$",
        QueryIntent::Dependencies,
    ),
    (
        r"(?i)^(?:show\s+(?:me\s+)?)?(?:the\s+)?dependencies\s+(?:of|for)\s+(?P<target>.+?)(?:\s+(?:at|in)\s+(?P<org>.+?))?\s*\??$",
        QueryIntent::Dependencies,
    ),
    (
        r"(?i)^(?:show\s+(?:me\s+)?)?(?:the\s+)?(?:recent|latest)\s+changes(?:\s+(?:at|for|in)\s+(?P<org>.+?))?(?:\s+(?:in|over)\s+the\s+(?:last|past)\s+(?P<days>\d+)\s+days?)?\s*\??$",
        QueryIntent::RecentChanges,
    ),
    (
        r"(?i)^what\s+(?:has\s+)?changed\s+(?:at|for|in)\s+(?P<org>.+?)(?:\s+(?:in|over)\s+the\s+(?:last|past)\s+(?P<days>\d+)\s+days?)?\s*\??$",
        QueryIntent::RecentChanges,
    ),
    (
        r"(?i)^(?:show\s+(?:me\s+)?)?(?:the\s+)?network\s+(?:topology|map|layout|diagram)(?:\s+(?:at|for|of)\s+(?P<org>.+?))?\s*\??$",
        QueryIntent::NetworkTopology,
    ),
    (
        r"(?i)^(?:show\s+(?:me\s+)?)?(?:the\s+)?service\s+(?:topology|map)(?:\s+(?:at|for|of)\s+(?P<org>.+?))?\s*\??$",
        QueryIntent::ServiceTopology,
    ),
    (
        r"(?i)^(?:tell\s+me\s+about|who\s+is|(?:show\s+)?(?:info(?:rmation)?|details)\s+(?:about|on|for))\s+(?P<org>.+?)\s*\??$",
        QueryIntent::OrganizationInfo,
    ),
    (
        r"(?i)^(?:show|find|list|get)\s+(?:me\s+)?(?:all\s+)?(?:the\s+)?(?:configurations?|configs?|devices?|servers?)\s+(?:at|for|from|in)\s+(?P<org>.+?)\s*\??$",
        QueryIntent::FindConfigurations,
    ),
    (
        r"(?i)^(?:show|find|list|get)\s+(?:me\s+)?(?:all\s+)?(?:the\s+)?(?:documents?|docs|documentation)\s+(?:at|for|from|about|in)\s+(?P<org>.+?)\s*\??$",
        QueryIntent::FindDocuments,
    ),
    (
        r"(?i)^(?:show|find|list|get|where\s+are)\s+(?:me\s+)?(?:all\s+)?(?:the\s+)?(?:locations?|sites?|offices?)\s+(?:at|for|of|in)\s+(?P<org>.+?)\s*\??$",
        QueryIntent::FindLocations,
    ),
    (
        r"(?i)^(?:show|list|find|get)\s+(?:me\s+)?(?:all\s+)?(?:the\s+)?(?P<target>[\w\s-]+?)\s+(?:at|for|from|in|of)\s+(?P<org>.+?)\s*\??$",
        QueryIntent::ListAssets,
    ),
];

static COMPILED_PATTERNS: Lazy<Vec<(Regex, QueryIntent)>> = Lazy::new(|| {
    INTENT_PATTERNS
        .iter()
        .filter_map(|(pattern, intent)| match Regex::new(pattern) {
            Ok(re) => Some((re, *intent)),
            Err(e) => {
                warn!("Invalid intent pattern for {}: '{}'. Error: {}", intent, pattern, e);
                None
            }
        })
        .collect()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAlternative {
    pub matched: String,
    pub entity_id: Option<String>,
    pub score: f64,
    pub confidence: f64,
}

/// An extracted name resolved against a candidate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub input: String,
    pub matched: String,
    pub entity_id: Option<String>,
    pub confidence: f64,
    pub match_type: MatchType,
    pub alternatives: Vec<EntityAlternative>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedQuery {
    pub original: String,
    /// `original` with resolved names substituted; equal to it when nothing resolved.
    pub corrected: String,
    pub intent: Option<QueryIntent>,
    /// Raw named-group captures of the winning intent pattern.
    pub extracted: BTreeMap<String, String>,
    pub entities: BTreeMap<String, ResolvedEntity>,
    pub suggestions: Vec<String>,
}

impl EnhancedQuery {
    pub fn organization(&self) -> Option<&ResolvedEntity> {
        self.entities.get(ORGANIZATION_ENTITY)
    }
}

struct IntentDetection {
    intent: QueryIntent,
    extracted: BTreeMap<String, String>,
    org_span: Option<Range<usize>>,
}

fn detect_intent(text: &str) -> Option<IntentDetection> {
    COMPILED_PATTERNS.iter().find_map(|(re, intent)| {
        let caps = re.captures(text)?;
        let mut extracted = BTreeMap::new();
        let mut org_span = None;
        for name in re.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                let value = m.as_str().trim();
                if value.is_empty() {
                    continue;
                }
                if name == "org" {
                    org_span = Some(m.range());
                }
                extracted.insert(name.to_string(), value.to_string());
            }
        }
        Some(IntentDetection {
            intent: *intent,
            extracted,
            org_span,
        })
    })
}

pub struct QueryEnhancer {
    matcher: Arc<FuzzyMatcher>,
    threshold: f64,
    logger: ResolverLogger,
}

impl QueryEnhancer {
    pub fn new(matcher: Arc<FuzzyMatcher>) -> Self {
        Self::with_threshold(matcher, DEFAULT_MATCH_THRESHOLD)
    }

    pub fn with_threshold(matcher: Arc<FuzzyMatcher>, threshold: f64) -> Self {
        Self {
            matcher,
            threshold,
            logger: ResolverLogger::new(ResolverComponent::QueryEnhancer),
        }
    }

    /// Annotate `query_text`. `known_entities` maps an entity type to its candidates;
    /// only the `"organizations"` list is consulted for resolution.
    pub fn enhance_query(&self, query_text: &str, known_entities: &HashMap<String, Vec<Candidate>>) -> EnhancedQuery {
        let mut enhanced = EnhancedQuery {
            original: query_text.to_string(),
            corrected: query_text.to_string(),
            intent: None,
            extracted: BTreeMap::new(),
            entities: BTreeMap::new(),
            suggestions: self.matcher.suggest_correction(query_text),
        };

        let Some(detection) = detect_intent(query_text) else {
            self.logger
                .log_debug(&format!("No intent pattern matched {:?}", query_text));
            return enhanced;
        };
        enhanced.intent = Some(detection.intent);
        enhanced.extracted = detection.extracted;

        let organizations = known_entities.get(ORGANIZATIONS_KEY);
        if let (Some(raw_org), Some(span), Some(organizations)) =
            (enhanced.extracted.get("org"), detection.org_span, organizations)
        {
            if let Some(resolved) = self.resolve(raw_org, organizations) {
                let raw_span = &query_text[span.clone()];
                let offset = raw_span.find(raw_org.as_str()).unwrap_or(0);
                let start = span.start + offset;
                let end = start + raw_org.len();
                enhanced.corrected = format!(
                    "{}{}{}",
                    &query_text[..start],
                    resolved.matched,
                    &query_text[end..]
                );
                enhanced
                    .entities
                    .insert(ORGANIZATION_ENTITY.to_string(), resolved);
            }
        }

        self.logger.log_debug(&format!(
            "Intent {} with {} resolved entities and {} suggestions",
            detection.intent,
            enhanced.entities.len(),
            enhanced.suggestions.len()
        ));
        enhanced
    }

    fn resolve(&self, raw: &str, candidates: &[Candidate]) -> Option<ResolvedEntity> {
        let mut results = self
            .matcher
            .match_organization(raw, candidates, self.threshold)
            .into_iter();
        let best: MatchResult = results.next()?;
        let alternatives = results
            .take(MAX_ALTERNATIVES)
            .map(|r| EntityAlternative {
                matched: r.matched,
                entity_id: r.entity_id,
                score: r.score,
                confidence: r.confidence,
            })
            .collect();
        Some(ResolvedEntity {
            input: raw.to_string(),
            matched: best.matched,
            entity_id: best.entity_id,
            confidence: best.confidence,
            match_type: best.match_type,
            alternatives,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::dictionaries::Dictionaries;

    fn enhancer() -> QueryEnhancer {
        QueryEnhancer::new(Arc::new(FuzzyMatcher::with_dictionaries(Dictionaries::defaults())))
    }

    fn known() -> HashMap<String, Vec<Candidate>> {
        let mut known = HashMap::new();
        known.insert(
            ORGANIZATIONS_KEY.to_string(),
            vec![
                Candidate::new("1", "Microsoft Corporation"),
                Candidate::new("2", "Acme"),
                Candidate::new("3", "Northwind Traders"),
            ],
        );
        known
    }

    #[test]
    fn test_all_intent_patterns_compile() {
        assert_eq!(COMPILED_PATTERNS.len(), INTENT_PATTERNS.len());
    }

    #[test]
    fn test_intent_detection() {
        let cases = [
            ("audit credentials for Acme", QueryIntent::CredentialAudit),
            ("show passwords for Acme", QueryIntent::FindPasswords),
            ("what is the impact of dc01 at Acme?", QueryIntent::ImpactAnalysis),
            ("what does the mail server depend on at Acme", QueryIntent::Dependencies),
            ("recent changes at Acme in the last 3 days", QueryIntent::RecentChanges),
            ("show me the network topology for Acme", QueryIntent::NetworkTopology),
            ("service map for Acme", QueryIntent::ServiceTopology),
            ("tell me about Acme", QueryIntent::OrganizationInfo),
            ("list all configurations at Acme", QueryIntent::FindConfigurations),
            ("find documents about Acme", QueryIntent::FindDocuments),
            ("show the locations of Acme", QueryIntent::FindLocations),
            ("show all printers for Acme", QueryIntent::ListAssets),
        ];
        for (text, expected) in cases {
            let detection = detect_intent(text).unwrap_or_else(|| panic!("no intent for {text:?}"));
            assert_eq!(detection.intent, expected, "{text}");
            assert_eq!(detection.extracted.get("org").map(String::as_str), Some("Acme"), "{text}");
        }
        assert!(detect_intent("hello there").is_none());
    }

    #[test]
    fn test_captures_target_and_days() {
        let d = detect_intent("show the password for the firewall at Acme").unwrap();
        assert_eq!(d.extracted["target"], "firewall");
        let d = detect_intent("what has changed at Acme over the past 14 days").unwrap();
        assert_eq!(d.intent, QueryIntent::RecentChanges);
        assert_eq!(d.extracted["days"], "14");
        let d = detect_intent("show all printers for Acme").unwrap();
        assert_eq!(d.extracted["target"], "printers");
    }

    #[test]
    fn test_resolves_and_rewrites_organization() {
        let q = enhancer().enhance_query("show all configurations for Microsft Corporation", &known());
        assert_eq!(q.intent, Some(QueryIntent::FindConfigurations));
        let org = q.organization().unwrap();
        assert_eq!(org.input, "Microsft Corporation");
        assert_eq!(org.matched, "Microsoft Corporation");
        assert_eq!(org.entity_id.as_deref(), Some("1"));
        assert!(org.alternatives.len() <= MAX_ALTERNATIVES);
        assert_eq!(q.corrected, "show all configurations for Microsoft Corporation");
        assert_eq!(q.original, "show all configurations for Microsft Corporation");
    }

    #[test]
    fn test_unresolved_or_missing_list_keeps_text() {
        let e = enhancer();
        let q = e.enhance_query("tell me about Zzyzx Qwerty", &known());
        assert_eq!(q.intent, Some(QueryIntent::OrganizationInfo));
        assert!(q.entities.is_empty());
        assert_eq!(q.corrected, q.original);

        let q = e.enhance_query("tell me about Microsoft Corporation", &HashMap::new());
        assert!(q.entities.is_empty());
        assert_eq!(q.extracted["org"], "Microsoft Corporation");
    }

    #[test]
    fn test_suggestions_are_independent_of_intent() {
        let e = enhancer();
        let q = e.enhance_query("show the pasword for the firewal at acme", &known());
        assert_eq!(q.intent, Some(QueryIntent::FindPasswords));
        assert_eq!(q.suggestions, vec!["password".to_string(), "firewall".to_string()]);
        assert_eq!(q.organization().unwrap().matched, "Acme");
        assert_eq!(q.corrected, "show the pasword for the firewal at Acme");

        let q = e.enhance_query("pasword", &known());
        assert!(q.intent.is_none());
        assert_eq!(q.suggestions, vec!["password".to_string()]);
        assert_eq!(q.corrected, "pasword");
    }
}
