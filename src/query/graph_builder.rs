// src/query/graph_builder.rs
//! Turns a detected intent plus extracted entities into a parameterized Cypher query.
//!
//! Every query carries the confidence of the organization resolution and the list
//! of names that were fuzzy-matched, so callers can ask for confirmation before
//! executing a low-confidence query.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::matching::matcher::FuzzyMatcher;
use crate::models::{Candidate, MatchType};
use crate::query::enhancer::EnhancedQuery;
use crate::query::QueryIntent;
use crate::utils::constants::{DEFAULT_MATCH_THRESHOLD, UNRESOLVED_ENTITY_CONFIDENCE};
use crate::utils::logging::{ResolverComponent, ResolverLogger};

const DEFAULT_TRAVERSAL_DEPTH: u32 = 3;
const DEFAULT_RECENT_DAYS: i64 = 7;
const DEFAULT_RESULT_LIMIT: i64 = 100;
const MATCH_ANY_PATTERN: &str = "(?i).*";
const NETWORK_CONFIGURATION_TYPES: &[&str] = &["firewall", "router", "switch", "access point", "vpn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    Graph,
    Table,
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyEntityMatch {
    pub entity_type: String,
    pub input: String,
    pub matched: String,
    pub entity_id: Option<String>,
    pub confidence: f64,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQuery {
    pub cypher: String,
    pub parameters: Map<String, Value>,
    pub description: String,
    pub expected_result: ResultShape,
    pub fuzzy_matches: Vec<FuzzyEntityMatch>,
    pub confidence: f64,
}

impl GraphQuery {
    pub fn requires_confirmation(&self, min_confidence: f64) -> bool {
        self.confidence < min_confidence
    }
}

struct OrganizationFilter {
    pattern: String,
    label: String,
    confidence: f64,
    fuzzy_match: Option<FuzzyEntityMatch>,
}

pub struct GraphQueryBuilder {
    matcher: Arc<FuzzyMatcher>,
    threshold: f64,
    max_depth: u32,
    logger: ResolverLogger,
}

impl GraphQueryBuilder {
    pub fn new(matcher: Arc<FuzzyMatcher>) -> Self {
        Self {
            matcher,
            threshold: DEFAULT_MATCH_THRESHOLD,
            max_depth: DEFAULT_TRAVERSAL_DEPTH,
            logger: ResolverLogger::new(ResolverComponent::QueryBuilder),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Build a query for `intent`. `entities` holds raw extracted values (`org`,
    /// `target`, `days`); the organization is resolved against `organizations`.
    pub fn build_query(
        &self,
        intent: QueryIntent,
        entities: &BTreeMap<String, String>,
        organizations: Option<&[Candidate]>,
    ) -> GraphQuery {
        let org = self.resolve_organization(entities, organizations);
        let target = entities
            .get("target")
            .map(|t| t.trim())
            .filter(|t| !t.is_empty());

        let mut parameters = Map::new();
        parameters.insert("org_pattern".to_string(), Value::from(org.pattern.clone()));

        let (cypher, description, shape) = match intent {
            QueryIntent::Dependencies => self.dependencies(&org, target, &mut parameters),
            QueryIntent::ImpactAnalysis => self.impact(&org, target, &mut parameters),
            QueryIntent::ServiceTopology => service_topology(&org),
            QueryIntent::RecentChanges => recent_changes(&org, entities, &mut parameters),
            QueryIntent::CredentialAudit => credential_audit(&org),
            QueryIntent::FindPasswords => find_passwords(&org, target, &mut parameters),
            QueryIntent::NetworkTopology => network_topology(&org, &mut parameters),
            QueryIntent::OrganizationInfo => organization_info(&org),
            QueryIntent::FindConfigurations => catalog_search(&org, Some("Configuration"), &mut parameters),
            QueryIntent::FindDocuments => catalog_search(&org, Some("Document"), &mut parameters),
            QueryIntent::FindLocations => catalog_search(&org, Some("Location"), &mut parameters),
            QueryIntent::ListAssets | QueryIntent::Search => {
                catalog_search(&org, target.and_then(label_for_target), &mut parameters)
            }
        };

        self.logger.log_debug(&format!(
            "Built {} query for {} (confidence {:.2})",
            intent, org.label, org.confidence
        ));
        GraphQuery {
            cypher,
            parameters,
            description,
            expected_result: shape,
            fuzzy_matches: org.fuzzy_match.into_iter().collect(),
            confidence: org.confidence,
        }
    }

    /// Build from an enhancer result; queries without a detected intent become searches.
    pub fn build_from_enhanced(&self, query: &EnhancedQuery, organizations: Option<&[Candidate]>) -> GraphQuery {
        self.build_query(
            query.intent.unwrap_or(QueryIntent::Search),
            &query.extracted,
            organizations,
        )
    }

    fn resolve_organization(
        &self,
        entities: &BTreeMap<String, String>,
        organizations: Option<&[Candidate]>,
    ) -> OrganizationFilter {
        let raw = entities
            .get("org")
            .or_else(|| entities.get("organization"))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());
        let Some(raw) = raw else {
            return OrganizationFilter {
                pattern: MATCH_ANY_PATTERN.to_string(),
                label: "all organizations".to_string(),
                confidence: 1.0,
                fuzzy_match: None,
            };
        };

        let best = organizations.and_then(|candidates| {
            self.matcher
                .match_organization(raw, candidates, self.threshold)
                .into_iter()
                .next()
        });
        match best {
            Some(best) => OrganizationFilter {
                pattern: contains_pattern(&best.matched),
                label: best.matched.clone(),
                confidence: best.confidence,
                fuzzy_match: Some(FuzzyEntityMatch {
                    entity_type: "organization".to_string(),
                    input: raw.to_string(),
                    matched: best.matched,
                    entity_id: best.entity_id,
                    confidence: best.confidence,
                    match_type: best.match_type,
                }),
            },
            None => {
                self.logger.log_warning(&format!(
                    "Organization {:?} not resolved; using raw pattern",
                    raw
                ));
                OrganizationFilter {
                    pattern: contains_pattern(raw),
                    label: raw.to_string(),
                    confidence: UNRESOLVED_ENTITY_CONFIDENCE,
                    fuzzy_match: None,
                }
            }
        }
    }

    fn dependencies(
        &self,
        org: &OrganizationFilter,
        target: Option<&str>,
        parameters: &mut Map<String, Value>,
    ) -> (String, String, ResultShape) {
        parameters.insert("target".to_string(), Value::from(target.unwrap_or("")));
        let cypher = format!(
            "MATCH (o:Organization)-[:HAS_CONFIGURATION]->(c:Configuration) \
             WHERE o.name =~ $org_pattern AND toLower(c.name) CONTAINS toLower($target) \
             MATCH path = (c)-[:DEPENDS_ON*1..{}]->(dep) \
             RETURN c, dep, path",
            self.max_depth
        );
        let description = format!(
            "Dependencies of {} at {}",
            target.unwrap_or("all configurations"),
            org.label
        );
        (cypher, description, ResultShape::Graph)
    }

    fn impact(
        &self,
        org: &OrganizationFilter,
        target: Option<&str>,
        parameters: &mut Map<String, Value>,
    ) -> (String, String, ResultShape) {
        parameters.insert("target".to_string(), Value::from(target.unwrap_or("")));
        let cypher = format!(
            "MATCH (o:Organization)-[:HAS_CONFIGURATION]->(c:Configuration) \
             WHERE o.name =~ $org_pattern AND toLower(c.name) CONTAINS toLower($target) \
             MATCH path = (affected)-[:DEPENDS_ON*1..{}]->(c) \
             RETURN c, affected, length(path) AS distance ORDER BY distance",
            self.max_depth
        );
        let description = format!(
            "What is affected if {} fails at {}",
            target.unwrap_or("any configuration"),
            org.label
        );
        (cypher, description, ResultShape::Graph)
    }
}

fn contains_pattern(name: &str) -> String {
    format!("(?i).*{}.*", regex::escape(name))
}

fn mentions(target: &str, words: &[&str]) -> bool {
    words.iter().any(|w| target.contains(w))
}

fn label_for_target(target: &str) -> Option<&'static str> {
    let target = target.to_lowercase();
    if mentions(&target, &["password", "credential", "login"]) {
        Some("Password")
    } else if mentions(&target, &["doc", "runbook", "procedure"]) {
        Some("Document")
    } else if mentions(&target, &["location", "site", "office"]) {
        Some("Location")
    } else if mentions(
        &target,
        &["config", "server", "device", "switch", "firewall", "router", "printer", "workstation"],
    ) {
        Some("Configuration")
    } else {
        None
    }
}

fn service_topology(org: &OrganizationFilter) -> (String, String, ResultShape) {
    let cypher = "MATCH (o:Organization)-[:HAS_CONFIGURATION]->(c:Configuration) \
                  WHERE o.name =~ $org_pattern \
                  OPTIONAL MATCH (c)-[r:DEPENDS_ON|CONNECTS_TO]->(other:Configuration) \
                  RETURN c, r, other"
        .to_string();
    (cypher, format!("Service topology for {}", org.label), ResultShape::Graph)
}

fn recent_changes(
    org: &OrganizationFilter,
    entities: &BTreeMap<String, String>,
    parameters: &mut Map<String, Value>,
) -> (String, String, ResultShape) {
    let days = entities
        .get("days")
        .and_then(|d| d.trim().parse::<i64>().ok())
        .filter(|d| *d > 0)
        .unwrap_or(DEFAULT_RECENT_DAYS);
    parameters.insert("days".to_string(), json!(days));
    parameters.insert("limit".to_string(), json!(DEFAULT_RESULT_LIMIT));
    let cypher = "MATCH (o:Organization)-[:HAS_CONFIGURATION|HAS_PASSWORD|HAS_DOCUMENT]->(n) \
                  WHERE o.name =~ $org_pattern AND n.updated_at >= datetime() - duration({days: $days}) \
                  RETURN labels(n)[0] AS type, n.name AS name, n.updated_at AS updated_at \
                  ORDER BY n.updated_at DESC LIMIT $limit"
        .to_string();
    (
        cypher,
        format!("Changes at {} in the last {} days", org.label, days),
        ResultShape::Table,
    )
}

/// Metadata only; secret values are never selected.
fn credential_audit(org: &OrganizationFilter) -> (String, String, ResultShape) {
    let cypher = "MATCH (o:Organization)-[:HAS_PASSWORD]->(p:Password) \
                  WHERE o.name =~ $org_pattern \
                  RETURN o.name AS organization, p.name AS credential, p.username AS username, \
                  p.updated_at AS last_rotated ORDER BY p.updated_at ASC"
        .to_string();
    (cypher, format!("Credential audit for {}", org.label), ResultShape::Table)
}

fn find_passwords(
    org: &OrganizationFilter,
    target: Option<&str>,
    parameters: &mut Map<String, Value>,
) -> (String, String, ResultShape) {
    let mut cypher = "MATCH (o:Organization)-[:HAS_PASSWORD]->(p:Password) WHERE o.name =~ $org_pattern".to_string();
    if let Some(target) = target {
        parameters.insert("target".to_string(), Value::from(target));
        cypher.push_str(" AND toLower(p.name) CONTAINS toLower($target)");
    }
    cypher.push_str(" RETURN p.name AS name, p.username AS username, p.url AS url, o.name AS organization");
    let description = match target {
        Some(target) => format!("Password entries for {} at {}", target, org.label),
        None => format!("Password entries at {}", org.label),
    };
    (cypher, description, ResultShape::List)
}

fn network_topology(org: &OrganizationFilter, parameters: &mut Map<String, Value>) -> (String, String, ResultShape) {
    parameters.insert("network_types".to_string(), json!(NETWORK_CONFIGURATION_TYPES));
    let cypher = "MATCH (o:Organization)-[:HAS_CONFIGURATION]->(c:Configuration) \
                  WHERE o.name =~ $org_pattern AND toLower(c.configuration_type) IN $network_types \
                  OPTIONAL MATCH (c)-[r:CONNECTS_TO]-(peer:Configuration) \
                  RETURN c, r, peer"
        .to_string();
    (cypher, format!("Network topology for {}", org.label), ResultShape::Graph)
}

fn organization_info(org: &OrganizationFilter) -> (String, String, ResultShape) {
    let cypher = "MATCH (o:Organization) WHERE o.name =~ $org_pattern \
                  OPTIONAL MATCH (o)-[r]->(n) \
                  RETURN o, type(r) AS relationship, count(n) AS total"
        .to_string();
    (cypher, format!("Overview of {}", org.label), ResultShape::Table)
}

fn catalog_search(
    org: &OrganizationFilter,
    label: Option<&str>,
    parameters: &mut Map<String, Value>,
) -> (String, String, ResultShape) {
    parameters.insert("limit".to_string(), json!(DEFAULT_RESULT_LIMIT));
    let node = match label {
        Some(label) => format!("(n:{})", label),
        None => "(n)".to_string(),
    };
    let cypher = format!(
        "MATCH (o:Organization)-->{} WHERE o.name =~ $org_pattern RETURN n LIMIT $limit",
        node
    );
    let description = format!(
        "{} records at {}",
        label.unwrap_or("All"),
        org.label
    );
    (cypher, description, ResultShape::List)
}
