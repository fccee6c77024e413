// src/query/mod.rs
pub mod enhancer;
pub mod graph_builder;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use enhancer::{EnhancedQuery, QueryEnhancer, ResolvedEntity};
pub use graph_builder::{GraphQuery, GraphQueryBuilder, ResultShape};

/// What a free-text question is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    ListAssets,
    FindPasswords,
    FindConfigurations,
    FindDocuments,
    FindLocations,
    OrganizationInfo,
    RecentChanges,
    ImpactAnalysis,
    Dependencies,
    ServiceTopology,
    NetworkTopology,
    CredentialAudit,
    Search,
}

impl QueryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::ListAssets => "list_assets",
            QueryIntent::FindPasswords => "find_passwords",
            QueryIntent::FindConfigurations => "find_configurations",
            QueryIntent::FindDocuments => "find_documents",
            QueryIntent::FindLocations => "find_locations",
            QueryIntent::OrganizationInfo => "organization_info",
            QueryIntent::RecentChanges => "recent_changes",
            QueryIntent::ImpactAnalysis => "impact_analysis",
            QueryIntent::Dependencies => "dependencies",
            QueryIntent::ServiceTopology => "service_topology",
            QueryIntent::NetworkTopology => "network_topology",
            QueryIntent::CredentialAudit => "credential_audit",
            QueryIntent::Search => "search",
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
