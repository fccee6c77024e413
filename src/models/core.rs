// src/models/core.rs
use serde::{Deserialize, Serialize};

/// A named entity offered as a possible match target.
///
/// Candidates are supplied fresh by the caller on every call; the resolver never
/// persists them. `name` may be missing in upstream data, so it is optional here
/// and treated as an empty string during matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    pub fn unnamed(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}
