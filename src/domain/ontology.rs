//! Ontology: the namespace boundary for Concepts, Sources, and projections (§3).

use serde::{Deserialize, Serialize};

use super::ids::OntologyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OntologyState {
    Active,
    Frozen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ontology {
    pub id: OntologyId,
    pub name: String,
    pub state: OntologyState,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Ontology {
    pub fn new(name: impl Into<String>) -> Self {
        let sanitized = sanitize_identifier(&name.into());
        Self {
            id: OntologyId::from_string(sanitized.clone()),
            name: sanitized,
            state: OntologyState::Active,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.state, OntologyState::Frozen)
    }
}

/// Replace any character outside `[A-Za-z0-9._-]` with `_` (§3 invariant,
/// shared by ontology names, source keys, and artifact keys).
pub fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
