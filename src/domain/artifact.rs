//! Artifact: computed results with inline/blob size routing (§3, §4.5).

use serde::{Deserialize, Serialize};

use super::ids::{ArtifactId, ConceptId, OntologyId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    PolarityAnalysis,
    Projection,
    QueryResult,
    IngestionReport,
    VocabularyPruningReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRepresentation {
    Cli,
    PolarityExplorer,
    McpServer,
    Api,
}

/// Either `inline_result` or `garage_key` is set, never both (§3 invariant,
/// §8 property 4). Modeled as an enum instead of two `Option` fields so the
/// invariant is encoded in the type rather than checked at the call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArtifactPayload {
    Inline(serde_json::Value),
    Blob { garage_key: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub artifact_type: ArtifactType,
    pub representation: ArtifactRepresentation,
    pub owner_id: String,
    pub graph_epoch: u64,
    pub parameters: serde_json::Value,
    pub metadata: serde_json::Value,
    pub ontology: OntologyId,
    pub concept_ids: Vec<ConceptId>,
    pub payload: ArtifactPayload,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Artifact {
    /// Route `raw` to inline or blob storage per the configured threshold
    /// (§4.5; default 10 KiB). Blob storage itself is performed by the
    /// caller — this only decides inline-vs-blob and, for the blob case,
    /// returns the bytes that must be written under `garage_key`.
    pub fn route_payload(raw: &[u8], threshold_bytes: usize) -> PayloadRoute {
        if raw.len() < threshold_bytes {
            PayloadRoute::Inline
        } else {
            PayloadRoute::Blob
        }
    }

    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadRoute {
    Inline,
    Blob,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_under_threshold_routes_inline() {
        assert_eq!(Artifact::route_payload(&[0u8; 100], 10 * 1024), PayloadRoute::Inline);
    }

    #[test]
    fn payload_at_or_over_threshold_routes_blob() {
        assert_eq!(Artifact::route_payload(&[0u8; 10 * 1024], 10 * 1024), PayloadRoute::Blob);
    }
}
