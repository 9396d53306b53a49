//! Source and DocumentMeta: per-chunk and per-document provenance (§3).

use serde::{Deserialize, Serialize};

use super::ids::{DocumentId, JobId, OntologyId, SourceId};
use crate::domain::ontology::sanitize_identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Image,
    Synthetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSourceType {
    File,
    Stdin,
    Mcp,
    Api,
    Url,
    Synthetic,
}

/// A chunk of a document as processed by the preprocessor (§4.1) and
/// materialized by the ingestion pipeline (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub source_id: SourceId,
    pub document: OntologyId,
    pub document_id: DocumentId,
    pub paragraph: usize,
    pub full_text: String,
    pub content_type: ContentType,
    pub storage_key: Option<String>,
    pub start_position: usize,
    pub end_position: usize,
    pub content_hash: String,
}

impl Source {
    /// `source_id = sanitize(filename) + "_chunk" + chunk_number` (§4.2 step 1).
    pub fn deterministic_id(filename: &str, chunk_number: usize) -> SourceId {
        SourceId::from_string(format!("{}_chunk{}", sanitize_identifier(filename), chunk_number))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub document_id: DocumentId,
    pub filename: String,
    pub source_type: DocumentSourceType,
    pub hostname: Option<String>,
    pub file_path: Option<String>,
    pub ingested_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub job_id: Option<JobId>,
    pub source_ids: Vec<SourceId>,
}

impl DocumentMeta {
    pub fn source_count(&self) -> usize {
        self.source_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_id_is_stable_across_calls() {
        let a = Source::deterministic_id("My Paper.md", 3);
        let b = Source::deterministic_id("My Paper.md", 3);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "My_Paper.md_chunk3");
    }

    #[test]
    fn deterministic_id_varies_by_chunk_number() {
        let a = Source::deterministic_id("doc.md", 1);
        let b = Source::deterministic_id("doc.md", 2);
        assert_ne!(a, b);
    }
}
