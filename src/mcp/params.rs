//! MCP tool parameter structs with schemars-derived JSON schemas (§6).

use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchConceptsParams {
    #[schemars(description = "Ontology to search within")]
    pub ontology: String,
    #[schemars(description = "Free-text query")]
    pub query: String,
    #[schemars(description = "Maximum hits to return (default 20)")]
    pub limit: Option<usize>,
    #[schemars(description = "Result offset for pagination (default 0)")]
    pub offset: Option<usize>,
    #[schemars(description = "Minimum cosine similarity (default 0.5)")]
    pub min_similarity: Option<f32>,
    #[schemars(description = "Include each hit's grounding strength")]
    pub include_grounding: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConceptDetailsParams {
    #[schemars(description = "Concept id")]
    pub concept_id: String,
    #[schemars(description = "Include grounding strength")]
    pub include_grounding: Option<bool>,
    #[schemars(description = "Include neighborhood diversity analysis")]
    pub include_diversity: Option<bool>,
    #[schemars(description = "Hop radius for diversity analysis (default 1)")]
    pub diversity_max_hops: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RelatedConceptsParams {
    #[schemars(description = "Starting concept id")]
    pub concept_id: String,
    #[schemars(description = "Maximum BFS depth, clamped to [1, 5] (default 2)")]
    pub max_depth: Option<usize>,
    #[schemars(description = "Restrict traversal to these relationship types")]
    pub relationship_types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindConnectionParams {
    #[schemars(description = "Starting concept id")]
    pub from_id: String,
    #[schemars(description = "Target concept id")]
    pub to_id: String,
    #[schemars(description = "Maximum hops, clamped to [1, 10] (default 5)")]
    pub max_hops: Option<usize>,
    #[schemars(description = "Restrict traversal to these relationship types")]
    pub relationship_types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FindConnectionBySearchParams {
    #[schemars(description = "Ontology to resolve phrases within")]
    pub ontology: String,
    #[schemars(description = "Free-text phrase resolved to a starting concept")]
    pub from_query: String,
    #[schemars(description = "Free-text phrase resolved to a target concept")]
    pub to_query: String,
    #[schemars(description = "Maximum hops, clamped to [1, 10] (default 5)")]
    pub max_hops: Option<usize>,
    #[schemars(description = "Minimum similarity for phrase resolution (default 0.5)")]
    pub threshold: Option<f32>,
    #[schemars(description = "Restrict traversal to these relationship types")]
    pub relationship_types: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PolarityAxisParams {
    #[schemars(description = "Concept id anchoring the positive pole")]
    pub positive_pole: String,
    #[schemars(description = "Concept id anchoring the negative pole")]
    pub negative_pole: String,
    #[schemars(description = "Explicit candidate concept ids; discovered by traversal if omitted")]
    pub candidates: Option<Vec<String>>,
    #[schemars(description = "Maximum candidates to project (default 20)")]
    pub max_candidates: Option<usize>,
    #[schemars(description = "Hop radius for auto-discovery (default 1)")]
    pub max_hops: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteQueryParams {
    #[schemars(description = "Relationship type to filter on (validated against the identifier grammar)")]
    pub relationship_type: Option<String>,
    #[schemars(description = "Minimum edge confidence")]
    pub min_confidence: Option<f32>,
    #[schemars(description = "Maximum rows to return")]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SubmitIngestJobParams {
    #[schemars(description = "Target ontology (created if missing is NOT assumed; must already exist)")]
    pub ontology: String,
    #[schemars(description = "Original filename, used to derive deterministic source ids")]
    pub filename: String,
    #[schemars(description = "Document content, base64-encoded")]
    pub content_b64: String,
    #[schemars(description = "Caller identity recorded as the document's ingested_by")]
    pub ingested_by: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct JobIdParams {
    #[schemars(description = "Job id")]
    pub job_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListArtifactsParams {
    #[schemars(description = "Owner id to list artifacts for")]
    pub owner_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ArtifactIdParams {
    #[schemars(description = "Artifact id")]
    pub artifact_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VocabularyListParams {
    #[schemars(description = "Include deprecated (inactive) types")]
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VocabularyMergeParams {
    #[schemars(description = "Type to deprecate")]
    pub deprecated_type: String,
    #[schemars(description = "Type to keep; edges are rewritten onto this type")]
    pub target_type: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VocabularyRestoreParams {
    #[schemars(description = "Deprecated type to reactivate")]
    pub type_name: String,
}
