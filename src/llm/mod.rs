//! LLM capability: extraction, code/diagram-to-prose translation, and merge
//! judgment (§4.1 step 2, §4.2 step 3, §4.4 step 4). One trait funnels every
//! call site so a subprocess-backed provider or a mock can be swapped in
//! without touching callers, mirroring the teacher's `LlmOrcClient` split.

mod mock;
mod subprocess;

pub use mock::MockLlm;
pub use subprocess::SubprocessLlm;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedConcept {
    pub llm_id: String,
    pub label: String,
    pub search_terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedInstance {
    pub concept_llm_id: String,
    pub quote: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRelationship {
    pub from_llm_id: String,
    pub to_llm_id: String,
    pub relationship_type: String,
    pub confidence: f32,
    pub direction_semantics: String,
}

/// Structured reply to a chunk extraction request (§4.2 step 3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub concepts: Vec<ExtractedConcept>,
    pub instances: Vec<ExtractedInstance>,
    pub relationships: Vec<ExtractedRelationship>,
}

/// Structured reply to an AITL merge judgment request (§4.4 step 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeJudgment {
    pub should_merge: bool,
    pub blended_name: Option<String>,
    pub rationale: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("llm provider not available: {0}")]
    Unavailable(String),
    #[error("llm invocation failed: {0}")]
    InvocationFailed(String),
    #[error("could not parse llm response: {0}")]
    ParseError(String),
    #[error("llm call timed out after {0}s")]
    Timeout(u64),
}

pub type LlmResult<T> = Result<T, LlmError>;

/// Every call the ingestion pipeline, the vocabulary manager, and the
/// preprocessor make to a language model (§4.1, §4.2, §4.4).
#[async_trait]
pub trait LlmCapability: Send + Sync {
    async fn is_available(&self) -> bool;

    /// Extract concepts/instances/relationships from a chunk of text, given
    /// recent-concept context for continuity (§4.2 step 3).
    async fn extract_concepts(
        &self,
        chunk_text: &str,
        context_labels: &[String],
    ) -> LlmResult<ExtractionResult>;

    /// Translate a code/diagram/data block to prose (§4.1 step 2).
    async fn translate_to_prose(&self, language: &str, block_text: &str) -> LlmResult<String>;

    /// Judge whether two vocabulary types should merge, and if so propose a
    /// blended canonical name (§4.4 step 4).
    async fn judge_merge(
        &self,
        type_a: &str,
        type_b: &str,
        similarity: f32,
    ) -> LlmResult<MergeJudgment>;
}
