//! Storage trait definitions: the persistence capability over §3's entities.

use thiserror::Error;

use crate::domain::{
    Artifact, ArtifactId, Concept, ConceptId, DocumentId, DocumentMeta, Instance, InstanceId, Job,
    JobId, MergeHistoryEntry, Ontology, OntologyId, Relationship, RelationshipId, Source, SourceId,
    VocabCategory, VocabType,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ontology not found: {0}")]
    OntologyNotFound(String),

    #[error("concept not found: {0}")]
    ConceptNotFound(String),

    #[error("vocabulary type not found: {0}")]
    VocabTypeNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ontology is frozen: {0}")]
    OntologyFrozen(String),

    #[error("referential integrity violation: {0}")]
    ReferentialIntegrity(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Filter criteria for concept queries.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub ontology: Option<OntologyId>,
    pub creation_method: Option<String>,
    pub limit: Option<usize>,
}

/// Filter criteria for relationship queries.
#[derive(Debug, Clone, Default)]
pub struct EdgeFilter {
    pub relationship_type: Option<String>,
    pub min_confidence: Option<f32>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    pub concepts: Vec<Concept>,
    pub relationships: Vec<Relationship>,
}

/// Persistence capability backing the engine (§1, §9 "singletons → explicit
/// services"). Implementations must be thread-safe and run the multi-step
/// writes named in §5 ("shared-resource policy") inside a single transaction.
pub trait GraphStore: Send + Sync {
    // === Ontology ===
    fn save_ontology(&self, ontology: &Ontology) -> StorageResult<()>;
    fn load_ontology(&self, id: &OntologyId) -> StorageResult<Option<Ontology>>;
    fn delete_ontology(&self, id: &OntologyId) -> StorageResult<bool>;
    fn list_ontologies(&self) -> StorageResult<Vec<Ontology>>;

    // === Source / DocumentMeta ===
    fn save_source(&self, source: &Source) -> StorageResult<()>;
    fn load_source(&self, id: &SourceId) -> StorageResult<Option<Source>>;
    fn save_document_meta(&self, doc: &DocumentMeta) -> StorageResult<()>;
    fn load_document_meta(&self, id: &DocumentId) -> StorageResult<Option<DocumentMeta>>;

    // === Concept ===
    fn save_concept(&self, concept: &Concept) -> StorageResult<()>;
    fn load_concept(&self, id: &ConceptId) -> StorageResult<Option<Concept>>;
    fn delete_concept(&self, id: &ConceptId) -> StorageResult<bool>;
    fn find_concepts(&self, filter: &NodeFilter) -> StorageResult<Vec<Concept>>;
    fn concepts_in_ontology(&self, ontology: &OntologyId) -> StorageResult<Vec<Concept>>;
    fn increment_access_count(&self, id: &ConceptId) -> StorageResult<()>;

    // === Instance ===
    fn save_instance(&self, instance: &Instance) -> StorageResult<()>;
    fn instances_for_concept(&self, concept_id: &ConceptId) -> StorageResult<Vec<Instance>>;
    fn instances_for_source(&self, source_id: &SourceId) -> StorageResult<Vec<Instance>>;

    // === Relationship ===
    fn save_relationship(&self, relationship: &Relationship) -> StorageResult<()>;
    fn load_relationship(&self, id: &RelationshipId) -> StorageResult<Option<Relationship>>;
    fn edges_from(&self, concept_id: &ConceptId) -> StorageResult<Vec<Relationship>>;
    fn edges_to(&self, concept_id: &ConceptId) -> StorageResult<Vec<Relationship>>;
    fn find_relationships(&self, filter: &EdgeFilter) -> StorageResult<Vec<Relationship>>;
    /// Rewrite every edge labeled `from_type` to `to_type` (§4.4 step 5).
    /// Must run as a single transaction: partial rewrite is never observable.
    fn rewrite_relationship_type(&self, from_type: &str, to_type: &str) -> StorageResult<u64>;

    // === Vocabulary ===
    fn save_vocab_type(&self, vocab_type: &VocabType) -> StorageResult<()>;
    fn load_vocab_type(&self, name: &str) -> StorageResult<Option<VocabType>>;
    fn list_vocab_types(&self, include_inactive: bool) -> StorageResult<Vec<VocabType>>;
    fn save_vocab_category(&self, category: &VocabCategory) -> StorageResult<()>;
    fn append_merge_history(&self, entry: &MergeHistoryEntry) -> StorageResult<()>;
    fn list_merge_history(&self) -> StorageResult<Vec<MergeHistoryEntry>>;

    // === Artifact ===
    fn save_artifact(&self, artifact: &Artifact) -> StorageResult<()>;
    fn load_artifact(&self, id: &ArtifactId) -> StorageResult<Option<Artifact>>;
    fn delete_artifact(&self, id: &ArtifactId) -> StorageResult<bool>;
    fn list_artifacts(&self, owner_id: &str) -> StorageResult<Vec<Artifact>>;
    fn expired_artifacts(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> StorageResult<Vec<Artifact>>;

    // === Job ===
    fn save_job(&self, job: &Job) -> StorageResult<()>;
    fn load_job(&self, id: &JobId) -> StorageResult<Option<Job>>;
    fn jobs_by_status(&self, status: crate::domain::JobStatus) -> StorageResult<Vec<Job>>;
    /// Persist a completed job alongside the artifact it produced in one
    /// transaction (§4.7: artifact creation and the job status update that
    /// records `artifact_id` must never be observed separately).
    fn complete_job_with_artifact(&self, job: &Job, artifact: &Artifact) -> StorageResult<()>;

    /// Monotone data-version counter, bumped on every committed write, used
    /// by the engine's in-process cache for coherence (§5 ambient note).
    fn data_version(&self) -> StorageResult<u64>;

    /// Whether the one-time builtin-vocabulary embedding cold-start (§4.7)
    /// has already run against this store.
    fn is_system_initialized(&self) -> StorageResult<bool>;
    /// Mark the cold-start complete. Idempotent.
    fn mark_system_initialized(&self) -> StorageResult<()>;
}

/// Extension trait for opening stores from a filesystem path or in-memory.
pub trait OpenStore: GraphStore + Sized {
    fn open(path: impl AsRef<std::path::Path>) -> StorageResult<Self>;
    fn open_in_memory() -> StorageResult<Self>;
}
