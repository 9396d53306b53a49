//! Gnosis Graph: a knowledge-graph ingestion and query engine.
//!
//! Documents are chunked, passed through an LLM extraction surface to yield
//! Concepts, Instances and Relationships, embedded for semantic search, and
//! held behind a bounded, self-normalizing relationship vocabulary.
//!
//! # Core Concepts
//!
//! - **Concept**: a stable semantic node, deduplicated via embedding similarity
//! - **Instance**: a quoted span of source evidence backing a Concept
//! - **Relationship**: a directed, typed edge normalized onto a canonical vocabulary
//! - **Ontology**: the namespace boundary bounding Concepts, Sources and vocabulary
//!
//! # Example
//!
//! ```
//! use gnosis_graph::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! assert!(config.vocabulary.vocab_min > 0);
//! ```

pub mod config;
pub mod domain;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod jobs;
pub mod llm;
pub mod mcp;
pub mod preprocess;
pub mod query;
pub mod storage;
pub mod vocabulary;

pub use config::EngineConfig;
pub use domain::{
    Artifact, ArtifactId, ArtifactPayload, ArtifactRepresentation, ArtifactType, Concept,
    ConceptId, ContentType as DocumentContentType, CreationMethod, DirectionSemantics,
    DocumentId, DocumentMeta, DocumentSourceType, EpistemicStats, EpistemicStatus, Instance,
    InstanceId, Job, JobId, JobStatus, JobType, MergeDecidedBy, MergeHistoryEntry, Ontology,
    OntologyId, OntologyState, PayloadRoute, Relationship, RelationshipCategory, RelationshipId,
    RelationshipSource, Source, SourceId, VocabCategory, VocabType, VocabTypeName,
};
pub use embedding::{EmbeddingError, EmbeddingKind, Embedder, MockEmbedder};
pub use engine::Engine;
pub use error::{EngineError, EngineResult, ErrorBody, ErrorKind};
pub use llm::{LlmCapability, LlmError, LlmResult, MockLlm};
pub use storage::{
    BlobStore, EdgeFilter, FilesystemBlobStore, GraphStore, NodeFilter, OpenStore, SqliteStore,
    StorageError, StorageResult, Subgraph,
};
pub use vocabulary::{
    calculate_aggressiveness, normalize, AggressivenessProfileName, AggressivenessThresholds,
    VocabularyManager, VocabularyZone,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
