//! The entity model (§3): Ontology, Source, DocumentMeta, Concept, Instance,
//! Relationship, VocabType, VocabCategory, Artifact, Job, and their ids.

pub mod artifact;
pub mod concept;
pub mod ids;
pub mod job;
pub mod ontology;
pub mod relationship;
pub mod source;

pub use artifact::{Artifact, ArtifactPayload, ArtifactRepresentation, ArtifactType, PayloadRoute};
pub use concept::{cosine_similarity, Concept, CreationMethod, Instance};
pub use ids::{
    ArtifactId, ConceptId, DocumentId, InstanceId, JobId, OntologyId, RelationshipId, SourceId,
    VocabTypeName,
};
pub use job::{Job, JobStatus, JobType};
pub use ontology::{sanitize_identifier, Ontology, OntologyState};
pub use relationship::{
    DirectionSemantics, EpistemicStats, EpistemicStatus, MergeDecidedBy, MergeHistoryEntry,
    Relationship, RelationshipCategory, RelationshipSource, VocabCategory, VocabType,
};
pub use source::{ContentType, DocumentMeta, DocumentSourceType, Source};
