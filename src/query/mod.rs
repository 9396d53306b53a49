//! Query core (§4.6): read-only surfaces over a [`GraphStore`](crate::storage::GraphStore)
//! and [`Embedder`](crate::embedding::Embedder) — semantic concept search, concept
//! details, neighborhood diversity, shortest-path connections, related-concept BFS,
//! polarity-axis projection, and a narrow raw-query pass-through.
//!
//! Every function here is synchronous: storage and embedding are both sync traits,
//! so no async runtime is needed to answer a query.

mod common;
mod details;
mod diversity;
mod path;
mod polarity;
mod raw;
mod related;
mod search;

pub use common::{concept_grounding_strength, sample_evidence};
pub use details::{get_concept_details, ConceptDetails, ConceptDetailsOptions, InstanceWithProvenance, RelationshipView};
pub use diversity::{analyze_diversity, DiversityResult};
pub use path::{find_connection, find_connection_by_search, ConnectionPath, FindConnectionRequest};
pub use polarity::{
    analyze_polarity_axis, CorrelationStrength, DirectionLabel, GroundingCorrelation, PolarityAxisRequest,
    PolarityAxisResult, PolarityCandidate,
};
pub use raw::{execute_raw_query, RawQueryResult};
pub use related::{related_concepts, RelatedConcept, RelatedConceptsRequest};
pub use search::{search_concepts, ConceptSearchHit, SearchConceptsRequest, SearchConceptsResult};
