//! Newtype identifiers for every entity in §3.
//!
//! All ids serialize as plain strings (`#[serde(transparent)]`) so that a
//! caller supplying a stable, deterministic id (e.g. a `source_id` derived
//! from a filename) round-trips unchanged. New ids default to a random
//! UUID v4, matching the identifier pattern used throughout the graph layer
//! this crate is built on.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// A new random id (UUID v4).
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Wrap an existing, caller-supplied id.
            pub fn from_string(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(OntologyId, "Sanitized ontology name; doubles as its own id.");
string_id!(SourceId, "Deterministic per-chunk id: `sanitize(filename)_chunk{n}`.");
string_id!(DocumentId, "Id of a `DocumentMeta` provenance record.");
string_id!(ConceptId, "Stable semantic-entity id, content-driven within an ontology.");
string_id!(InstanceId, "Evidence-node id bridging a Concept to a Source.");
string_id!(RelationshipId, "Edge id.");
string_id!(ArtifactId, "Computed-result id.");
string_id!(JobId, "Background job id.");

/// Relationship-vocabulary identifiers are plain uppercase strings validated
/// against `^[A-Z][A-Z0-9_]{0,99}$` (§3, §6) rather than opaque ids, so no
/// newtype wraps them — see [`crate::vocabulary::normalizer::validate_relationship_type`].
pub type VocabTypeName = String;
