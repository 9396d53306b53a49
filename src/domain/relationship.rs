//! Relationship (edge) and the vocabulary entities it is typed against (§3).

use serde::{Deserialize, Serialize};

use super::ids::{ConceptId, DocumentId, RelationshipId, VocabTypeName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipCategory {
    LogicalTruth,
    Causal,
    Structural,
    Temporal,
    Comparative,
    Functional,
    Definitional,
    Similarity,
    Evidential,
    LlmGenerated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipSource {
    LlmExtraction,
    ApiCreation,
    HumanCuration,
    Import,
    Inference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionSemantics {
    Outward,
    Inward,
    Bidirectional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub relationship_id: RelationshipId,
    pub from_concept: ConceptId,
    pub to_concept: ConceptId,
    pub relationship_type: VocabTypeName,
    pub category: RelationshipCategory,
    pub confidence: f32,
    pub source: RelationshipSource,
    pub created_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub document_id: Option<DocumentId>,
    pub direction_semantics: DirectionSemantics,
}

impl Relationship {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        from_concept: ConceptId,
        to_concept: ConceptId,
        relationship_type: impl Into<String>,
        category: RelationshipCategory,
        confidence: f32,
        source: RelationshipSource,
        created_by: impl Into<String>,
        direction_semantics: DirectionSemantics,
    ) -> Self {
        Self {
            relationship_id: RelationshipId::new(),
            from_concept,
            to_concept,
            relationship_type: relationship_type.into(),
            category,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            created_by: created_by.into(),
            created_at: chrono::Utc::now(),
            document_id: None,
            direction_semantics,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EpistemicStatus {
    Affirmative,
    Contested,
    Contradictory,
    Historical,
    InsufficientData,
    Unclassified,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpistemicStats {
    pub avg_grounding: f32,
}

/// Canonical relationship-vocabulary entry (§3). `name` doubles as the
/// primary key — relationship types are validated strings, not opaque ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabType {
    pub name: VocabTypeName,
    pub category: RelationshipCategory,
    pub description: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub is_builtin: bool,
    pub is_active: bool,
    pub usage_count: u64,
    pub epistemic_status: EpistemicStatus,
    pub epistemic_stats: EpistemicStats,
    pub direction_semantics: DirectionSemantics,
}

impl VocabType {
    pub fn new_builtin(
        name: impl Into<String>,
        category: RelationshipCategory,
        direction_semantics: DirectionSemantics,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            description: None,
            embedding: None,
            is_builtin: true,
            is_active: true,
            usage_count: 0,
            epistemic_status: EpistemicStatus::Unclassified,
            epistemic_stats: EpistemicStats::default(),
            direction_semantics,
        }
    }

    pub fn new_llm_generated(name: impl Into<String>, direction_semantics: DirectionSemantics) -> Self {
        Self {
            name: name.into(),
            category: RelationshipCategory::LlmGenerated,
            description: None,
            embedding: None,
            is_builtin: false,
            is_active: true,
            usage_count: 0,
            epistemic_status: EpistemicStatus::Unclassified,
            epistemic_stats: EpistemicStats::default(),
            direction_semantics,
        }
    }
}

/// Grouping node: `VocabType →IN_CATEGORY→ VocabCategory` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabCategory {
    pub name: String,
    pub description: Option<String>,
}

/// Append-only audit record of an executed vocabulary merge (SPEC_FULL.md §3,
/// supplemented from the original source's merge-history logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeDecidedBy {
    Llm,
    Heuristic,
    Human,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeHistoryEntry {
    pub deprecated_type: VocabTypeName,
    pub target_type: VocabTypeName,
    pub similarity: f32,
    pub edges_rewritten: u64,
    pub decided_by: MergeDecidedBy,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_confidence_is_clamped() {
        let r = Relationship::new(
            ConceptId::new(),
            ConceptId::new(),
            "CAUSES",
            RelationshipCategory::Causal,
            1.5,
            RelationshipSource::LlmExtraction,
            "tester",
            DirectionSemantics::Outward,
        );
        assert_eq!(r.confidence, 1.0);
    }

    #[test]
    fn builtin_vocab_type_starts_active() {
        let v = VocabType::new_builtin("CAUSES", RelationshipCategory::Causal, DirectionSemantics::Outward);
        assert!(v.is_active);
        assert!(v.is_builtin);
    }
}
