//! Helpers shared by the query surfaces in this module (§4.6).

use crate::domain::{ConceptId, Instance};
use crate::error::EngineResult;
use crate::storage::GraphStore;

/// Mean `avg_grounding` (§4.4's `EdgeTypeScore`, persisted on `VocabType`)
/// over the vocabulary types backing `concept_id`'s incoming relationships,
/// clamped to `[-1, 1]`. `ADR-044`'s own grounding-strength function was not
/// part of the retrieved reference source; this aggregates the one
/// grounding signal this implementation already computes and persists
/// per relationship type (§4.4 `calculate_grounding_contribution`) rather
/// than inventing a second, unrelated formula.
///
/// Returns `None` when the concept has no incoming relationships, or none
/// of them resolve to a scored vocabulary type.
pub fn concept_grounding_strength(
    store: &dyn GraphStore,
    concept_id: &ConceptId,
) -> EngineResult<Option<f32>> {
    let incoming = store.edges_to(concept_id)?;
    if incoming.is_empty() {
        return Ok(None);
    }

    let mut sum = 0.0f32;
    let mut count = 0usize;
    for edge in &incoming {
        if let Some(vocab) = store.load_vocab_type(&edge.relationship_type)? {
            sum += vocab.epistemic_stats.avg_grounding;
            count += 1;
        }
    }
    if count == 0 {
        return Ok(None);
    }
    Ok(Some((sum / count as f32).clamp(-1.0, 1.0)))
}

/// Up to 3 sample instances for a concept, used as search-result evidence (§4.6).
pub fn sample_evidence(store: &dyn GraphStore, concept_id: &ConceptId) -> EngineResult<Vec<Instance>> {
    let mut instances = store.instances_for_concept(concept_id)?;
    instances.truncate(3);
    Ok(instances)
}
