//! Related-concepts BFS (§4.6): outward traversal annotated with distance
//! and the relationship-type path taken to reach each concept.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::domain::{Concept, ConceptId, EpistemicStatus};
use crate::error::EngineResult;
use crate::storage::GraphStore;

#[derive(Debug, Clone, Default)]
pub struct RelatedConceptsRequest {
    pub max_depth: usize,
    pub relationship_types: Option<Vec<String>>,
    pub include_epistemic: Option<Vec<EpistemicStatus>>,
    pub exclude_epistemic: Option<Vec<EpistemicStatus>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RelatedConcept {
    pub concept: Concept,
    pub distance: usize,
    pub path_types: Vec<String>,
}

/// BFS outward from `start`, `max_depth` clamped to `[1, 5]` (§4.6). The
/// effective relationship-type filter is the intersection of the explicit
/// `relationship_types` list and the set of types whose epistemic status
/// passes the include/exclude filters.
pub fn related_concepts(
    store: &dyn GraphStore,
    start: &ConceptId,
    request: &RelatedConceptsRequest,
) -> EngineResult<Vec<RelatedConcept>> {
    let max_depth = request.max_depth.clamp(1, 5);
    let type_filter = resolve_type_filter(store, request)?;

    let mut visited: HashSet<ConceptId> = HashSet::new();
    visited.insert(start.clone());
    let mut frontier: VecDeque<(ConceptId, usize, Vec<String>)> = VecDeque::new();
    frontier.push_back((start.clone(), 0, Vec::new()));
    let mut results = Vec::new();

    while let Some((current, depth, path_types)) = frontier.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for edge in store.edges_from(&current)? {
            if let Some(filter) = &type_filter {
                if !filter.contains(&edge.relationship_type) {
                    continue;
                }
            }
            if visited.contains(&edge.to_concept) {
                continue;
            }
            visited.insert(edge.to_concept.clone());

            let mut next_path = path_types.clone();
            next_path.push(edge.relationship_type.clone());

            if let Some(concept) = store.load_concept(&edge.to_concept)? {
                results.push(RelatedConcept { concept, distance: depth + 1, path_types: next_path.clone() });
            }
            frontier.push_back((edge.to_concept, depth + 1, next_path));
        }
    }

    results.sort_by_key(|r| r.distance);
    Ok(results)
}

fn resolve_type_filter(
    store: &dyn GraphStore,
    request: &RelatedConceptsRequest,
) -> EngineResult<Option<HashSet<String>>> {
    let explicit: Option<HashSet<String>> =
        request.relationship_types.as_ref().map(|types| types.iter().cloned().collect());

    let epistemic: Option<HashSet<String>> =
        if request.include_epistemic.is_some() || request.exclude_epistemic.is_some() {
            let vocab = store.list_vocab_types(true)?;
            let set = vocab
                .into_iter()
                .filter(|v| {
                    request
                        .include_epistemic
                        .as_ref()
                        .map(|inc| inc.contains(&v.epistemic_status))
                        .unwrap_or(true)
                })
                .filter(|v| {
                    !request
                        .exclude_epistemic
                        .as_ref()
                        .map(|exc| exc.contains(&v.epistemic_status))
                        .unwrap_or(false)
                })
                .map(|v| v.name)
                .collect();
            Some(set)
        } else {
            None
        };

    Ok(match (explicit, epistemic) {
        (Some(a), Some(b)) => Some(a.intersection(&b).cloned().collect()),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CreationMethod, DirectionSemantics, OntologyId, Relationship, RelationshipCategory, RelationshipSource,
        VocabType,
    };
    use crate::storage::{OpenStore, SqliteStore};

    fn link(store: &SqliteStore, from: &ConceptId, to: &ConceptId, rel_type: &str) {
        let relationship = Relationship::new(
            from.clone(),
            to.clone(),
            rel_type,
            RelationshipCategory::Structural,
            0.9,
            RelationshipSource::HumanCuration,
            "tester",
            DirectionSemantics::Outward,
        );
        store.save_relationship(&relationship).unwrap();
    }

    #[test]
    fn orders_results_by_distance() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = OntologyId::from_string("o");
        let a = Concept::new(ontology.clone(), "A", CreationMethod::Api);
        let b = Concept::new(ontology.clone(), "B", CreationMethod::Api);
        let c = Concept::new(ontology.clone(), "C", CreationMethod::Api);
        store.save_concept(&a).unwrap();
        store.save_concept(&b).unwrap();
        store.save_concept(&c).unwrap();
        link(&store, &a.concept_id, &b.concept_id, "CAUSES");
        link(&store, &b.concept_id, &c.concept_id, "CAUSES");

        let request = RelatedConceptsRequest { max_depth: 5, ..Default::default() };
        let results = related_concepts(&store, &a.concept_id, &request).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].concept.concept_id, b.concept_id);
        assert_eq!(results[1].concept.concept_id, c.concept_id);
        assert_eq!(results[1].path_types, vec!["CAUSES".to_string(), "CAUSES".to_string()]);
    }

    #[test]
    fn epistemic_filter_excludes_contested_types() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = OntologyId::from_string("o");
        let a = Concept::new(ontology.clone(), "A", CreationMethod::Api);
        let b = Concept::new(ontology.clone(), "B", CreationMethod::Api);
        store.save_concept(&a).unwrap();
        store.save_concept(&b).unwrap();

        let mut contested = VocabType::new_builtin("DISPUTES", RelationshipCategory::LogicalTruth, DirectionSemantics::Outward);
        contested.epistemic_status = EpistemicStatus::Contested;
        store.save_vocab_type(&contested).unwrap();
        link(&store, &a.concept_id, &b.concept_id, "DISPUTES");

        let request = RelatedConceptsRequest {
            max_depth: 5,
            exclude_epistemic: Some(vec![EpistemicStatus::Contested]),
            ..Default::default()
        };
        assert!(related_concepts(&store, &a.concept_id, &request).unwrap().is_empty());
    }
}
