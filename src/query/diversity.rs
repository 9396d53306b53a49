//! Diversity analysis (§4.6): how semantically varied a concept's
//! neighborhood is, optionally "authenticated" by a grounding-strength sign.

use std::collections::{HashSet, VecDeque};

use crate::domain::{cosine_similarity, Concept, ConceptId};
use crate::error::EngineResult;
use crate::storage::GraphStore;

#[derive(Debug, Clone, serde::Serialize)]
pub struct DiversityResult {
    pub diversity: f32,
    pub neighbor_count: usize,
    /// `sign(grounding_strength) * diversity`, present only when a grounding
    /// signal was supplied.
    pub authenticated_diversity: Option<f32>,
}

/// `1 - mean pairwise cosine similarity` over up to `limit` neighbors within
/// `max_hops`, traversed omnidirectionally (both in- and out-edges,
/// undirected). Returns `None` when fewer than 2 neighbors carry embeddings.
pub fn analyze_diversity(
    store: &dyn GraphStore,
    concept_id: &ConceptId,
    max_hops: usize,
    limit: usize,
    grounding_strength: Option<f32>,
) -> EngineResult<Option<DiversityResult>> {
    let neighbors = collect_neighbors(store, concept_id, max_hops, limit)?;
    let embeddings: Vec<Vec<f32>> =
        neighbors.into_iter().filter(|c| !c.embedding.is_empty()).map(|c| c.embedding).collect();

    if embeddings.len() < 2 {
        return Ok(None);
    }

    let mut sum = 0.0f32;
    let mut pairs = 0usize;
    for i in 0..embeddings.len() {
        for j in (i + 1)..embeddings.len() {
            sum += cosine_similarity(&embeddings[i], &embeddings[j]);
            pairs += 1;
        }
    }
    let mean_similarity = sum / pairs as f32;
    let diversity = 1.0 - mean_similarity;
    let authenticated_diversity = grounding_strength.map(|g| {
        let sign = if g >= 0.0 { 1.0 } else { -1.0 };
        sign * diversity
    });

    Ok(Some(DiversityResult { diversity, neighbor_count: embeddings.len(), authenticated_diversity }))
}

fn collect_neighbors(
    store: &dyn GraphStore,
    start: &ConceptId,
    max_hops: usize,
    limit: usize,
) -> EngineResult<Vec<Concept>> {
    let mut visited: HashSet<ConceptId> = HashSet::new();
    visited.insert(start.clone());
    let mut frontier: VecDeque<(ConceptId, usize)> = VecDeque::new();
    frontier.push_back((start.clone(), 0));
    let mut neighbors = Vec::new();

    while let Some((current, depth)) = frontier.pop_front() {
        if depth >= max_hops || neighbors.len() >= limit {
            continue;
        }
        let mut adjacent: Vec<ConceptId> = store
            .edges_from(&current)?
            .into_iter()
            .map(|r| r.to_concept)
            .chain(store.edges_to(&current)?.into_iter().map(|r| r.from_concept))
            .collect();
        adjacent.sort();
        adjacent.dedup();

        for next in adjacent {
            if visited.insert(next.clone()) {
                if let Some(concept) = store.load_concept(&next)? {
                    neighbors.push(concept);
                }
                if neighbors.len() >= limit {
                    break;
                }
                frontier.push_back((next, depth + 1));
            }
        }
    }

    Ok(neighbors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreationMethod, DirectionSemantics, OntologyId, Relationship, RelationshipCategory, RelationshipSource};
    use crate::storage::{GraphStore as _, OpenStore, SqliteStore};

    fn link(store: &SqliteStore, from: &ConceptId, to: &ConceptId) {
        let relationship = Relationship::new(
            from.clone(),
            to.clone(),
            "RELATES_TO",
            RelationshipCategory::Structural,
            0.9,
            RelationshipSource::HumanCuration,
            "tester",
            DirectionSemantics::Outward,
        );
        store.save_relationship(&relationship).unwrap();
    }

    #[test]
    fn fewer_than_two_embedded_neighbors_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = OntologyId::from_string("o");
        let hub = Concept::new(ontology.clone(), "Hub", CreationMethod::Api);
        store.save_concept(&hub).unwrap();
        assert!(analyze_diversity(&store, &hub.concept_id, 1, 20, None).unwrap().is_none());
    }

    #[test]
    fn diverse_neighbors_yield_higher_diversity_than_similar_ones() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = OntologyId::from_string("o");

        let hub = Concept::new(ontology.clone(), "Hub", CreationMethod::Api);
        store.save_concept(&hub).unwrap();

        let mut a = Concept::new(ontology.clone(), "A", CreationMethod::Api);
        a.embedding = vec![1.0, 0.0, 0.0, 0.0];
        let mut b = Concept::new(ontology.clone(), "B", CreationMethod::Api);
        b.embedding = vec![1.0, 0.0, 0.0, 0.0]; // identical to A: zero diversity
        store.save_concept(&a).unwrap();
        store.save_concept(&b).unwrap();
        link(&store, &hub.concept_id, &a.concept_id);
        link(&store, &hub.concept_id, &b.concept_id);

        let identical = analyze_diversity(&store, &hub.concept_id, 1, 20, None).unwrap().unwrap();
        assert!((identical.diversity - 0.0).abs() < 1e-4);

        let mut c = Concept::new(ontology.clone(), "C", CreationMethod::Api);
        c.embedding = vec![0.0, 1.0, 0.0, 0.0]; // orthogonal to A
        store.delete_concept(&b.concept_id).unwrap();
        store.save_concept(&c).unwrap();
        link(&store, &hub.concept_id, &c.concept_id);

        let diverse = analyze_diversity(&store, &hub.concept_id, 1, 20, None).unwrap().unwrap();
        assert!(diverse.diversity > identical.diversity);
    }

    #[test]
    fn authenticated_diversity_flips_sign_with_negative_grounding() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = OntologyId::from_string("o");
        let hub = Concept::new(ontology.clone(), "Hub", CreationMethod::Api);
        store.save_concept(&hub).unwrap();
        let mut a = Concept::new(ontology.clone(), "A", CreationMethod::Api);
        a.embedding = vec![1.0, 0.0];
        let mut b = Concept::new(ontology.clone(), "B", CreationMethod::Api);
        b.embedding = vec![0.0, 1.0];
        store.save_concept(&a).unwrap();
        store.save_concept(&b).unwrap();
        link(&store, &hub.concept_id, &a.concept_id);
        link(&store, &hub.concept_id, &b.concept_id);

        let result = analyze_diversity(&store, &hub.concept_id, 1, 20, Some(-0.5)).unwrap().unwrap();
        assert_eq!(result.authenticated_diversity, Some(-result.diversity));
    }
}
