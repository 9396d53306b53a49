//! Pathfinding (§4.6): shortest connections between two concepts, and the
//! `connect-by-search` surface that resolves free-text phrases to concepts
//! first.

use std::collections::{HashMap, VecDeque};

use crate::domain::{cosine_similarity, Concept, ConceptId, OntologyId, Relationship};
use crate::embedding::{EmbeddingKind, Embedder};
use crate::error::{EngineError, EngineResult};
use crate::storage::GraphStore;

const MAX_PATHS: usize = 5;
const NEAR_MISS_FLOOR: f32 = 0.3;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectionPath {
    pub concepts: Vec<ConceptId>,
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone)]
pub struct FindConnectionRequest {
    pub from: ConceptId,
    pub to: ConceptId,
    pub max_hops: usize,
    pub relationship_types: Option<Vec<String>>,
}

/// Up to 5 shortest paths between `from` and `to` (§4.6). Traverses edges
/// undirectedly (both `edges_from` and `edges_to`) and applies the
/// relationship-type filter, if any, per edge during expansion.
pub fn find_connection(store: &dyn GraphStore, request: &FindConnectionRequest) -> EngineResult<Vec<ConnectionPath>> {
    let max_hops = request.max_hops.clamp(1, 10);
    if request.from == request.to {
        return Ok(Vec::new());
    }

    let mut distance: HashMap<ConceptId, usize> = HashMap::new();
    let mut parents: HashMap<ConceptId, Vec<(ConceptId, Relationship)>> = HashMap::new();
    distance.insert(request.from.clone(), 0);
    let mut frontier = VecDeque::new();
    frontier.push_back(request.from.clone());
    let mut target_depth: Option<usize> = None;

    while let Some(current) = frontier.pop_front() {
        let depth = distance[&current];
        if let Some(td) = target_depth {
            if depth >= td {
                break;
            }
        }
        if depth >= max_hops {
            continue;
        }

        for edge in adjacent_edges(store, &current)? {
            if let Some(types) = &request.relationship_types {
                if !types.contains(&edge.relationship_type) {
                    continue;
                }
            }
            let neighbor = other_end(&edge, &current);
            let next_depth = depth + 1;
            match distance.get(&neighbor) {
                None => {
                    distance.insert(neighbor.clone(), next_depth);
                    parents.entry(neighbor.clone()).or_default().push((current.clone(), edge.clone()));
                    frontier.push_back(neighbor.clone());
                    if neighbor == request.to {
                        target_depth = Some(next_depth);
                    }
                }
                Some(&d) if d == next_depth => {
                    parents.entry(neighbor.clone()).or_default().push((current.clone(), edge.clone()));
                }
                _ => {}
            }
        }
    }

    if target_depth.is_none() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    enumerate_paths(&request.to, &parents, &mut Vec::new(), &mut paths);
    paths.truncate(MAX_PATHS);
    Ok(paths)
}

fn adjacent_edges(store: &dyn GraphStore, node: &ConceptId) -> EngineResult<Vec<Relationship>> {
    let mut edges = store.edges_from(node)?;
    edges.extend(store.edges_to(node)?);
    Ok(edges)
}

fn other_end(edge: &Relationship, from: &ConceptId) -> ConceptId {
    if &edge.from_concept == from {
        edge.to_concept.clone()
    } else {
        edge.from_concept.clone()
    }
}

fn enumerate_paths(
    node: &ConceptId,
    parents: &HashMap<ConceptId, Vec<(ConceptId, Relationship)>>,
    acc: &mut Vec<(ConceptId, Relationship)>,
    paths: &mut Vec<ConnectionPath>,
) {
    if paths.len() >= MAX_PATHS {
        return;
    }
    match parents.get(node) {
        None => {
            let mut concepts = vec![node.clone()];
            let mut relationships = Vec::new();
            for (concept, edge) in acc.iter().rev() {
                concepts.push(concept.clone());
                relationships.push(edge.clone());
            }
            paths.push(ConnectionPath { concepts, relationships });
        }
        Some(edges) => {
            for (parent, edge) in edges {
                if paths.len() >= MAX_PATHS {
                    break;
                }
                acc.push((node.clone(), edge.clone()));
                enumerate_paths(parent, parents, acc, paths);
                acc.pop();
            }
        }
    }
}

/// Resolves a free-text phrase to its best-matching concept before
/// pathfinding (§4.6 `connect-by-search`).
#[allow(clippy::too_many_arguments)]
pub fn find_connection_by_search(
    store: &dyn GraphStore,
    embedder: &dyn Embedder,
    ontology: &OntologyId,
    from_query: &str,
    to_query: &str,
    max_hops: usize,
    threshold: f32,
    relationship_types: Option<Vec<String>>,
) -> EngineResult<Vec<ConnectionPath>> {
    let candidates = store.concepts_in_ontology(ontology)?;
    let from_concept = resolve_phrase(embedder, &candidates, from_query, threshold)?;
    let to_concept = resolve_phrase(embedder, &candidates, to_query, threshold)?;

    find_connection(
        store,
        &FindConnectionRequest {
            from: from_concept,
            to: to_concept,
            max_hops,
            relationship_types,
        },
    )
}

fn resolve_phrase(
    embedder: &dyn Embedder,
    candidates: &[Concept],
    query: &str,
    threshold: f32,
) -> EngineResult<ConceptId> {
    let query_embedding = embedder
        .embed_one(EmbeddingKind::Concept, query)
        .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;

    let mut best: Option<(&Concept, f32)> = None;
    for candidate in candidates {
        if candidate.embedding.is_empty() {
            continue;
        }
        let similarity = cosine_similarity(&query_embedding, &candidate.embedding);
        if best.as_ref().map(|(_, b)| similarity > *b).unwrap_or(true) {
            best = Some((candidate, similarity));
        }
    }

    match best {
        Some((concept, similarity)) if similarity >= threshold => Ok(concept.concept_id.clone()),
        Some((_, similarity)) if similarity >= NEAR_MISS_FLOOR => Err(EngineError::NotFound(format!(
            "no concept matched \"{query}\" above threshold {threshold}; suggested_threshold={:.2}",
            similarity - 0.02
        ))),
        _ => Err(EngineError::NotFound(format!("no concept matched \"{query}\""))),
    }
}
