//! Semantic concept search (§4.6), with the "smart threshold hint" usability
//! contract: when a stringent threshold starves the result set, report what
//! a looser one would have found instead of just returning nothing.

use crate::domain::{cosine_similarity, Concept, OntologyId};
use crate::embedding::{EmbeddingKind, Embedder};
use crate::error::{EngineError, EngineResult};
use crate::storage::GraphStore;

use super::common::concept_grounding_strength;

/// Authoritative lower-threshold floor for the smart hint (§9 resolved:
/// the fixed `0.3` form, not `max(0.4, min_sim - 0.2)`).
const SMART_HINT_FLOOR: f32 = 0.3;
const SMART_HINT_MIN_RESULTS: usize = 3;

#[derive(Debug, Clone)]
pub struct SearchConceptsRequest {
    pub ontology: OntologyId,
    pub query: String,
    pub limit: usize,
    pub offset: usize,
    pub min_similarity: f32,
    pub include_grounding: bool,
}

impl Default for SearchConceptsRequest {
    fn default() -> Self {
        Self {
            ontology: OntologyId::from_string(""),
            query: String::new(),
            limit: 20,
            offset: 0,
            min_similarity: 0.5,
            include_grounding: false,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConceptSearchHit {
    pub concept: Concept,
    pub similarity: f32,
    pub grounding_strength: Option<f32>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchConceptsResult {
    pub hits: Vec<ConceptSearchHit>,
    pub total_above_threshold: usize,
    pub below_threshold_count: Option<usize>,
    pub suggested_threshold: Option<f32>,
    pub preview: Option<ConceptSearchHit>,
}

pub fn search_concepts(
    store: &dyn GraphStore,
    embedder: &dyn Embedder,
    request: &SearchConceptsRequest,
) -> EngineResult<SearchConceptsResult> {
    let query_embedding = embedder
        .embed_one(EmbeddingKind::Concept, &request.query)
        .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;

    let scored: Vec<(Concept, f32)> = store
        .concepts_in_ontology(&request.ontology)?
        .into_iter()
        .filter(|c| !c.embedding.is_empty())
        .map(|c| {
            let similarity = cosine_similarity(&query_embedding, &c.embedding);
            (c, similarity)
        })
        .collect();

    let mut above: Vec<&(Concept, f32)> =
        scored.iter().filter(|(_, s)| *s >= request.min_similarity).collect();
    above.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let total_above_threshold = above.len();

    let mut below_threshold_count = None;
    let mut suggested_threshold = None;
    let mut preview = None;

    if total_above_threshold < SMART_HINT_MIN_RESULTS && request.min_similarity > SMART_HINT_FLOOR {
        let mut lowered: Vec<&(Concept, f32)> = scored
            .iter()
            .filter(|(_, s)| *s >= SMART_HINT_FLOOR && *s < request.min_similarity)
            .collect();
        lowered.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        below_threshold_count = Some(lowered.len());
        if let Some((concept, score)) = lowered.first() {
            suggested_threshold = Some(round2(score - 0.02));
            preview = Some(to_hit(store, concept, *score, request.include_grounding)?);
        }
    }

    let mut hits = Vec::new();
    for (concept, score) in above.into_iter().skip(request.offset).take(request.limit) {
        hits.push(to_hit(store, concept, *score, request.include_grounding)?);
    }

    Ok(SearchConceptsResult { hits, total_above_threshold, below_threshold_count, suggested_threshold, preview })
}

fn to_hit(
    store: &dyn GraphStore,
    concept: &Concept,
    similarity: f32,
    include_grounding: bool,
) -> EngineResult<ConceptSearchHit> {
    let grounding_strength = if include_grounding {
        concept_grounding_strength(store, &concept.concept_id)?
    } else {
        None
    };
    Ok(ConceptSearchHit { concept: concept.clone(), similarity, grounding_strength })
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CreationMethod;
    use crate::embedding::MockEmbedder;
    use crate::storage::{OpenStore, SqliteStore};

    fn concept_with_embedding(ontology: &OntologyId, label: &str, embedding: Vec<f32>) -> Concept {
        let mut c = Concept::new(ontology.clone(), label, CreationMethod::Api);
        c.embedding = embedding;
        c
    }

    #[test]
    fn finds_hits_above_threshold_ordered_by_similarity() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = OntologyId::from_string("o");
        let embedder = MockEmbedder::default();
        let query_vec = embedder.embed_one(EmbeddingKind::Concept, "neural networks").unwrap();

        let close = concept_with_embedding(&ontology, "Neural Networks", query_vec.clone());
        let far = concept_with_embedding(&ontology, "Gardening", vec![0.0; query_vec.len()]);
        store.save_concept(&close).unwrap();
        store.save_concept(&far).unwrap();

        let request = SearchConceptsRequest {
            ontology: ontology.clone(),
            query: "neural networks".to_string(),
            min_similarity: 0.9,
            ..Default::default()
        };
        let result = search_concepts(&store, &embedder, &request).unwrap();
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].concept.label, "Neural Networks");
    }

    /// A unit vector orthogonal to `v` (pairwise 90-degree rotation), so
    /// `alpha * v + beta * orthogonal(v)` with `alpha^2 + beta^2 = 1` is a
    /// unit vector with cosine similarity to `v` of exactly `alpha`.
    fn orthogonal(v: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; v.len()];
        for pair in 0..v.len() / 2 {
            out[2 * pair] = -v[2 * pair + 1];
            out[2 * pair + 1] = v[2 * pair];
        }
        out
    }

    #[test]
    fn smart_hint_reports_below_threshold_preview() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = OntologyId::from_string("o");
        let embedder = MockEmbedder::default();
        let query_vec = embedder.embed_one(EmbeddingKind::Concept, "topic").unwrap();
        let ortho = orthogonal(&query_vec);

        // Exactly 0.6 cosine similarity to the query: above the 0.3 floor,
        // below the 0.95 threshold requested.
        let near_miss_vec: Vec<f32> =
            query_vec.iter().zip(ortho.iter()).map(|(q, o)| 0.6 * q + 0.8 * o).collect();
        let near_miss = concept_with_embedding(&ontology, "Related Topic", near_miss_vec);
        store.save_concept(&near_miss).unwrap();

        let request = SearchConceptsRequest {
            ontology: ontology.clone(),
            query: "topic".to_string(),
            min_similarity: 0.95,
            ..Default::default()
        };
        let result = search_concepts(&store, &embedder, &request).unwrap();
        assert_eq!(result.hits.len(), 0);
        assert!(result.below_threshold_count.unwrap_or(0) >= 1);
        assert!(result.suggested_threshold.is_some());
        assert!(result.preview.is_some());
    }
}
