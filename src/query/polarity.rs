//! Polarity axis analysis (§4.6): projects candidate concepts onto the axis
//! spanned by two opposing "pole" concepts, then correlates axis position
//! with grounding strength to distinguish value-laden from descriptive
//! concepts.

use std::collections::{HashSet, VecDeque};

use crate::domain::{cosine_similarity, Concept, ConceptId};
use crate::error::{EngineError, EngineResult};
use crate::storage::GraphStore;

use super::common::concept_grounding_strength;

const MIN_GRADIENT: f32 = 1e-8;
const DIRECTION_THRESHOLD: f32 = 0.3;
const DEFAULT_MAX_CANDIDATES: usize = 20;
const DEFAULT_MAX_HOPS: usize = 1;
const MIN_CORRELATION_SAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionLabel {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PolarityCandidate {
    pub concept_id: ConceptId,
    pub label: String,
    pub position: f32,
    pub orthogonal_distance: f32,
    pub direction: DirectionLabel,
    pub similarity_to_positive: f32,
    pub similarity_to_negative: f32,
    pub grounding_strength: Option<f32>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GroundingCorrelation {
    pub r: f32,
    pub strength: CorrelationStrength,
    pub sample_size: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PolarityAxisResult {
    pub positive_pole: ConceptId,
    pub negative_pole: ConceptId,
    pub candidates: Vec<PolarityCandidate>,
    pub correlation: Option<GroundingCorrelation>,
}

#[derive(Debug, Clone)]
pub struct PolarityAxisRequest {
    pub positive_pole: ConceptId,
    pub negative_pole: ConceptId,
    /// Caller-supplied candidates; when absent, discovered by traversal.
    pub candidates: Option<Vec<ConceptId>>,
    pub max_candidates: usize,
    pub max_hops: usize,
    /// Forwarded-but-inert per §9's resolved open question: the reference
    /// caller passes these to a parallel-discovery path this module does
    /// not implement.
    pub use_parallel: bool,
    pub discovery_slot_pct: Option<f32>,
    pub max_workers: Option<usize>,
    pub chunk_size: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

impl Default for PolarityAxisRequest {
    fn default() -> Self {
        Self {
            positive_pole: ConceptId::from_string(""),
            negative_pole: ConceptId::from_string(""),
            candidates: None,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            max_hops: DEFAULT_MAX_HOPS,
            use_parallel: false,
            discovery_slot_pct: None,
            max_workers: None,
            chunk_size: None,
            timeout_seconds: None,
        }
    }
}

pub fn analyze_polarity_axis(
    store: &dyn GraphStore,
    request: &PolarityAxisRequest,
) -> EngineResult<PolarityAxisResult> {
    let positive = load_pole(store, &request.positive_pole)?;
    let negative = load_pole(store, &request.negative_pole)?;

    let diff: Vec<f32> =
        positive.embedding.iter().zip(negative.embedding.iter()).map(|(p, n)| p - n).collect();
    let gradient = norm(&diff);
    if gradient.abs() < MIN_GRADIENT {
        return Err(EngineError::InvalidInput(
            "poles are too close together to define a polarity axis".to_string(),
        ));
    }
    let axis_vector: Vec<f32> = diff.iter().map(|v| v / gradient).collect();

    let candidate_ids = match &request.candidates {
        Some(ids) => ids.clone(),
        None => discover_candidate_concepts(
            store,
            &request.positive_pole,
            &request.negative_pole,
            request.max_hops.max(1),
            request.max_candidates.max(1),
        )?,
    };

    let mut candidates = Vec::new();
    for id in candidate_ids {
        if id == request.positive_pole || id == request.negative_pole {
            continue;
        }
        let Some(concept) = store.load_concept(&id)? else { continue };
        if concept.embedding.is_empty() {
            continue;
        }
        candidates.push(project_concept(store, &concept, &negative, &axis_vector, gradient, &positive)?);
    }
    candidates.truncate(request.max_candidates.max(1));

    let correlation = pearson_with_grounding(&candidates);

    Ok(PolarityAxisResult {
        positive_pole: request.positive_pole.clone(),
        negative_pole: request.negative_pole.clone(),
        candidates,
        correlation,
    })
}

fn load_pole(store: &dyn GraphStore, id: &ConceptId) -> EngineResult<Concept> {
    let concept =
        store.load_concept(id)?.ok_or_else(|| EngineError::NotFound(format!("concept {}", id.as_str())))?;
    if concept.embedding.is_empty() {
        return Err(EngineError::InvalidInput(format!("concept {} has no embedding", id.as_str())));
    }
    Ok(concept)
}

fn project_concept(
    store: &dyn GraphStore,
    concept: &Concept,
    negative: &Concept,
    axis_vector: &[f32],
    gradient: f32,
    positive: &Concept,
) -> EngineResult<PolarityCandidate> {
    let diff_c: Vec<f32> =
        concept.embedding.iter().zip(negative.embedding.iter()).map(|(c, n)| c - n).collect();
    let scalar = dot(&diff_c, axis_vector);
    let position = 2.0 * (scalar / gradient) - 1.0;

    let projected: Vec<f32> = axis_vector.iter().map(|v| v * scalar).collect();
    let orthogonal: Vec<f32> = diff_c.iter().zip(projected.iter()).map(|(d, p)| d - p).collect();
    let orthogonal_distance = norm(&orthogonal);

    let direction = if position > DIRECTION_THRESHOLD {
        DirectionLabel::Positive
    } else if position < -DIRECTION_THRESHOLD {
        DirectionLabel::Negative
    } else {
        DirectionLabel::Neutral
    };

    let similarity_to_positive = cosine_similarity(&concept.embedding, &positive.embedding);
    let similarity_to_negative = cosine_similarity(&concept.embedding, &negative.embedding);
    let grounding_strength = concept_grounding_strength(store, &concept.concept_id)?;

    Ok(PolarityCandidate {
        concept_id: concept.concept_id.clone(),
        label: concept.label.clone(),
        position,
        orthogonal_distance,
        direction,
        similarity_to_positive,
        similarity_to_negative,
        grounding_strength,
    })
}

/// Graph traversal up to `max_hops` from either pole, matching the
/// reference `discover_candidate_concepts` default of 20 candidates / 1 hop.
fn discover_candidate_concepts(
    store: &dyn GraphStore,
    positive: &ConceptId,
    negative: &ConceptId,
    max_hops: usize,
    max_candidates: usize,
) -> EngineResult<Vec<ConceptId>> {
    let overfetch = max_candidates * 2;
    let mut seen: HashSet<ConceptId> = HashSet::new();
    seen.insert(positive.clone());
    seen.insert(negative.clone());
    let mut found = Vec::new();

    for pole in [positive, negative] {
        let mut frontier = VecDeque::new();
        frontier.push_back((pole.clone(), 0usize));
        while let Some((current, depth)) = frontier.pop_front() {
            if depth >= max_hops || found.len() >= overfetch {
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
                if seen.insert(next.clone()) {
                    found.push(next.clone());
                    if found.len() >= overfetch {
                        break;
                    }
                    frontier.push_back((next, depth + 1));
                }
            }
        }
    }

    found.truncate(max_candidates);
    Ok(found)
}

fn pearson_with_grounding(candidates: &[PolarityCandidate]) -> Option<GroundingCorrelation> {
    let points: Vec<(f32, f32)> = candidates
        .iter()
        .filter_map(|c| c.grounding_strength.map(|g| (c.position, g)))
        .collect();
    if points.len() < MIN_CORRELATION_SAMPLES {
        return None;
    }

    let n = points.len() as f32;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f32>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f32>() / n;

    let mut cov = 0.0f32;
    let mut var_x = 0.0f32;
    let mut var_y = 0.0f32;
    for (x, y) in &points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    let strength = if r.abs() > 0.7 {
        CorrelationStrength::Strong
    } else if r.abs() > 0.4 {
        CorrelationStrength::Moderate
    } else {
        CorrelationStrength::Weak
    };
    Some(GroundingCorrelation { r, strength, sample_size: points.len() })
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreationMethod, OntologyId};
    use crate::storage::{OpenStore, SqliteStore};

    fn concept(ontology: &OntologyId, label: &str, embedding: Vec<f32>) -> Concept {
        let mut c = Concept::new(ontology.clone(), label, CreationMethod::Api);
        c.embedding = embedding;
        c
    }

    #[test]
    fn poles_project_to_plus_and_minus_one() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = OntologyId::from_string("o");
        let positive = concept(&ontology, "Good", vec![1.0, 0.0]);
        let negative = concept(&ontology, "Bad", vec![-1.0, 0.0]);
        let midpoint = concept(&ontology, "Neutral", vec![0.0, 0.0]);
        store.save_concept(&positive).unwrap();
        store.save_concept(&negative).unwrap();
        store.save_concept(&midpoint).unwrap();

        let request = PolarityAxisRequest {
            positive_pole: positive.concept_id.clone(),
            negative_pole: negative.concept_id.clone(),
            candidates: Some(vec![midpoint.concept_id.clone()]),
            ..Default::default()
        };
        let result = analyze_polarity_axis(&store, &request).unwrap();
        assert_eq!(result.candidates.len(), 1);
        assert!((result.candidates[0].position - 0.0).abs() < 1e-4);
        assert_eq!(result.candidates[0].direction, DirectionLabel::Neutral);
    }

    #[test]
    fn degenerate_axis_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = OntologyId::from_string("o");
        let positive = concept(&ontology, "A", vec![1.0, 0.0]);
        let negative = concept(&ontology, "B", vec![1.0, 0.0]);
        store.save_concept(&positive).unwrap();
        store.save_concept(&negative).unwrap();

        let request = PolarityAxisRequest {
            positive_pole: positive.concept_id.clone(),
            negative_pole: negative.concept_id.clone(),
            candidates: Some(vec![]),
            ..Default::default()
        };
        assert!(matches!(analyze_polarity_axis(&store, &request), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn fewer_than_three_grounded_candidates_yields_no_correlation() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ontology = OntologyId::from_string("o");
        let positive = concept(&ontology, "Good", vec![1.0, 0.0]);
        let negative = concept(&ontology, "Bad", vec![-1.0, 0.0]);
        let candidate = concept(&ontology, "C", vec![0.5, 0.5]);
        store.save_concept(&positive).unwrap();
        store.save_concept(&negative).unwrap();
        store.save_concept(&candidate).unwrap();

        let request = PolarityAxisRequest {
            positive_pole: positive.concept_id.clone(),
            negative_pole: negative.concept_id.clone(),
            candidates: Some(vec![candidate.concept_id.clone()]),
            ..Default::default()
        };
        let result = analyze_polarity_axis(&store, &request).unwrap();
        assert!(result.correlation.is_none());
    }
}
