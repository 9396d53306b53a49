//! Concept and Instance: the stable semantic nodes and their evidence (§3).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::ids::{ConceptId, InstanceId, OntologyId, SourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationMethod {
    Api,
    Cli,
    Mcp,
    Workstation,
    Import,
    LlmExtraction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub concept_id: ConceptId,
    pub label: String,
    pub description: Option<String>,
    pub search_terms: HashSet<String>,
    pub embedding: Vec<f32>,
    pub ontology: OntologyId,
    pub creation_method: CreationMethod,
    pub access_count: u64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Concept {
    pub fn new(
        ontology: OntologyId,
        label: impl Into<String>,
        creation_method: CreationMethod,
    ) -> Self {
        let label = label.into();
        Self {
            concept_id: ConceptId::new(),
            label,
            description: None,
            search_terms: HashSet::new(),
            embedding: Vec::new(),
            ontology,
            creation_method,
            access_count: 0,
            created_at: chrono::Utc::now(),
        }
    }

    /// `concept_id = source_id + "_" + random8hex` (§4.2 step 4, new-concept path).
    pub fn generated_id(source_id: &SourceId) -> ConceptId {
        let suffix: String = (0..8)
            .map(|_| {
                let n: u8 = rand_hex_nibble();
                std::char::from_digit(n as u32, 16).unwrap()
            })
            .collect();
        ConceptId::from_string(format!("{}_{}", source_id.as_str(), suffix))
    }
}

fn rand_hex_nibble() -> u8 {
    use std::time::{SystemTime, UNIX_EPOCH};
    // Collision resistance here only needs to avoid same-chunk clashes;
    // a full CSPRNG (getrandom) backs the final byte soup.
    let mut buf = [0u8; 1];
    let _ = getrandom::getrandom(&mut buf);
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u8)
        .unwrap_or(0);
    (buf[0] ^ seed) & 0x0F
}

/// Evidence node bridging a Concept to a quoted Source span (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub instance_id: InstanceId,
    pub concept_id: ConceptId,
    pub source_id: SourceId,
    pub quote: String,
}

impl Instance {
    pub fn new(concept_id: ConceptId, source_id: SourceId, quote: impl Into<String>) -> Self {
        Self {
            instance_id: InstanceId::new(),
            concept_id,
            source_id,
            quote: quote.into(),
        }
    }
}

/// Cosine similarity between two equal-length embedding vectors.
///
/// Grounded in the same formula used throughout the embedding-similarity
/// enrichment and vector-store layers: dot product over the product of norms.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let v = vec![0.3, 0.1, 0.9];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn generated_concept_id_is_prefixed_by_source() {
        let source_id = SourceId::from_string("doc.md_chunk1");
        let concept_id = Concept::generated_id(&source_id);
        assert!(concept_id.as_str().starts_with("doc.md_chunk1_"));
    }
}
