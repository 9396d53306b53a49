//! Deterministic mock embedder: a stable hash-based vector per text, so
//! tests get reproducible similarity behavior without a model.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::{EmbeddingError, EmbeddingKind, Embedder};

pub struct MockEmbedder {
    dimensions: usize,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(8)
    }
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let bits = hasher.finish();
            vector.push(((bits % 2000) as f32 / 1000.0) - 1.0);
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Embedder for MockEmbedder {
    fn embed_batch(&self, _kind: EmbeddingKind, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_embeds_identically() {
        let embedder = MockEmbedder::default();
        let a = embedder.embed_one(EmbeddingKind::Concept, "neural networks").unwrap();
        let b = embedder.embed_one(EmbeddingKind::Concept, "neural networks").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_text_embeds_differently() {
        let embedder = MockEmbedder::default();
        let a = embedder.embed_one(EmbeddingKind::Concept, "neural networks").unwrap();
        let b = embedder.embed_one(EmbeddingKind::Concept, "linear regression").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_batch_is_empty() {
        let embedder = MockEmbedder::default();
        assert!(embedder.embed_batch(EmbeddingKind::Concept, &[]).unwrap().is_empty());
    }

    #[test]
    fn vectors_are_unit_normalized() {
        let embedder = MockEmbedder::default();
        let v = embedder.embed_one(EmbeddingKind::Concept, "x").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
}
