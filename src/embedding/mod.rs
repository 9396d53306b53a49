//! Embedding worker (§4.7): the single entry point that turns
//! `(kind, text)` into a vector. Every caller — ingestion, the vocabulary
//! manager, and the query core — funnels through one `Embedder`, since a
//! local model on a single device can't serve concurrent `embed()` calls.

mod mock;

pub use mock::MockEmbedder;

#[cfg(feature = "embeddings")]
mod fastembed_impl;
#[cfg(feature = "embeddings")]
pub use fastembed_impl::FastEmbedEmbedder;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingKind {
    Concept,
    VocabularyType,
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding model returned no results")]
    EmptyResult,
    #[error("embedding model error: {0}")]
    ModelError(String),
}

/// Embeds `(kind, text)` pairs into fixed-dimension vectors (§4.7). A single
/// implementation backs concept embedding, vocabulary-type embedding, and
/// query embedding alike.
pub trait Embedder: Send + Sync {
    fn embed_batch(&self, kind: EmbeddingKind, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn embed_one(&self, kind: EmbeddingKind, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut batch = self.embed_batch(kind, &[text])?;
        batch.pop().ok_or(EmbeddingError::EmptyResult)
    }
}
