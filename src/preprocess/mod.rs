//! Document preprocessing and semantic chunking (§4.1): parse markdown to
//! typed blocks, translate structured content to prose so extraction never
//! sees graph-query syntax verbatim, then group into bounded chunks.

mod ast;
mod chunker;
mod translate;

use std::sync::Arc;

use crate::config::ChunkingConfig;
use crate::error::EngineResult;
use crate::llm::LlmCapability;

pub use chunker::{BoundaryType, SemanticChunk};

/// Run the full preprocessing pipeline over one document's raw markdown.
pub async fn preprocess_document(
    markdown: &str,
    config: &ChunkingConfig,
    llm: &Arc<dyn LlmCapability>,
) -> EngineResult<Vec<SemanticChunk>> {
    let mut nodes = ast::parse(markdown)?;
    translate::translate_blocks(&mut nodes, llm, config.translation_parallelism).await?;
    for node in nodes.iter_mut() {
        node.word_count = node.rendered.split_whitespace().count();
    }
    Ok(chunker::chunk_nodes(&nodes, config))
}
