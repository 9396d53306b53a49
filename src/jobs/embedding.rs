//! Embedding cold-start and regeneration (§4.7): the one-time builtin
//! vocabulary embedding pass on first boot, and operator-triggered batch
//! regeneration jobs.

use serde::{Deserialize, Serialize};

use crate::domain::Job;
use crate::error::{EngineError, EngineResult};

use super::pool::JobContext;
use super::JobOutcome;

/// Find builtin vocabulary types missing an embedding, embed them, and mark
/// the system initialized. Idempotent: a second call is a no-op.
pub fn run_cold_start(ctx: &JobContext) -> EngineResult<serde_json::Value> {
    if ctx.store.is_system_initialized()? {
        return Ok(serde_json::json!({ "already_initialized": true, "embedded": 0 }));
    }

    let mut embedded = 0usize;
    for mut vocab_type in ctx.store.list_vocab_types(true)?.into_iter().filter(|v| v.is_builtin && v.embedding.is_none()) {
        ctx.vocabulary.embed_vocab_type(&mut vocab_type)?;
        embedded += 1;
    }
    ctx.store.mark_system_initialized()?;
    Ok(serde_json::json!({ "already_initialized": false, "embedded": embedded }))
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RegenerationOptions {
    #[serde(default)]
    pub only_missing: bool,
    #[serde(default)]
    pub only_stale: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegenerationReport {
    pub checked: usize,
    pub embedded: usize,
    pub skipped: usize,
}

/// Iterate the vocabulary in usage-count order, regenerating embeddings per
/// `options`. No staleness timestamp is tracked on [`crate::domain::VocabType`],
/// so `only_stale` falls back to regenerating every type — there is nothing
/// else to measure staleness against.
pub fn run_regeneration_job(ctx: &JobContext, options: RegenerationOptions) -> EngineResult<RegenerationReport> {
    let mut vocab_types = ctx.store.list_vocab_types(true)?;
    vocab_types.sort_by_key(|v| v.usage_count);

    let mut report = RegenerationReport::default();
    for mut vocab_type in vocab_types {
        report.checked += 1;
        let needs_regen = if options.only_stale {
            true
        } else {
            vocab_type.embedding.is_none()
        };
        if !needs_regen {
            report.skipped += 1;
            continue;
        }
        ctx.vocabulary.embed_vocab_type(&mut vocab_type)?;
        report.embedded += 1;
    }
    Ok(report)
}

pub fn run_regeneration_job_from_payload(ctx: &JobContext, job: &Job) -> EngineResult<JobOutcome> {
    let options: RegenerationOptions = if job.payload.is_null() {
        RegenerationOptions::default()
    } else {
        serde_json::from_value(job.payload.clone())
            .map_err(|e| EngineError::InvalidInput(format!("malformed regeneration job payload: {e}")))?
    };
    let report = run_regeneration_job(ctx, options)?;
    Ok(JobOutcome::Result(serde_json::to_value(&report)?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::domain::{DirectionSemantics, VocabType};
    use crate::embedding::{Embedder, MockEmbedder};
    use crate::llm::{LlmCapability, MockLlm};
    use crate::storage::{BlobStore, FilesystemBlobStore, GraphStore, OpenStore, SqliteStore};
    use crate::vocabulary::VocabularyManager;

    fn context() -> JobContext {
        let store: Arc<dyn GraphStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let llm: Arc<dyn LlmCapability> = Arc::new(MockLlm::available());
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::default());
        let blob_store: Arc<dyn BlobStore> =
            Arc::new(FilesystemBlobStore::new(tempfile::tempdir().unwrap().into_path()));
        let config = EngineConfig::default();
        let vocabulary =
            Arc::new(VocabularyManager::new(store.clone(), llm.clone(), embedder.clone(), config.vocabulary.clone()));
        JobContext::new(store, llm, embedder, vocabulary, blob_store, config)
    }

    #[test]
    fn cold_start_embeds_builtin_types_once() {
        let ctx = context();
        let vt = VocabType::new_builtin(
            "CAUSES",
            crate::domain::RelationshipCategory::Causal,
            DirectionSemantics::Outward,
        );
        ctx.store.save_vocab_type(&vt).unwrap();

        let first = run_cold_start(&ctx).unwrap();
        assert_eq!(first["embedded"], 1);
        assert!(ctx.store.load_vocab_type("CAUSES").unwrap().unwrap().embedding.is_some());

        let second = run_cold_start(&ctx).unwrap();
        assert_eq!(second["already_initialized"], true);
        assert_eq!(second["embedded"], 0);
    }

    #[test]
    fn regeneration_with_only_missing_skips_already_embedded_types() {
        let ctx = context();
        let mut embedded_type = VocabType::new_llm_generated("ALREADY_EMBEDDED", DirectionSemantics::Outward);
        embedded_type.embedding = Some(vec![1.0, 0.0]);
        ctx.store.save_vocab_type(&embedded_type).unwrap();
        let missing_type = VocabType::new_llm_generated("NEEDS_EMBEDDING", DirectionSemantics::Outward);
        ctx.store.save_vocab_type(&missing_type).unwrap();

        let report = run_regeneration_job(&ctx, RegenerationOptions { only_missing: true, only_stale: false }).unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.embedded, 1);
        assert_eq!(report.skipped, 1);
    }
}
