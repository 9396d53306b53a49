//! VocabularyConsolidation job handler (§4.4, §4.7): a thin wrapper around
//! the AITL consolidation loop, reporting how many merges ran.

use crate::error::EngineResult;

use super::pool::JobContext;
use super::JobOutcome;

pub async fn run_consolidation_job(ctx: &JobContext) -> EngineResult<JobOutcome> {
    let report = ctx.vocabulary.consolidate().await?;
    let merged = report
        .steps
        .iter()
        .filter(|step| matches!(step, crate::vocabulary::ConsolidationStep::Merged { .. }))
        .count();
    let summary = serde_json::json!({
        "steps": report.steps.len(),
        "merged": merged,
        "final_size": report.final_size,
    });
    Ok(JobOutcome::Result(summary))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::domain::{DirectionSemantics, VocabType};
    use crate::embedding::{Embedder, MockEmbedder};
    use crate::llm::{LlmCapability, MergeJudgment, MockLlm};
    use crate::storage::{BlobStore, FilesystemBlobStore, GraphStore, OpenStore, SqliteStore};
    use crate::vocabulary::VocabularyManager;

    fn context_with_max(vocab_max: usize, llm: MockLlm) -> JobContext {
        let store: Arc<dyn GraphStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        let llm: Arc<dyn LlmCapability> = Arc::new(llm);
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::default());
        let blob_store: Arc<dyn BlobStore> =
            Arc::new(FilesystemBlobStore::new(tempfile::tempdir().unwrap().into_path()));
        let mut config = EngineConfig::default();
        config.vocabulary.vocab_max = vocab_max;
        let vocabulary =
            Arc::new(VocabularyManager::new(store.clone(), llm.clone(), embedder.clone(), config.vocabulary.clone()));
        JobContext::new(store, llm, embedder, vocabulary, blob_store, config)
    }

    #[tokio::test]
    async fn consolidation_job_reports_merges() {
        let llm = MockLlm::available().with_merge_judgment(
            "CAUSES",
            "TRIGGERS",
            MergeJudgment { should_merge: true, blended_name: Some("CAUSES".to_string()), rationale: "synonyms".to_string() },
        );
        let ctx = context_with_max(1, llm);
        let mut a = VocabType::new_llm_generated("CAUSES", DirectionSemantics::Outward);
        a.embedding = Some(vec![1.0, 0.0, 0.0]);
        let mut b = VocabType::new_llm_generated("TRIGGERS", DirectionSemantics::Outward);
        b.embedding = Some(vec![1.0, 0.0, 0.0]);
        ctx.store.save_vocab_type(&a).unwrap();
        ctx.store.save_vocab_type(&b).unwrap();

        let outcome = run_consolidation_job(&ctx).await.unwrap();
        match outcome {
            JobOutcome::Result(value) => {
                assert_eq!(value["merged"], 1);
                assert_eq!(value["final_size"], 1);
            }
            JobOutcome::ResultWithArtifact(..) => panic!("consolidation has no artifact"),
        }
    }
}
