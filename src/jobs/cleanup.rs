//! ArtifactCleanup job handler (§4.5, §4.7 "Scheduled cleanup"): delete
//! artifacts past `expires_at`, blob first then row, tolerating orphaned
//! blob keys as a maintenance detail rather than a hard failure.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::ArtifactPayload;
use crate::error::EngineResult;

use super::pool::JobContext;
use super::JobOutcome;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CleanupReport {
    pub expired_found: usize,
    pub deleted: usize,
    pub orphan_errors: usize,
}

pub fn run_cleanup_job(ctx: &JobContext) -> EngineResult<JobOutcome> {
    let now = chrono::Utc::now();
    let expired = ctx.store.expired_artifacts(now)?;
    let mut report = CleanupReport { expired_found: expired.len(), ..Default::default() };

    for artifact in &expired {
        if let ArtifactPayload::Blob { garage_key } = &artifact.payload {
            if let Err(e) = ctx.blob_store.delete(garage_key) {
                warn!("cleanup: failed to delete blob {garage_key}: {e}");
                report.orphan_errors += 1;
            }
        }
        if ctx.store.delete_artifact(&artifact.id)? {
            report.deleted += 1;
        }
    }

    Ok(JobOutcome::Result(serde_json::to_value(&report)?))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::domain::{
        Artifact, ArtifactId, ArtifactRepresentation, ArtifactType, OntologyId,
    };
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

    fn expired_artifact(payload: crate::domain::ArtifactPayload) -> Artifact {
        Artifact {
            id: ArtifactId::new(),
            artifact_type: ArtifactType::QueryResult,
            representation: ArtifactRepresentation::Cli,
            owner_id: "tester".to_string(),
            graph_epoch: 0,
            parameters: serde_json::json!({}),
            metadata: serde_json::json!({}),
            ontology: OntologyId::from_string("ontology-a"),
            concept_ids: Vec::new(),
            payload,
            created_at: chrono::Utc::now() - chrono::Duration::days(2),
            expires_at: Some(chrono::Utc::now() - chrono::Duration::days(1)),
        }
    }

    #[test]
    fn cleanup_deletes_expired_inline_artifact() {
        let ctx = context();
        let artifact = expired_artifact(crate::domain::ArtifactPayload::Inline(serde_json::json!({"ok": true})));
        ctx.store.save_artifact(&artifact).unwrap();

        let outcome = run_cleanup_job(&ctx).unwrap();
        match outcome {
            JobOutcome::Result(value) => {
                assert_eq!(value["expired_found"], 1);
                assert_eq!(value["deleted"], 1);
                assert_eq!(value["orphan_errors"], 0);
            }
            JobOutcome::ResultWithArtifact(..) => panic!("cleanup has no artifact"),
        }
        assert!(ctx.store.load_artifact(&artifact.id).unwrap().is_none());
    }

    #[test]
    fn cleanup_deletes_blob_before_row() {
        let ctx = context();
        let key = crate::storage::FilesystemBlobStore::content_key(b"big payload");
        ctx.blob_store.put(&key, b"big payload").unwrap();
        let artifact = expired_artifact(crate::domain::ArtifactPayload::Blob { garage_key: key.clone() });
        ctx.store.save_artifact(&artifact).unwrap();

        let outcome = run_cleanup_job(&ctx).unwrap();
        match outcome {
            JobOutcome::Result(value) => assert_eq!(value["deleted"], 1),
            JobOutcome::ResultWithArtifact(..) => panic!("cleanup has no artifact"),
        }
        assert!(!ctx.blob_store.exists(&key).unwrap());
        assert!(ctx.store.load_artifact(&artifact.id).unwrap().is_none());
    }

    #[test]
    fn non_expired_artifact_is_left_alone() {
        let ctx = context();
        let mut artifact = expired_artifact(crate::domain::ArtifactPayload::Inline(serde_json::json!({})));
        artifact.expires_at = Some(chrono::Utc::now() + chrono::Duration::days(1));
        ctx.store.save_artifact(&artifact).unwrap();

        let outcome = run_cleanup_job(&ctx).unwrap();
        match outcome {
            JobOutcome::Result(value) => assert_eq!(value["expired_found"], 0),
            JobOutcome::ResultWithArtifact(..) => panic!("cleanup has no artifact"),
        }
    }
}
