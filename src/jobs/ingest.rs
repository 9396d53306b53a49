//! Ingestion job handler (§4.2, §4.7, §6 `submit_ingest_job`): decode a
//! submitted document, run it through preprocessing and the ingestion
//! pipeline, and report an `IngestionReport` artifact.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Artifact, ArtifactId, ArtifactPayload, ArtifactRepresentation, ArtifactType, DocumentId,
    DocumentMeta, DocumentSourceType, Job, OntologyId,
};
use crate::error::{EngineError, EngineResult};
use crate::ingestion::{IngestionPipeline, IngestionStats};
use crate::preprocess::preprocess_document;

use super::pool::JobContext;
use super::JobOutcome;

/// Submission payload for an [`crate::domain::JobType::Ingestion`] job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJobRequest {
    pub ontology: String,
    pub filename: String,
    pub content_b64: String,
    #[serde(default = "default_source_type")]
    pub source_type: DocumentSourceType,
    pub ingested_by: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
}

fn default_source_type() -> DocumentSourceType {
    DocumentSourceType::Api
}

pub async fn run_ingest_job(ctx: &JobContext, job: &Job) -> EngineResult<JobOutcome> {
    let request: IngestJobRequest = serde_json::from_value(job.payload.clone())
        .map_err(|e| EngineError::InvalidInput(format!("malformed ingest job payload: {e}")))?;

    let raw = base64::engine::general_purpose::STANDARD
        .decode(request.content_b64.as_bytes())
        .map_err(|e| EngineError::InvalidInput(format!("content_b64 is not valid base64: {e}")))?;
    let markdown = String::from_utf8(raw)
        .map_err(|e| EngineError::InvalidInput(format!("ingest content is not valid utf-8: {e}")))?;

    let ontology_id = OntologyId::from_string(request.ontology.clone());
    if ctx.store.load_ontology(&ontology_id)?.is_none() {
        return Err(EngineError::NotFound(format!("ontology not found: {}", request.ontology)));
    }

    let chunks = preprocess_document(&markdown, &ctx.config.chunking, &ctx.llm).await?;

    let mut document = DocumentMeta {
        document_id: DocumentId::new(),
        filename: request.filename.clone(),
        source_type: request.source_type,
        hostname: request.hostname.clone(),
        file_path: request.file_path.clone(),
        ingested_by: request.ingested_by.clone(),
        created_at: chrono::Utc::now(),
        job_id: Some(job.job_id.clone()),
        source_ids: Vec::new(),
    };

    let pipeline = IngestionPipeline::new(
        ctx.store.clone(),
        ctx.llm.clone(),
        ctx.embedder.clone(),
        ctx.vocabulary.clone(),
        ctx.config.ingestion.clone(),
    );
    let stats = pipeline.ingest_document(&ontology_id, &mut document, &chunks).await?;

    let result = serde_json::to_value(&stats)?;
    let artifact = build_report_artifact(ctx, job, &ontology_id, &stats)?;
    Ok(JobOutcome::ResultWithArtifact(result, artifact))
}

fn build_report_artifact(
    ctx: &JobContext,
    job: &Job,
    ontology: &OntologyId,
    stats: &IngestionStats,
) -> EngineResult<Artifact> {
    Ok(Artifact {
        id: ArtifactId::new(),
        artifact_type: ArtifactType::IngestionReport,
        representation: ArtifactRepresentation::Api,
        owner_id: job.user_id.clone(),
        graph_epoch: ctx.store.data_version()?,
        parameters: serde_json::json!({ "job_id": job.job_id.as_str() }),
        metadata: serde_json::json!({}),
        ontology: ontology.clone(),
        concept_ids: Vec::new(),
        payload: ArtifactPayload::Inline(serde_json::to_value(stats)?),
        created_at: chrono::Utc::now(),
        expires_at: None,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::domain::{JobType, Ontology};
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

    #[tokio::test]
    async fn ingest_job_with_no_ontology_is_not_found() {
        let ctx = context();
        let request = IngestJobRequest {
            ontology: "missing".to_string(),
            filename: "note.md".to_string(),
            content_b64: base64::engine::general_purpose::STANDARD.encode("hello"),
            source_type: DocumentSourceType::Api,
            ingested_by: "tester".to_string(),
            hostname: None,
            file_path: None,
        };
        let job = Job::with_payload(JobType::Ingestion, "tester", serde_json::to_value(&request).unwrap());
        let err = run_ingest_job(&ctx, &job).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn ingest_job_produces_report_artifact() {
        let ctx = context();
        ctx.store.save_ontology(&Ontology::new("research")).unwrap();

        let text = "A short paragraph with no extracted concepts.";
        let request = IngestJobRequest {
            ontology: "research".to_string(),
            filename: "note.md".to_string(),
            content_b64: base64::engine::general_purpose::STANDARD.encode(text),
            source_type: DocumentSourceType::Api,
            ingested_by: "tester".to_string(),
            hostname: None,
            file_path: None,
        };
        let job = Job::with_payload(JobType::Ingestion, "tester", serde_json::to_value(&request).unwrap());

        let outcome = run_ingest_job(&ctx, &job).await.unwrap();
        match outcome {
            JobOutcome::ResultWithArtifact(_, artifact) => {
                assert_eq!(artifact.artifact_type, ArtifactType::IngestionReport);
            }
            JobOutcome::Result(_) => panic!("expected an artifact"),
        }
    }
}
