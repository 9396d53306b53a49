//! Embedding worker cold-start/regeneration and the background job system
//! (§4.7): a forward-only state machine persisted via [`GraphStore`], run by
//! a bounded-concurrency [`WorkerPool`] that dispatches by [`JobType`].

mod cleanup;
mod consolidation;
mod embedding;
mod ingest;
mod pool;

pub use cleanup::{run_cleanup_job, CleanupReport};
pub use consolidation::run_consolidation_job;
pub use embedding::{run_cold_start, run_regeneration_job, RegenerationOptions, RegenerationReport};
pub use ingest::{run_ingest_job, IngestJobRequest};
pub use pool::{JobContext, WorkerPool};

use crate::domain::{Job, JobType};
use crate::error::EngineResult;

/// What a job handler produces on success: a free-form JSON result, and
/// optionally an Artifact to persist alongside the job's completion (§4.7:
/// "this must occur in the same transaction as the job status update").
pub enum JobOutcome {
    Result(serde_json::Value),
    ResultWithArtifact(serde_json::Value, crate::domain::Artifact),
}

/// Dispatch one queued job to its handler by [`JobType`]. Shared by
/// [`WorkerPool::tick`] and anything driving jobs synchronously (CLI, tests).
pub(crate) async fn dispatch(ctx: &JobContext, job: &Job) -> EngineResult<JobOutcome> {
    match job.job_type {
        JobType::Ingestion => ingest::run_ingest_job(ctx, job).await,
        JobType::EmbeddingRegeneration => embedding::run_regeneration_job_from_payload(ctx, job),
        JobType::VocabularyConsolidation => consolidation::run_consolidation_job(ctx).await,
        JobType::ArtifactCleanup => cleanup::run_cleanup_job(ctx),
    }
}
