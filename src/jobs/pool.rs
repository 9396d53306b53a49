//! Worker pool (§4.7, §5): polls `queued` jobs and runs them with bounded
//! concurrency per job type, mirroring the teacher pack's poll-tick-sleep
//! worker shape (`SupabaseJobWorker::run`/`tick`) adapted to a
//! locally-persisted job queue instead of a remote job table.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::domain::{Job, JobStatus, JobType};
use crate::embedding::Embedder;
use crate::error::EngineResult;
use crate::llm::LlmCapability;
use crate::storage::{BlobStore, GraphStore};
use crate::vocabulary::VocabularyManager;

use super::{dispatch, JobOutcome};

/// Shared handles every job handler needs. Cheap to clone (all `Arc`).
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn GraphStore>,
    pub llm: Arc<dyn LlmCapability>,
    pub embedder: Arc<dyn Embedder>,
    pub vocabulary: Arc<VocabularyManager>,
    pub blob_store: Arc<dyn BlobStore>,
    pub config: EngineConfig,
}

impl JobContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn GraphStore>,
        llm: Arc<dyn LlmCapability>,
        embedder: Arc<dyn Embedder>,
        vocabulary: Arc<VocabularyManager>,
        blob_store: Arc<dyn BlobStore>,
        config: EngineConfig,
    ) -> Self {
        Self { store, llm, embedder, vocabulary, blob_store, config }
    }
}

/// Polls for queued jobs and runs them, capping concurrency at
/// `max_concurrent_jobs_per_type` per §5's "job workers: parallel across
/// jobs" rule. One pool instance serves every job type.
pub struct WorkerPool {
    ctx: JobContext,
    poll_interval: Duration,
    permits: HashMap<JobType, Arc<Semaphore>>,
}

const JOB_TYPES: [JobType; 4] = [
    JobType::Ingestion,
    JobType::EmbeddingRegeneration,
    JobType::VocabularyConsolidation,
    JobType::ArtifactCleanup,
];

impl WorkerPool {
    pub fn new(ctx: JobContext) -> Self {
        let cap = ctx.config.jobs.max_concurrent_jobs_per_type.max(1);
        let permits = JOB_TYPES.iter().map(|t| (*t, Arc::new(Semaphore::new(cap)))).collect();
        Self { ctx, poll_interval: Duration::from_secs(5), permits }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run forever, polling at `poll_interval`. Intended for a long-lived
    /// server process; tests and the CLI instead call [`WorkerPool::tick`]
    /// directly for deterministic, single-shot execution.
    pub async fn run(&self) -> ! {
        loop {
            match self.tick().await {
                Ok(0) => tokio::time::sleep(self.poll_interval).await,
                Ok(_) => {}
                Err(e) => {
                    error!("job pool tick failed: {e}");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Pick up every currently-queued job (respecting the per-type
    /// concurrency cap) and run it to completion. Returns how many jobs
    /// were started this tick.
    pub async fn tick(&self) -> EngineResult<usize> {
        let queued = self.ctx.store.jobs_by_status(JobStatus::Queued)?;
        let mut started = 0;
        let mut handles = Vec::new();

        for job in queued {
            let Some(semaphore) = self.permits.get(&job.job_type).cloned() else { continue };
            let Ok(permit) = semaphore.try_acquire_owned() else { continue };
            let ctx = self.ctx.clone();
            started += 1;
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                run_one(&ctx, job).await;
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
        Ok(started)
    }
}

async fn run_one(ctx: &JobContext, mut job: Job) {
    let job_id = job.job_id.clone();
    if let Err(e) = job.transition(JobStatus::Processing) {
        warn!("job {job_id} could not start: {e}");
        return;
    }
    if let Err(e) = ctx.store.save_job(&job) {
        error!("job {job_id} failed to persist processing state: {e}");
        return;
    }

    match dispatch(ctx, &job).await {
        Ok(JobOutcome::Result(result)) => {
            job.result = Some(result);
            let _ = job.transition(JobStatus::Completed);
            if let Err(e) = ctx.store.save_job(&job) {
                error!("job {job_id} completed but failed to persist: {e}");
            } else {
                info!("job {job_id} completed");
            }
        }
        Ok(JobOutcome::ResultWithArtifact(result, artifact)) => {
            job.result = Some(result);
            job.artifact_id = Some(artifact.id.clone());
            let _ = job.transition(JobStatus::Completed);
            if let Err(e) = ctx.store.complete_job_with_artifact(&job, &artifact) {
                error!("job {job_id} completed but failed to persist artifact: {e}");
            } else {
                info!("job {job_id} completed with artifact {}", artifact.id.as_str());
            }
        }
        Err(e) => {
            job.error = Some(e.to_string());
            let _ = job.transition(JobStatus::Failed);
            if let Err(save_err) = ctx.store.save_job(&job) {
                error!("job {job_id} failed ({e}) and failed to persist failure: {save_err}");
            } else {
                warn!("job {job_id} failed: {e}");
            }
        }
    }
}
