//! Job: background work records with a forward-only state machine (§3, §4.7).

use serde::{Deserialize, Serialize};

use super::ids::{ArtifactId, JobId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// No backward transitions (§4.7, §5): queued → processing →
    /// (completed | failed | cancelled), and the terminal states are final.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Processing)
                | (Queued, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Ingestion,
    EmbeddingRegeneration,
    VocabularyConsolidation,
    ArtifactCleanup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub job_type: JobType,
    pub user_id: String,
    pub status: JobStatus,
    /// The request that created this job (e.g. an ingest job's content and
    /// options), fixed at submission time and read by the worker that picks
    /// it up. `Null` for job types that carry no submission payload.
    pub payload: serde_json::Value,
    pub progress: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub artifact_id: Option<ArtifactId>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Job {
    pub fn new(job_type: JobType, user_id: impl Into<String>) -> Self {
        Self::with_payload(job_type, user_id, serde_json::Value::Null)
    }

    pub fn with_payload(job_type: JobType, user_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            job_id: JobId::new(),
            job_type,
            user_id: user_id.into(),
            status: JobStatus::Queued,
            payload,
            progress: serde_json::Value::Null,
            result: None,
            error: None,
            artifact_id: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Apply a status transition, returning an error if it would move backward.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), crate::error::EngineError> {
        if !self.status.can_transition_to(next) {
            return Err(crate::error::EngineError::Conflict(format!(
                "job {} cannot transition {:?} -> {:?}",
                self.job_id, self.status, next
            )));
        }
        match next {
            JobStatus::Processing => self.started_at = Some(chrono::Utc::now()),
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => {
                self.completed_at = Some(chrono::Utc::now())
            }
            JobStatus::Queued => {}
        }
        self.status = next;
        Ok(())
    }
}
