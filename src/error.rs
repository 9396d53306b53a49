//! Crate-wide error taxonomy.
//!
//! Mirrors the abstract error kinds every surface must be able to report:
//! `not_found`, `conflict`, `invalid_input`, `quota_or_limit`,
//! `upstream_unavailable`, `fatal`, `partial_success`. Callers match on
//! [`EngineError::kind`] rather than the source-language exception type.

use thiserror::Error;

/// Abstract error kind, independent of which subsystem raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    QuotaOrLimit,
    UpstreamUnavailable,
    Fatal,
    PartialSuccess,
}

/// Structured error body every surface returns: `{error_kind, message, details?}`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error_kind: ErrorKind,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("quota or limit exceeded: {0}")]
    QuotaOrLimit(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("fatal internal error: {0}")]
    Fatal(String),

    #[error("partial success: {completed}/{total} items succeeded")]
    PartialSuccess {
        completed: usize,
        total: usize,
        errors: Vec<String>,
    },

    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::Conflict(_) => ErrorKind::Conflict,
            EngineError::InvalidInput(_) => ErrorKind::InvalidInput,
            EngineError::QuotaOrLimit(_) => ErrorKind::QuotaOrLimit,
            EngineError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            EngineError::PartialSuccess { .. } => ErrorKind::PartialSuccess,
            EngineError::Fatal(_)
            | EngineError::Storage(_)
            | EngineError::Database(_)
            | EngineError::Io(_)
            | EngineError::Serialization(_) => ErrorKind::Fatal,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error_kind: self.kind(),
            message: self.to_string(),
            details: None,
        }
    }

    pub fn to_body_with_details(&self, details: serde_json::Value) -> ErrorBody {
        ErrorBody {
            error_kind: self.kind(),
            message: self.to_string(),
            details: Some(details),
        }
    }
}
