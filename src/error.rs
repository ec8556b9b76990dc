//! Error taxonomy for the batch workflow.
//!
//! Two layers:
//! - `PreconditionError`: whole-invocation failures raised before any
//!   scheduling or network activity. Always fatal.
//! - `WorkflowError`: per-item failures. Caught at the pipeline boundary and
//!   folded into a `PipelineOutcome`; they never abort the batch.

use std::path::PathBuf;

use crate::config::{MAX_CONCURRENCY, MIN_CONCURRENCY};

/// Fatal failures detected before any work is scheduled.
#[derive(Debug, thiserror::Error)]
pub enum PreconditionError {
    /// The input path does not exist
    #[error("input path does not exist: {}", .0.display())]
    InputMissing(PathBuf),

    /// An output file already exists and --force was not given
    #[error("output already exists (pass --force to overwrite): {}", .0.display())]
    OutputExists(PathBuf),

    /// Two work items would write the same output file
    #[error("duplicate output path in batch: {}", .0.display())]
    DuplicateOutput(PathBuf),

    /// Concurrency flag outside the allowed range
    #[error("concurrency must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}, got {0}")]
    InvalidConcurrency(usize),

    /// No API key from the flag or the environment
    #[error("no API key: pass --api-key or set {0}")]
    MissingApiKey(&'static str),

    /// Directory input contained nothing processable
    #[error("no processable files found in {}", .0.display())]
    EmptyBatch(PathBuf),

    /// Local filesystem error while preparing the batch
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Fixed human-readable categories for well-known HTTP statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    /// 401
    Auth,
    /// 403
    Permission,
    /// 404
    NotFound,
    /// 429
    RateLimited,
    /// 500
    Server,
    /// Everything else keeps the raw server message
    Other,
}

impl StatusCategory {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Auth,
            403 => Self::Permission,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500 => Self::Server,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "authentication failed (check your API key)",
            Self::Permission => "permission denied",
            Self::NotFound => "endpoint or resource not found",
            Self::RateLimited => "rate limited by the API",
            Self::Server => "server error",
            Self::Other => "",
        }
    }
}

/// Per-item failures from the seven-step remote workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Application-level rejection from the API (non-2xx or success=false)
    #[error("{context}: {message} (status {status})")]
    Remote {
        status: u16,
        category: StatusCategory,
        message: String,
        context: &'static str,
    },

    /// Connection-level failure: no usable response at all
    #[error("{context}: transfer failed: {source}")]
    Transfer {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The server does not know the requested file id
    #[error("remote file not found: {file_id}")]
    NotFound { file_id: String },

    /// Extension did not classify as a processable type
    #[error("unsupported file type {extension:?}: {}", .path.display())]
    Unsupported { path: PathBuf, extension: String },

    /// Local filesystem failure while moving bytes
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}
