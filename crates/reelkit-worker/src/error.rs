//! Worker error types.

use thiserror::Error;

use reelkit_media::{ErrorCategory, MediaError};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Job timed out after {timeout_secs} seconds")]
    JobTimeout { timeout_secs: u64 },

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    /// Stable machine-readable code. Media errors keep their own code.
    pub fn code(&self) -> &'static str {
        match self {
            WorkerError::InvalidJob(_) => "INVALID_JOB",
            WorkerError::JobTimeout { .. } => "JOB_TIMEOUT",
            WorkerError::Media(e) => e.code(),
            WorkerError::Io(_) => "IO_ERROR",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            WorkerError::InvalidJob(_) => ErrorCategory::InvalidInput,
            WorkerError::JobTimeout { .. } => ErrorCategory::Transient,
            WorkerError::Media(e) => e.category(),
            WorkerError::Io(_) => ErrorCategory::Internal,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
            && !matches!(self, WorkerError::Media(MediaError::Cancelled))
    }
}
