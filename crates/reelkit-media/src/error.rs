//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Coarse classification of a [`MediaError`], for callers that only need to
/// know who is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request itself is wrong; retrying will not help.
    InvalidInput,
    /// The request is well-formed but exceeds a service limit.
    LimitExceeded,
    /// Network or processing failure that may succeed on retry.
    Transient,
    /// Misconfiguration or a bug on our side.
    Internal,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::InvalidInput => "invalid_input",
            ErrorCategory::LimitExceeded => "limit_exceeded",
            ErrorCategory::Transient => "transient",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Download failed with HTTP status {status}: {url}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Download timed out after {timeout_secs}s: {url}")]
    DownloadTimeout { url: String, timeout_secs: u64 },

    #[error("Downloaded file is empty: {url}")]
    DownloadEmpty { url: String },

    #[error("Download exceeds {limit} bytes: {url}")]
    DownloadTooLarge { url: String, limit: u64 },

    #[error("Download request failed: {message}")]
    DownloadRequest { message: String },

    #[error("Invalid media URL: {0}")]
    InvalidUrl(String),

    #[error("FFprobe failed: {stderr}")]
    ProbeFailed { path: PathBuf, stderr: String },

    #[error("{engine} not found in PATH or well-known locations")]
    EngineNotFound { engine: String },

    #[error("{operation} timed out after {timeout_secs} seconds")]
    ProcessingTimeout { operation: String, timeout_secs: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{operation} failed (exit code {exit_code:?}): {stderr_tail}")]
    EngineExecutionFailed {
        operation: String,
        stderr_tail: String,
        exit_code: Option<i32>,
    },

    #[error("At least 2 clips are required, got {count}")]
    InsufficientClips { count: usize },

    #[error("Total duration {total_secs:.2}s exceeds the {limit_secs:.0}s limit")]
    DurationLimitExceeded { total_secs: f64, limit_secs: f64 },

    #[error("Invalid range: start {start_secs:.3}s must be before end {end_secs:.3}s")]
    InvalidRange { start_secs: f64, end_secs: f64 },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Exactly one of a preset or custom width and height must be given")]
    AmbiguousTarget,

    #[error("Speed factor {factor} is outside [{min}, {max}]")]
    AmbiguousSpeedFactor { factor: f64, min: f64, max: f64 },

    #[error("Unknown platform preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an engine execution failure.
    pub fn engine_failed(
        operation: impl Into<String>,
        stderr_tail: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EngineExecutionFailed {
            operation: operation.into(),
            stderr_tail: stderr_tail.into(),
            exit_code,
        }
    }

    /// Create a probe failure.
    pub fn probe_failed(path: impl Into<PathBuf>, stderr: impl Into<String>) -> Self {
        Self::ProbeFailed {
            path: path.into(),
            stderr: stderr.into(),
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn timeout(operation: impl Into<String>, timeout_secs: u64) -> Self {
        Self::ProcessingTimeout {
            operation: operation.into(),
            timeout_secs,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            MediaError::DownloadFailed { .. } => "DOWNLOAD_FAILED",
            MediaError::DownloadTimeout { .. } => "DOWNLOAD_TIMEOUT",
            MediaError::DownloadEmpty { .. } => "DOWNLOAD_EMPTY",
            MediaError::DownloadTooLarge { .. } => "DOWNLOAD_TOO_LARGE",
            MediaError::DownloadRequest { .. } => "DOWNLOAD_REQUEST_FAILED",
            MediaError::InvalidUrl(_) => "INVALID_URL",
            MediaError::ProbeFailed { .. } => "PROBE_FAILED",
            MediaError::EngineNotFound { .. } => "ENGINE_NOT_FOUND",
            MediaError::ProcessingTimeout { .. } => "PROCESSING_TIMEOUT",
            MediaError::Cancelled => "CANCELLED",
            MediaError::EngineExecutionFailed { .. } => "ENGINE_EXECUTION_FAILED",
            MediaError::InsufficientClips { .. } => "INSUFFICIENT_CLIPS",
            MediaError::DurationLimitExceeded { .. } => "DURATION_LIMIT_EXCEEDED",
            MediaError::InvalidRange { .. } => "INVALID_RANGE",
            MediaError::InvalidTimestamp(_) => "INVALID_TIMESTAMP",
            MediaError::AmbiguousTarget => "AMBIGUOUS_TARGET",
            MediaError::AmbiguousSpeedFactor { .. } => "AMBIGUOUS_SPEED_FACTOR",
            MediaError::UnknownPreset(_) => "UNKNOWN_PRESET",
            MediaError::InvalidParameter(_) => "INVALID_PARAMETER",
            MediaError::Io(_) => "IO_ERROR",
            MediaError::JsonParse(_) => "JSON_PARSE_ERROR",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::DownloadFailed { status, .. } if (400..500).contains(status) => {
                ErrorCategory::InvalidInput
            }
            MediaError::DownloadEmpty { .. }
            | MediaError::InvalidUrl(_)
            | MediaError::ProbeFailed { .. }
            | MediaError::InsufficientClips { .. }
            | MediaError::InvalidRange { .. }
            | MediaError::InvalidTimestamp(_)
            | MediaError::AmbiguousTarget
            | MediaError::AmbiguousSpeedFactor { .. }
            | MediaError::UnknownPreset(_)
            | MediaError::InvalidParameter(_) => ErrorCategory::InvalidInput,
            MediaError::DownloadTooLarge { .. } | MediaError::DurationLimitExceeded { .. } => {
                ErrorCategory::LimitExceeded
            }
            MediaError::DownloadFailed { .. }
            | MediaError::DownloadTimeout { .. }
            | MediaError::DownloadRequest { .. }
            | MediaError::ProcessingTimeout { .. }
            | MediaError::Cancelled
            | MediaError::EngineExecutionFailed { .. } => ErrorCategory::Transient,
            MediaError::EngineNotFound { .. } | MediaError::Io(_) | MediaError::JsonParse(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// True when the error was raised by request validation.
    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::InvalidInput
            && !matches!(
                self,
                MediaError::DownloadFailed { .. }
                    | MediaError::DownloadEmpty { .. }
                    | MediaError::ProbeFailed { .. }
            )
    }
}

impl From<validator::ValidationErrors> for MediaError {
    fn from(errors: validator::ValidationErrors) -> Self {
        MediaError::InvalidParameter(errors.to_string())
    }
}

impl From<reelkit_models::TimestampError> for MediaError {
    fn from(err: reelkit_models::TimestampError) -> Self {
        MediaError::InvalidTimestamp(err.to_string())
    }
}
