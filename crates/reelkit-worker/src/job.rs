//! Job envelopes and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use reelkit_models::{
    AudioRemixRequest, CaptionsRequest, MergeRequest, OperationResult, ResizeRequest,
    ReverseRequest, SpeedRequest, TextOverlayRequest, TitleCardRequest, TrimRequest,
};

use crate::error::{WorkerError, WorkerResult};

/// One media operation with its request, tagged by `operation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum MediaJob {
    Merge(MergeRequest),
    Resize(ResizeRequest),
    Trim(TrimRequest),
    Speed(SpeedRequest),
    Reverse(ReverseRequest),
    TextOverlay(TextOverlayRequest),
    TitleCard(TitleCardRequest),
    Captions(CaptionsRequest),
    AudioRemix(AudioRemixRequest),
}

impl MediaJob {
    pub fn operation(&self) -> &'static str {
        match self {
            MediaJob::Merge(_) => "merge",
            MediaJob::Resize(_) => "resize",
            MediaJob::Trim(_) => "trim",
            MediaJob::Speed(_) => "speed",
            MediaJob::Reverse(_) => "reverse",
            MediaJob::TextOverlay(_) => "text_overlay",
            MediaJob::TitleCard(_) => "title_card",
            MediaJob::Captions(_) => "captions",
            MediaJob::AudioRemix(_) => "audio_remix",
        }
    }

    /// Number of URLs the job downloads.
    pub fn source_count(&self) -> usize {
        match self {
            MediaJob::Merge(req) => req.urls.len(),
            MediaJob::AudioRemix(req) => 1 + usize::from(req.music_url.is_some()),
            _ => 1,
        }
    }
}

fn new_job_id() -> String {
    Uuid::new_v4().to_string()
}

/// A job as submitted: `{"job_id": "...", "operation": "merge", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEnvelope {
    #[serde(default = "new_job_id")]
    pub job_id: String,
    #[serde(flatten)]
    pub job: MediaJob,
}

impl JobEnvelope {
    pub fn new(job: MediaJob) -> Self {
        Self {
            job_id: new_job_id(),
            job,
        }
    }

    /// Parse an envelope from JSON.
    pub fn from_json(bytes: &[u8]) -> WorkerResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| WorkerError::invalid_job(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
}

/// Outcome of one job, printed as JSON by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: String,
    pub operation: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Metadata of the produced file; the bytes go to `output_path`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OperationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    pub fn succeeded(
        envelope: &JobEnvelope,
        result: OperationResult,
        output_path: Option<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            job_id: envelope.job_id.clone(),
            operation: envelope.job.operation().to_string(),
            status: JobStatus::Succeeded,
            error_code: None,
            error_category: None,
            message: None,
            result: Some(result),
            output_path,
            elapsed_ms,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(envelope: &JobEnvelope, error: &WorkerError, elapsed_ms: u64) -> Self {
        Self {
            job_id: envelope.job_id.clone(),
            operation: envelope.job.operation().to_string(),
            status: JobStatus::Failed,
            error_code: Some(error.code().to_string()),
            error_category: Some(error.category().as_str().to_string()),
            message: Some(error.to_string()),
            result: None,
            output_path: None,
            elapsed_ms,
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}
