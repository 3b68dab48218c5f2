//! Job lifecycle logging.
//!
//! Every event of a job runs inside a `media_job` span carrying the job ID,
//! the operation and the number of source URLs.

use std::path::Path;

use tracing::{error, info, info_span, warn, Span};

use reelkit_models::OperationResult;

use crate::error::WorkerError;
use crate::job::JobEnvelope;

#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: &'static str,
    sources: usize,
}

impl JobLogger {
    pub fn for_job(envelope: &JobEnvelope) -> Self {
        Self {
            job_id: envelope.job_id.clone(),
            operation: envelope.job.operation(),
            sources: envelope.job.source_count(),
        }
    }

    pub fn span(&self) -> Span {
        info_span!(
            "media_job",
            job_id = %self.job_id,
            operation = self.operation,
            sources = self.sources
        )
    }

    pub fn started(&self) {
        info!(sources = self.sources, "Media job started");
    }

    /// The operation succeeded but had to degrade its output.
    pub fn degraded(&self, warning: &str) {
        warn!(warning, "Media job output degraded");
    }

    pub fn output_written(&self, path: &Path, bytes: u64) {
        info!(path = %path.display(), bytes, "Wrote job output");
    }

    pub fn succeeded(&self, result: &OperationResult, elapsed_ms: u64) {
        info!(
            duration_secs = result.duration_secs,
            width = result.width,
            height = result.height,
            file_size = result.file_size,
            elapsed_ms,
            "Media job succeeded"
        );
    }

    pub fn failed(&self, err: &WorkerError, elapsed_ms: u64) {
        error!(
            error_code = err.code(),
            category = %err.category(),
            retryable = err.is_retryable(),
            elapsed_ms,
            error = %err,
            "Media job failed"
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn sources(&self) -> usize {
        self.sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::MediaJob;
    use reelkit_media::MediaError;
    use reelkit_models::{AudioRemixRequest, MergeRequest};

    #[test]
    fn test_logger_for_merge_counts_clips() {
        let urls = (0..3).map(|i| format!("https://a/{i}.mp4")).collect();
        let envelope = JobEnvelope::new(MediaJob::Merge(MergeRequest::new(urls)));
        let logger = JobLogger::for_job(&envelope);
        assert_eq!(logger.job_id(), envelope.job_id);
        assert_eq!(logger.operation(), "merge");
        assert_eq!(logger.sources(), 3);
    }

    #[test]
    fn test_logging_without_subscriber() {
        let mut remix = AudioRemixRequest::new("https://a/v.mp4");
        remix.music_url = Some("https://a/m.mp3".to_string());
        let logger = JobLogger::for_job(&JobEnvelope::new(MediaJob::AudioRemix(remix)));
        assert_eq!(logger.sources(), 2);

        let _guard = logger.span().entered();
        logger.started();
        logger.degraded("audio_replaced_with_silence");
        logger.output_written(Path::new("/tmp/out.mp4"), 1024);
        logger.failed(&WorkerError::from(MediaError::Cancelled), 12);
    }
}
