//! Job executor.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::Instrument;

use reelkit_media::MediaService;
use reelkit_models::OperationResult;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::job::{JobEnvelope, JobReport, MediaJob};
use crate::logging::JobLogger;

/// Runs media jobs against one [`MediaService`] under a job timeout and a
/// shared cancel signal.
pub struct JobExecutor {
    config: WorkerConfig,
    service: MediaService,
    cancel: Arc<watch::Sender<bool>>,
}

impl JobExecutor {
    /// Create an executor using the system engines.
    pub fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let service = MediaService::new(config.media_config())?;
        Ok(Self::with_service(config, service))
    }

    /// Create an executor around an existing service.
    pub fn with_service(config: WorkerConfig, service: MediaService) -> Self {
        let (cancel, cancel_rx) = watch::channel(false);
        Self {
            config,
            service: service.with_cancel(cancel_rx),
            cancel: Arc::new(cancel),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Kill any running engine process; the job then fails as cancelled.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Run one job to completion and return the produced result.
    pub async fn execute(&self, job: &MediaJob) -> WorkerResult<OperationResult> {
        let service = &self.service;
        let work = async {
            match job {
                MediaJob::Merge(req) => service.merge(req).await,
                MediaJob::Resize(req) => service.resize_for_platform(req).await,
                MediaJob::Trim(req) => service.trim(req).await,
                MediaJob::Speed(req) => service.change_speed(req).await,
                MediaJob::Reverse(req) => service.reverse(req).await,
                MediaJob::TextOverlay(req) => service.add_text(req).await,
                MediaJob::TitleCard(req) => service.add_title_card(req).await,
                MediaJob::Captions(req) => service.add_captions(req).await,
                MediaJob::AudioRemix(req) => service.remix_audio(req).await,
            }
        };

        match tokio::time::timeout(self.config.job_timeout, work).await {
            Ok(result) => Ok(result?),
            // Dropping the operation kills its engine and removes its workspace
            Err(_) => Err(WorkerError::JobTimeout {
                timeout_secs: self.config.job_timeout.as_secs(),
            }),
        }
    }

    /// Run a job, write its output to `output` when given, and report.
    ///
    /// Never fails: errors end up in the report.
    pub async fn run(&self, envelope: &JobEnvelope, output: Option<&Path>) -> JobReport {
        let logger = JobLogger::for_job(envelope);
        let started = Instant::now();

        let outcome = async {
            logger.started();
            let result = self.execute(&envelope.job).await?;
            for warning in &result.warnings {
                logger.degraded(warning);
            }
            if let Some(path) = output {
                tokio::fs::write(path, &result.buffer).await?;
                logger.output_written(path, result.file_size);
            }
            Ok::<_, WorkerError>(result)
        }
        .instrument(logger.span())
        .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let status = if outcome.is_ok() { "succeeded" } else { "failed" };
        metrics::counter!(
            "reelkit_jobs_total",
            "operation" => envelope.job.operation(),
            "status" => status
        )
        .increment(1);

        let _span = logger.span().entered();
        match outcome {
            Ok(result) => {
                logger.succeeded(&result, elapsed_ms);
                let output_path = output.map(|p| p.display().to_string());
                JobReport::succeeded(envelope, result, output_path, elapsed_ms)
            }
            Err(e) => {
                logger.failed(&e, elapsed_ms);
                JobReport::failed(envelope, &e, elapsed_ms)
            }
        }
    }
}
