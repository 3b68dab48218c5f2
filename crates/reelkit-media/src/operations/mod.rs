//! Operation services.
//!
//! Every operation follows the same shape: validate the request without
//! touching the network or disk, create a workspace, download and probe the
//! sources, run the engine, then read the output back into memory. The
//! workspace is removed on every exit path.

mod audio;
mod merge;
mod resize;
mod speed;
mod text;
mod trim;

pub use merge::{check_duration_limit, plan_merge_geometry, MergeGeometry};
pub use resize::{resolve_target, ResizeTarget};
pub use speed::check_speed_factor;
pub use text::validate_color;
pub use trim::{clamp_range, requested_range};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, info_span, warn, Instrument};

use reelkit_models::{EncodingConfig, OperationDetails, OperationResult, Quality};

use crate::command::{FfmpegCommand, ProcessRunner};
use crate::config::MediaConfig;
use crate::download::{fetch_all, fetch_to_file, HttpFetcher, MediaFetcher};
use crate::engine::EngineSet;
use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::probe::{probe, ProbeResult};
use crate::workspace::JobWorkspace;

/// Entry point for all media operations.
///
/// Cheap to clone; clones share configuration and the fetcher.
#[derive(Clone)]
pub struct MediaService {
    config: Arc<MediaConfig>,
    engines: EngineSet,
    fetcher: Arc<dyn MediaFetcher>,
    runner: ProcessRunner,
}

impl std::fmt::Debug for MediaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaService")
            .field("config", &self.config)
            .field("engines", &self.engines)
            .finish_non_exhaustive()
    }
}

impl MediaService {
    /// Build a service using the process-wide engines and an HTTP fetcher.
    pub fn new(config: MediaConfig) -> MediaResult<Self> {
        let engines = EngineSet::global()?.clone();
        let fetcher = HttpFetcher::new(config.max_download_bytes)?;
        Ok(Self::with_parts(config, engines, Arc::new(fetcher)))
    }

    pub fn with_parts(
        config: MediaConfig,
        engines: EngineSet,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            engines,
            fetcher,
            runner: ProcessRunner::new(),
        }
    }

    /// Abort running engine processes when `cancel_rx` turns true.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.runner = self.runner.with_cancel(cancel_rx);
        self
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    pub fn engines(&self) -> &EngineSet {
        &self.engines
    }

    fn encoding(&self, quality: Quality) -> EncodingConfig {
        self.config.encoding.clone().for_quality(quality)
    }

    fn workspace(&self, operation: &str) -> MediaResult<JobWorkspace> {
        JobWorkspace::create(&self.config.work_root, operation)
    }

    async fn download(
        &self,
        ws: &JobWorkspace,
        url: &str,
        index: usize,
        fallback_ext: &str,
    ) -> MediaResult<PathBuf> {
        let dest = ws.input_path(index, input_extension(url, fallback_ext));
        fetch_to_file(self.fetcher.as_ref(), url, &dest, self.config.download_timeout).await?;
        Ok(dest)
    }

    async fn download_all(
        &self,
        ws: &JobWorkspace,
        urls: &[(&str, &str)],
    ) -> MediaResult<Vec<PathBuf>> {
        let jobs = urls
            .iter()
            .enumerate()
            .map(|(i, (url, ext))| (url.to_string(), ws.input_path(i, input_extension(url, ext))))
            .collect();
        fetch_all(
            self.fetcher.as_ref(),
            jobs,
            self.config.download_timeout,
            self.config.max_parallel_downloads,
        )
        .await
    }

    async fn probe(&self, path: &Path) -> MediaResult<ProbeResult> {
        probe(&self.engines.ffprobe, &self.runner, path, self.config.probe_timeout).await
    }

    /// Probe a source that must carry a video stream.
    async fn probe_video(&self, path: &Path) -> MediaResult<ProbeResult> {
        let info = self.probe(path).await?;
        if !info.has_video() {
            return Err(MediaError::probe_failed(path, "no video stream"));
        }
        Ok(info)
    }

    async fn ffmpeg(
        &self,
        cmd: &FfmpegCommand,
        timeout: Duration,
        operation: &str,
    ) -> MediaResult<()> {
        self.runner
            .run_ffmpeg(&self.engines.ffmpeg, cmd, timeout, operation)
            .await
            .map(|_| ())
    }

    /// Probe the output file and read it into an [`OperationResult`].
    async fn finish(
        &self,
        output: &Path,
        details: OperationDetails,
        warnings: Vec<String>,
    ) -> MediaResult<OperationResult> {
        let info = self.probe(output).await?;
        let buffer = tokio::fs::read(output).await?;
        Ok(OperationResult {
            file_size: buffer.len() as u64,
            buffer,
            duration_secs: info.duration,
            width: info.width,
            height: info.height,
            details,
            warnings,
        })
    }

    /// Wrap an operation with a tracing span, timing and outcome metrics.
    async fn instrument<F>(&self, operation: &'static str, fut: F) -> MediaResult<OperationResult>
    where
        F: Future<Output = MediaResult<OperationResult>>,
    {
        let started = Instant::now();
        let result = fut.instrument(info_span!("media_operation", operation)).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(output) => {
                info!(
                    operation,
                    elapsed_secs = elapsed,
                    file_size = output.file_size,
                    duration_secs = output.duration_secs,
                    warnings = ?output.warnings,
                    "Operation completed"
                );
                metrics::record_operation(operation, "ok", elapsed);
            }
            Err(e) => {
                warn!(
                    operation,
                    elapsed_secs = elapsed,
                    code = e.code(),
                    error = %e,
                    "Operation failed"
                );
                metrics::record_operation(operation, e.code(), elapsed);
            }
        }
        result
    }
}

/// File extension for a downloaded input, taken from the URL path when it
/// looks like one.
fn input_extension<'a>(url: &'a str, fallback: &'a str) -> &'a str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext
        }
        _ => fallback,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fetcher that counts calls and never succeeds.
    #[derive(Default)]
    pub struct CountingFetcher {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaFetcher for CountingFetcher {
        async fn fetch_to(&self, url: &str, _dest: &Path, _timeout: Duration) -> MediaResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(MediaError::DownloadFailed {
                url: url.to_string(),
                status: 500,
            })
        }
    }

    /// A service whose engines do not exist, with a fresh work root.
    pub fn service(root: &Path) -> (MediaService, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher::default());
        let service = MediaService::with_parts(
            MediaConfig::default().with_work_root(root),
            EngineSet::from_paths("/nonexistent/ffmpeg", "/nonexistent/ffprobe"),
            fetcher.clone(),
        );
        (service, fetcher)
    }

    /// Fetcher that writes a few placeholder bytes for every URL.
    pub struct PlaceholderFetcher;

    #[async_trait]
    impl MediaFetcher for PlaceholderFetcher {
        async fn fetch_to(&self, _url: &str, dest: &Path, _timeout: Duration) -> MediaResult<u64> {
            tokio::fs::write(dest, b"media").await?;
            Ok(5)
        }
    }

    /// Shell-script stand-ins for ffmpeg and ffprobe.
    ///
    /// `ffprobe` always prints a 5 s 1280x720 clip with audio. `ffmpeg`
    /// records its arguments, fails when they contain `fail_on`, and
    /// otherwise writes its output file.
    #[cfg(unix)]
    pub struct ScriptedEngines {
        dir: tempfile::TempDir,
    }

    #[cfg(unix)]
    impl ScriptedEngines {
        const PROBE_JSON: &'static str = concat!(
            r#"{"format":{"duration":"5.000000"},"streams":["#,
            r#"{"codec_type":"video","codec_name":"h264","width":1280,"height":720,"#,
            r#""avg_frame_rate":"30/1"},"#,
            r#"{"codec_type":"audio","codec_name":"aac","sample_rate":"44100"}]}"#,
        );

        pub fn new(fail_on: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let log = dir.path().join("ffmpeg.log");
            let ffmpeg = format!(
                "#!/bin/sh\n\
                 printf '%s\\n' \"$*\" >> '{log}'\n\
                 case \"$*\" in *'{fail_on}'*) echo 'filter failed' >&2; exit 1;; esac\n\
                 for last in \"$@\"; do :; done\n\
                 printf media > \"$last\"\n",
                log = log.display()
            );
            let ffprobe = format!("#!/bin/sh\nprintf '%s' '{}'\n", Self::PROBE_JSON);
            write_script(&dir.path().join("ffmpeg"), &ffmpeg);
            write_script(&dir.path().join("ffprobe"), &ffprobe);
            Self { dir }
        }

        pub fn engine_set(&self) -> EngineSet {
            EngineSet::from_paths(self.dir.path().join("ffmpeg"), self.dir.path().join("ffprobe"))
        }

        /// Arguments of every ffmpeg run, oldest first.
        pub fn ffmpeg_runs(&self) -> Vec<String> {
            std::fs::read_to_string(self.dir.path().join("ffmpeg.log"))
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[cfg(unix)]
    fn write_script(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, body).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// A service running the scripted engines with placeholder downloads.
    #[cfg(unix)]
    pub fn scripted_service(root: &Path, engines: &ScriptedEngines) -> MediaService {
        MediaService::with_parts(
            MediaConfig::default().with_work_root(root),
            engines.engine_set(),
            Arc::new(PlaceholderFetcher),
        )
    }

    /// Assert nothing was downloaded and no workspace was created.
    pub fn assert_untouched(root: &Path, fetcher: &CountingFetcher) {
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        let leftovers = std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0);
        assert_eq!(leftovers, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_input_extension() {
        assert_eq!(input_extension("https://cdn.x/clip.mov", "mp4"), "mov");
        assert_eq!(input_extension("https://cdn.x/clip.webm?sig=abc", "mp4"), "webm");
        assert_eq!(input_extension("https://cdn.x/download", "mp4"), "mp4");
        assert_eq!(input_extension("https://cdn.x/.hidden", "mp4"), "mp4");
        assert_eq!(input_extension("https://cdn.x/a.b/c", "mp3"), "mp3");
    }

    #[tokio::test]
    async fn test_download_failure_cleans_workspace() {
        let root = tempfile::tempdir().unwrap();
        let (service, fetcher) = service(root.path());
        let request = reelkit_models::ReverseRequest::new("https://cdn.example.com/a.mp4");
        let err = service.reverse(&request).await.unwrap_err();
        assert!(matches!(err, MediaError::DownloadFailed { status: 500, .. }));
        assert_eq!(fetcher.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
