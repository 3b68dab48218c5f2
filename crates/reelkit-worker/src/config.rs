//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reelkit_media::MediaConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory under which per-job workspaces are created
    pub work_dir: PathBuf,
    /// Overall limit for one job, downloads and engine runs included
    pub job_timeout: Duration,
    /// Engine timeout for trim, resize, text, speed and remix
    pub quick_timeout: Duration,
    /// Engine timeout for merge, reverse and title cards
    pub long_timeout: Duration,
    pub probe_timeout: Duration,
    pub download_timeout: Duration,
    pub max_download_bytes: u64,
    /// Maximum concurrent downloads per job
    pub max_download_parallel: usize,
    pub max_merge_secs: f64,
    pub max_clips: usize,
    /// Font used for overlays when a request does not name one
    pub font_file: Option<PathBuf>,
    /// Serve Prometheus metrics on this address when set
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let media = MediaConfig::default();
        Self {
            work_dir: media.work_root,
            job_timeout: Duration::from_secs(3600), // 1 hour
            quick_timeout: media.quick_timeout,
            long_timeout: media.long_timeout,
            probe_timeout: media.probe_timeout,
            download_timeout: media.download_timeout,
            max_download_bytes: media.max_download_bytes,
            max_download_parallel: media.max_parallel_downloads,
            max_merge_secs: media.max_merge_secs,
            max_clips: media.max_clips,
            font_file: None,
            metrics_addr: None,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key).and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

fn secs_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    Duration::from_secs(parse_or(lookup, key, default.as_secs()))
}

impl WorkerConfig {
    /// Create config from `REELKIT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup. Missing or unparseable values fall
    /// back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            work_dir: lookup("REELKIT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            job_timeout: secs_or(&lookup, "REELKIT_JOB_TIMEOUT_SECS", defaults.job_timeout),
            quick_timeout: secs_or(&lookup, "REELKIT_QUICK_TIMEOUT_SECS", defaults.quick_timeout),
            long_timeout: secs_or(&lookup, "REELKIT_LONG_TIMEOUT_SECS", defaults.long_timeout),
            probe_timeout: secs_or(&lookup, "REELKIT_PROBE_TIMEOUT_SECS", defaults.probe_timeout),
            download_timeout: secs_or(
                &lookup,
                "REELKIT_DOWNLOAD_TIMEOUT_SECS",
                defaults.download_timeout,
            ),
            max_download_bytes: parse_or(
                &lookup,
                "REELKIT_MAX_DOWNLOAD_BYTES",
                defaults.max_download_bytes,
            ),
            max_download_parallel: parse_or(
                &lookup,
                "REELKIT_MAX_PARALLEL_DOWNLOADS",
                defaults.max_download_parallel,
            )
            .max(1),
            max_merge_secs: parse_or(&lookup, "REELKIT_MAX_MERGE_SECS", defaults.max_merge_secs),
            max_clips: parse_or(&lookup, "REELKIT_MAX_CLIPS", defaults.max_clips),
            font_file: lookup("REELKIT_FONT_FILE")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            metrics_addr: lookup("REELKIT_METRICS_ADDR").and_then(|s| s.parse().ok()),
        }
    }

    /// Settings handed to the media services.
    pub fn media_config(&self) -> MediaConfig {
        MediaConfig {
            work_root: self.work_dir.clone(),
            quick_timeout: self.quick_timeout,
            long_timeout: self.long_timeout,
            probe_timeout: self.probe_timeout,
            download_timeout: self.download_timeout,
            max_download_bytes: self.max_download_bytes,
            max_parallel_downloads: self.max_download_parallel,
            max_merge_secs: self.max_merge_secs,
            max_clips: self.max_clips,
            font_file: self.font_file.clone(),
            ..MediaConfig::default()
        }
    }
}
