//! Service limits and defaults.

use std::path::PathBuf;
use std::time::Duration;

use reelkit_models::EncodingConfig;

/// Default ceiling on the summed duration of merged clips.
pub const DEFAULT_MAX_MERGE_SECS: f64 = 480.0;
/// Default number of clips accepted by one merge.
pub const DEFAULT_MAX_CLIPS: usize = 20;
/// Default per-download byte ceiling (2 GiB).
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Configuration shared by all media operations.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Directory under which per-job workspaces are created.
    pub work_root: PathBuf,
    /// Engine timeout for short operations (trim, resize, text, speed, remix).
    pub quick_timeout: Duration,
    /// Engine timeout for long operations (merge, reverse, title card).
    pub long_timeout: Duration,
    pub probe_timeout: Duration,
    pub download_timeout: Duration,
    pub max_download_bytes: u64,
    pub max_parallel_downloads: usize,
    pub max_merge_secs: f64,
    pub max_clips: usize,
    pub encoding: EncodingConfig,
    /// Font used for overlays when a request does not name one.
    pub font_file: Option<PathBuf>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir().join("reelkit"),
            quick_timeout: Duration::from_secs(300),
            long_timeout: Duration::from_secs(1800),
            probe_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(120),
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            max_parallel_downloads: 4,
            max_merge_secs: DEFAULT_MAX_MERGE_SECS,
            max_clips: DEFAULT_MAX_CLIPS,
            encoding: EncodingConfig::default(),
            font_file: None,
        }
    }
}

impl MediaConfig {
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }
}
