//! Per-job scratch directories.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// Exclusively owned temporary directory for a single operation.
///
/// The directory is removed when [`JobWorkspace::cleanup`] is called or when
/// the workspace is dropped, whichever happens first. Removal failures are
/// logged and never returned.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl JobWorkspace {
    /// Create a uniquely named directory under `root`.
    pub fn create(root: impl AsRef<Path>, prefix: &str) -> MediaResult<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{prefix}-"))
            .tempdir_in(root)?;
        let path = dir.path().to_path_buf();
        debug!(workspace = %path.display(), "Created workspace");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path for the n-th downloaded input.
    pub fn input_path(&self, index: usize, extension: &str) -> PathBuf {
        self.path.join(format!("input-{index}.{extension}"))
    }

    /// Path for the n-th normalized intermediate.
    pub fn normalized_path(&self, index: usize) -> PathBuf {
        self.path.join(format!("normalized-{index}.mp4"))
    }

    pub fn output_path(&self, extension: &str) -> PathBuf {
        self.path.join(format!("output.{extension}"))
    }

    /// Any other scratch file.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the directory now.
    pub fn cleanup(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!(workspace = %path.display(), "Removed workspace"),
                Err(e) => warn!(
                    workspace = %path.display(),
                    error = %e,
                    "Failed to remove workspace"
                ),
            }
        }
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        self.remove();
    }
}
