//! Locating the `ffmpeg` and `ffprobe` executables.
//!
//! Resolution happens once per process; the resulting [`EngineSet`] is handed
//! to services explicitly so tests can substitute fixed paths.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Directories searched after `PATH`.
pub const WELL_KNOWN_DIRS: &[&str] = &[
    "/usr/bin",
    "/usr/local/bin",
    "/opt/homebrew/bin",
    "/opt/local/bin",
    "/snap/bin",
];

/// Environment variable naming an extra directory to search first.
pub const ENGINE_DIR_ENV: &str = "REELKIT_FFMPEG_DIR";

/// External engine binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Ffmpeg,
    Ffprobe,
}

impl Engine {
    pub fn binary_name(self) -> &'static str {
        match self {
            Engine::Ffmpeg => "ffmpeg",
            Engine::Ffprobe => "ffprobe",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// Strategy for finding an engine binary.
pub trait ResolveEngine: Send + Sync {
    fn resolve(&self, engine: Engine) -> MediaResult<PathBuf>;
}

/// Resolver backed by `PATH` and a list of well-known directories.
#[derive(Debug, Clone)]
pub struct SystemResolver {
    extra_dirs: Vec<PathBuf>,
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SystemResolver {
    /// Create a resolver that also searches `REELKIT_FFMPEG_DIR` when set.
    pub fn from_env() -> Self {
        let extra_dirs = std::env::var_os(ENGINE_DIR_ENV)
            .map(PathBuf::from)
            .into_iter()
            .collect();
        Self { extra_dirs }
    }

    /// Add a directory searched before the well-known locations.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_dirs.push(dir.into());
        self
    }
}

/// First executable `name` inside `dirs`.
fn find_in<P: AsRef<Path>>(dirs: impl IntoIterator<Item = P>, name: &str) -> Option<PathBuf> {
    dirs.into_iter()
        .map(|dir| dir.as_ref().join(name))
        .find(|candidate| is_executable(candidate))
}

impl ResolveEngine for SystemResolver {
    /// Search order: configured dirs, then `PATH`, then well-known install dirs.
    fn resolve(&self, engine: Engine) -> MediaResult<PathBuf> {
        let name = engine.binary_name();

        find_in(&self.extra_dirs, name)
            .or_else(|| which::which(name).ok())
            .or_else(|| find_in(WELL_KNOWN_DIRS, name))
            .ok_or_else(|| MediaError::EngineNotFound {
                engine: name.to_string(),
            })
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Resolved engine paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSet {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

static GLOBAL_ENGINES: OnceLock<EngineSet> = OnceLock::new();

impl EngineSet {
    /// Resolve both engines, failing on the first one that is missing.
    pub fn resolve(resolver: &dyn ResolveEngine) -> MediaResult<Self> {
        let ffmpeg = resolver.resolve(Engine::Ffmpeg)?;
        let ffprobe = resolver.resolve(Engine::Ffprobe)?;
        debug!(ffmpeg = %ffmpeg.display(), ffprobe = %ffprobe.display(), "Resolved engines");
        Ok(Self { ffmpeg, ffprobe })
    }

    /// Use fixed paths without any lookup.
    pub fn from_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Process-wide engine paths, resolved on first use.
    ///
    /// A failed lookup is not cached, so installing the engine and retrying
    /// works without a restart. A successful lookup is never invalidated.
    pub fn global() -> MediaResult<&'static EngineSet> {
        if let Some(set) = GLOBAL_ENGINES.get() {
            return Ok(set);
        }
        let resolved = Self::resolve(&SystemResolver::from_env())?;
        let set = GLOBAL_ENGINES.get_or_init(|| resolved);
        info!(ffmpeg = %set.ffmpeg.display(), ffprobe = %set.ffprobe.display(), "Engines located");
        Ok(set)
    }

    pub fn path(&self, engine: Engine) -> &Path {
        match engine {
            Engine::Ffmpeg => &self.ffmpeg,
            Engine::Ffprobe => &self.ffprobe,
        }
    }
}

/// Check whether an engine can be found without caching the result.
pub fn check_engine(engine: Engine) -> MediaResult<PathBuf> {
    SystemResolver::from_env().resolve(engine)
}
