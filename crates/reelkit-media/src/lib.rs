#![deny(unreachable_patterns)]
//! FFmpeg CLI pipeline for derived media.
//!
//! This crate provides:
//! - Engine discovery for `ffmpeg` and `ffprobe`
//! - Per-job scratch workspaces with guaranteed cleanup
//! - Bounded HTTP(S) media downloads
//! - Type-safe FFmpeg command building and a timed, cancellable runner
//! - Pure filter-graph builders (scale, crossfade, drawtext, tempo, remix)
//! - Operation services: merge, resize, trim, speed, reverse, text overlays,
//!   captions, title cards and audio remix

pub mod command;
pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod filters;
pub mod metrics;
pub mod operations;
pub mod probe;
pub mod workspace;

pub use command::{FfmpegCommand, ProcessOutput, ProcessRunner};
pub use config::MediaConfig;
pub use download::{fetch_all, fetch_to_file, validate_url, HttpFetcher, MediaFetcher};
pub use engine::{check_engine, Engine, EngineSet, ResolveEngine, SystemResolver};
pub use error::{ErrorCategory, MediaError, MediaResult};
pub use filters::FilterGraph;
pub use operations::MediaService;
pub use probe::{probe, ProbeResult};
pub use workspace::JobWorkspace;
