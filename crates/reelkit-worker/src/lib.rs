//! Media job worker.
//!
//! This crate provides:
//! - Environment configuration for the media services
//! - Job envelopes tagged by operation, and JSON job reports
//! - A job executor with an overall timeout and cancellation
//! - Structured job logging

pub mod config;
pub mod error;
pub mod executor;
pub mod job;
pub mod logging;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use job::{JobEnvelope, JobReport, JobStatus, MediaJob};
pub use logging::JobLogger;
