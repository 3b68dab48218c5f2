//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host process installs a recorder.

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

pub mod names {
    /// Completed operations by operation and outcome.
    pub const OPERATIONS_TOTAL: &str = "reelkit_operations_total";

    /// Operation wall time in seconds by operation.
    pub const OPERATION_SECONDS: &str = "reelkit_operation_seconds";

    /// Engine invocations by engine and outcome.
    pub const ENGINE_RUNS_TOTAL: &str = "reelkit_engine_runs_total";

    /// Documented fallbacks taken, by operation and fallback.
    pub const FALLBACKS_TOTAL: &str = "reelkit_fallbacks_total";

    /// Bytes downloaded from source URLs.
    pub const DOWNLOAD_BYTES_TOTAL: &str = "reelkit_download_bytes_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record a finished operation. `outcome` is `ok` or an error code.
pub fn record_operation(operation: &'static str, outcome: &str, elapsed_secs: f64) {
    counter!(
        names::OPERATIONS_TOTAL,
        "operation" => operation,
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(names::OPERATION_SECONDS, "operation" => operation).record(elapsed_secs);
}

pub fn record_engine_run(engine: &str, outcome: &'static str) {
    counter!(
        names::ENGINE_RUNS_TOTAL,
        "engine" => engine.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_fallback(operation: &'static str, fallback: &'static str) {
    counter!(
        names::FALLBACKS_TOTAL,
        "operation" => operation,
        "fallback" => fallback
    )
    .increment(1);
}

pub fn record_download_bytes(bytes: u64) {
    counter!(names::DOWNLOAD_BYTES_TOTAL).increment(bytes);
}

// =============================================================================
// Tests
// =============================================================================
