//! Error types used by the supervision pipeline.
//!
//! This module defines three error enums:
//!
//! - [`StoreError`] — failures of the measurement store's insert/query contract.
//! - [`SuperviseError`] — failures of one process supervision.
//! - [`RuntimeError`] — failures of the orchestrator runtime itself.
//!
//! All types provide `as_label` for stable snake_case labels in logs, and
//! [`StoreError::is_retryable`] tells callers whether an operation may be
//! reattempted.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the measurement store.
///
/// The store never fails callers on duplicate timestamps or empty result
/// sets; the only contract failure is unavailability of the backing engine,
/// which is retriable by the caller. The pipeline itself never retries
/// internally — a failed insert is surfaced, not discarded.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing storage engine could not serve the operation.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// Backend-specific description of the failure.
        reason: String,
    },
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Unavailable { .. } => "store_unavailable",
        }
    }

    /// Indicates whether the operation may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}

/// # Errors produced by one process supervision.
///
/// A failed launch is fatal for that supervision task — there are no retries
/// within the supervisor; the error is surfaced to the orchestration boundary
/// while the process record still transitions to `Finished` for audit.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SuperviseError {
    /// The external analyzer could not be started.
    #[error("failed to launch analyzer `{program}`: {source}")]
    Launch {
        /// Program that was being launched.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The analyzer was spawned but its piped stdout is missing.
    #[error("analyzer stdout unavailable")]
    Stdout,

    /// Reading the analyzer's output stream failed mid-run.
    #[error("failed to read analyzer output: {source}")]
    Read {
        /// Underlying stream error.
        #[source]
        source: std::io::Error,
    },

    /// The lane configuration could not be serialized for the command line.
    #[error("failed to encode lane configuration: {source}")]
    LaneEncoding {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A store operation failed while persisting a record.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SuperviseError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SuperviseError::Launch { .. } => "analyzer_launch_failed",
            SuperviseError::Stdout => "analyzer_stdout_unavailable",
            SuperviseError::Read { .. } => "analyzer_read_failed",
            SuperviseError::LaneEncoding { .. } => "lane_encoding_failed",
            SuperviseError::Store(err) => err.as_label(),
        }
    }
}

/// # Errors produced by the orchestrator runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some pipeline tasks were still running.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Process ids of tasks that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}
