//! # Lifecycle events emitted by the supervision pipeline.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Supervision events**: external-analyzer lifecycle (starting, launch
//!   failure, finished, failed).
//! - **Stream events**: per-record delivery (measurement recorded, malformed
//!   line skipped).
//! - **Composition events**: per-cycle indicator output and loop termination.
//!
//! The [`Event`] struct carries metadata such as timestamps, process id,
//! measurement kind, lane id and free-form reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore exact order when events are delivered
//! out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::model::MeasurementKind;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of pipeline events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Supervision events ===
    /// A process supervision is starting; the record was persisted and the
    /// analyzer is about to be launched.
    ///
    /// Sets: `process`, `measurement_kind`, `at`, `seq`.
    ProcessStarting,

    /// The external analyzer could not be spawned. Fatal for this supervision.
    ///
    /// Sets: `process`, `measurement_kind`, `reason`, `at`, `seq`.
    ProcessLaunchFailed,

    /// The supervision ended (output exhausted, cancelled, or failed); the
    /// process record is `Finished` and the registry entry removed.
    ///
    /// Sets: `process`, `measurement_kind`, `at`, `seq`.
    ProcessFinished,

    /// The supervision is ending because of a store or stream error. Emitted
    /// before `ProcessFinished`.
    ///
    /// Sets: `process`, `measurement_kind`, `reason` (error label), `at`, `seq`.
    ProcessFailed,

    // === Stream events ===
    /// One measurement was parsed and persisted.
    ///
    /// Sets: `process`, `measurement_kind`, `reason` (raw payload line),
    /// `at`, `seq`.
    MeasurementRecorded,

    /// A line starting with `{` failed JSON parsing and was skipped.
    ///
    /// Sets: `process`, `measurement_kind`, `reason` (parse error), `at`, `seq`.
    MalformedLine,

    // === Composition events ===
    /// One composed result was persisted for a lane.
    ///
    /// Sets: `process` (composed id), `measurement_kind` (`Composed`),
    /// `lane`, `reason` (values summary), `at`, `seq`.
    CompositionComputed,

    /// A lane failed inside a composition cycle; other lanes continue.
    ///
    /// Sets: `process`, `measurement_kind`, `lane`, `reason`, `at`, `seq`.
    CompositionLaneFailed,

    /// The composition loop observed its occupancy process deregistered and
    /// stopped.
    ///
    /// Sets: `process`, `measurement_kind`, `at`, `seq`.
    CompositionFinished,
}

/// Pipeline event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Process id, if applicable.
    pub process: Option<Arc<str>>,
    /// Measurement kind of the originating process, if applicable.
    pub measurement_kind: Option<MeasurementKind>,
    /// Lane id, for composition events.
    pub lane: Option<Arc<str>>,
    /// Human-readable detail (payload line, error message, values summary).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            process: None,
            measurement_kind: None,
            lane: None,
            reason: None,
        }
    }

    /// Attaches a process id.
    #[inline]
    pub fn with_process(mut self, process: impl Into<Arc<str>>) -> Self {
        self.process = Some(process.into());
        self
    }

    /// Attaches the originating measurement kind.
    #[inline]
    pub fn with_kind(mut self, kind: MeasurementKind) -> Self {
        self.measurement_kind = Some(kind);
        self
    }

    /// Attaches a lane id.
    #[inline]
    pub fn with_lane(mut self, lane: impl Into<Arc<str>>) -> Self {
        self.lane = Some(lane.into());
        self
    }

    /// Attaches a human-readable detail.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::now(EventKind::ProcessStarting);
        let b = Event::now(EventKind::ProcessFinished);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_set_fields() {
        let ev = Event::now(EventKind::CompositionComputed)
            .with_process("p-1")
            .with_kind(MeasurementKind::Composed)
            .with_lane("L1")
            .with_reason("indicator=0.125");

        assert_eq!(ev.process.as_deref(), Some("p-1"));
        assert_eq!(ev.measurement_kind, Some(MeasurementKind::Composed));
        assert_eq!(ev.lane.as_deref(), Some("L1"));
        assert_eq!(ev.reason.as_deref(), Some("indicator=0.125"));
    }
}
