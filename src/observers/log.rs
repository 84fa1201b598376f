use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::events::{Event, EventKind};
use crate::model::MeasurementKind;
use crate::observers::Observer;

/// Base observer that logs events to stdout.
///
/// Enabled via the `logging` feature. Lifecycle events are always printed;
/// per-record output (`MeasurementRecorded`, `CompositionComputed`) is gated
/// by measurement kind so a chatty speed analyzer can be silenced while
/// composition output stays visible.
pub struct LogWriter {
    verbose: HashSet<MeasurementKind>,
}

impl LogWriter {
    /// Creates a writer printing per-record lines only for the given kinds.
    pub fn new(verbose: impl IntoIterator<Item = MeasurementKind>) -> Self {
        Self {
            verbose: verbose.into_iter().collect(),
        }
    }

    /// Creates a writer printing per-record lines for every kind.
    pub fn all() -> Self {
        Self::new([
            MeasurementKind::Occupancy,
            MeasurementKind::Speed,
            MeasurementKind::Composed,
        ])
    }

    fn line(at: std::time::SystemTime, message: &str) {
        let ts: DateTime<Utc> = at.into();
        println!("[{}]: {}", ts.to_rfc3339(), message);
    }

    fn kind_name(e: &Event) -> &'static str {
        e.measurement_kind.map(|k| k.as_process_type()).unwrap_or("?")
    }
}

impl Default for LogWriter {
    fn default() -> Self {
        Self::new([MeasurementKind::Composed])
    }
}

#[async_trait]
impl Observer for LogWriter {
    async fn on_event(&self, e: &Event) {
        let proc = e.process.as_deref().unwrap_or("?");
        match e.kind {
            EventKind::ProcessStarting => {
                Self::line(e.at, &format!("process {proc} ({}) starting", Self::kind_name(e)));
            }
            EventKind::ProcessLaunchFailed => {
                Self::line(
                    e.at,
                    &format!(
                        "process {proc} ({}) launch failed: {}",
                        Self::kind_name(e),
                        e.reason.as_deref().unwrap_or("unknown")
                    ),
                );
            }
            EventKind::ProcessFailed => {
                Self::line(
                    e.at,
                    &format!(
                        "process {proc} ({}) failed: {}",
                        Self::kind_name(e),
                        e.reason.as_deref().unwrap_or("unknown")
                    ),
                );
            }
            EventKind::ProcessFinished | EventKind::CompositionFinished => {
                Self::line(e.at, &format!("process {proc} ({}) finished", Self::kind_name(e)));
            }
            EventKind::MeasurementRecorded | EventKind::CompositionComputed => {
                let gated = e
                    .measurement_kind
                    .map(|k| self.verbose.contains(&k))
                    .unwrap_or(false);
                if gated {
                    Self::line(
                        e.at,
                        &format!(
                            "new value from process {proc} ({}): {}",
                            Self::kind_name(e),
                            e.reason.as_deref().unwrap_or("")
                        ),
                    );
                }
            }
            EventKind::MalformedLine => {
                Self::line(
                    e.at,
                    &format!(
                        "process {proc} ({}) emitted a malformed line, skipped: {}",
                        Self::kind_name(e),
                        e.reason.as_deref().unwrap_or("")
                    ),
                );
            }
            EventKind::CompositionLaneFailed => {
                Self::line(
                    e.at,
                    &format!(
                        "composition for lane {} (process {proc}) failed: {}",
                        e.lane.as_deref().unwrap_or("?"),
                        e.reason.as_deref().unwrap_or("unknown")
                    ),
                );
            }
        }
    }
}
