use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of supervised measurement processes.
///
/// One analyzer subprocess runs per raw kind ([`Occupancy`](Self::Occupancy),
/// [`Speed`](Self::Speed)); [`Composed`](Self::Composed) identifies the
/// in-process composition loop that derives the impact indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementKind {
    /// Fraction of the lane region classified as physically occupied.
    Occupancy,
    /// Per-vehicle lane speed samples.
    Speed,
    /// Derived occupancy × relative-speed indicator.
    Composed,
}

impl MeasurementKind {
    /// Returns a short stable label (snake_case) for use in logs and config.
    pub fn as_label(&self) -> &'static str {
        match self {
            MeasurementKind::Occupancy => "occupancy",
            MeasurementKind::Speed => "speed",
            MeasurementKind::Composed => "composed",
        }
    }

    /// Returns the long process-type name used in process records and logs.
    pub fn as_process_type(&self) -> &'static str {
        match self {
            MeasurementKind::Occupancy => "OCCUPANCY_ANALYSIS",
            MeasurementKind::Speed => "SPEED_EVALUATION",
            MeasurementKind::Composed => "COMPOSITION",
        }
    }
}

impl std::fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_process_type())
    }
}

/// Lifecycle status of a supervised process.
///
/// Transitions `Running → Finished` exactly once; the finish transition is
/// idempotent at the store level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Supervision started; the analyzer may or may not have launched yet.
    Running,
    /// Output exhausted, cancelled, or failed. Terminal.
    Finished,
}

/// Historical record of one supervised process.
///
/// Created **before** the external analyzer is launched so that a crash
/// during launch still leaves a discoverable `Running` row. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Process identifier (UUID string).
    pub id: String,
    /// Groups sibling processes launched for one video-processing request.
    pub parent_id: String,
    /// Video source path handed to the analyzer.
    pub source: String,
    /// Which measurement kind this process produces.
    pub kind: MeasurementKind,
    /// Current lifecycle status.
    pub status: ProcessStatus,
    /// Creation timestamp (supervision start).
    pub created_at: DateTime<Utc>,
}

impl ProcessRecord {
    /// Creates a new `Running` record stamped with the current time.
    pub fn running(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        source: impl Into<String>,
        kind: MeasurementKind,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            source: source.into(),
            kind,
            status: ProcessStatus::Running,
            created_at: Utc::now(),
        }
    }
}
