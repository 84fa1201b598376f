use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw measurement as received from an analyzer.
///
/// The payload is opaque to the pipeline: analyzers embed the lane id and
/// their kind-specific numeric fields (`occupancy`, `speed`, crossing
/// timestamps, ...) in a JSON object. `created_at` is the wall-clock receipt
/// time assigned by the supervisor, not the production time inside the
/// analyzer, so ordering reflects delivery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Parent-run id grouping sibling processes.
    pub parent_id: String,
    /// Id of the supervised process that produced this record.
    pub process_id: String,
    /// Server-assigned receipt timestamp.
    pub created_at: DateTime<Utc>,
    /// Opaque analyzer payload.
    pub result: serde_json::Value,
}

impl Measurement {
    /// Creates a measurement stamped with the current time.
    pub fn received_now(
        parent_id: impl Into<String>,
        process_id: impl Into<String>,
        result: serde_json::Value,
    ) -> Self {
        Self {
            parent_id: parent_id.into(),
            process_id: process_id.into(),
            created_at: Utc::now(),
            result,
        }
    }

    /// Lane id embedded in the payload, if present.
    pub fn lane_id(&self) -> Option<&str> {
        self.result.get("lane_id")?.as_str()
    }

    /// Numeric payload field, if present.
    pub fn value(&self, field: &str) -> Option<f64> {
        self.result.get(field)?.as_f64()
    }
}

/// Payload of one composed result: the inputs' occupancy and the derived
/// traffic-impact indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComposedPayload {
    /// Latest lane occupancy used in the cycle (0 when none was available).
    pub occupancy: f64,
    /// `occupancy × (avg(speed window) / max_speed)`, rounded to 4 decimals.
    pub indicator: f64,
}

/// One composed result per lane per composition cycle. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedResult {
    /// Video the lane belongs to.
    pub video_id: String,
    /// Lane the indicator was computed for.
    pub lane_id: String,
    /// Parent-run id whose measurements were read.
    pub parent_id: String,
    /// Composition cycle timestamp.
    pub created_at: DateTime<Utc>,
    /// Computed values.
    pub result: ComposedPayload,
}

/// One entry of a lane's composed-result history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedSample {
    /// Composition cycle timestamp.
    pub created_at: DateTime<Utc>,
    /// Computed values.
    pub result: ComposedPayload,
}

/// Read-side grouping of composed results for one parent run:
/// lane id → newest-first samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedHistory {
    /// Parent-run id the history belongs to.
    pub parent_id: String,
    /// Per-lane sequences, newest first.
    pub lanes: HashMap<String, Vec<ComposedSample>>,
}
