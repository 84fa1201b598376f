use serde::{Deserialize, Serialize};

/// A monitored traffic lane.
///
/// Geometry is a quadrilateral in frame coordinates, corner order
/// `[top_left, top_right, bottom_left, bottom_right]`. Lanes are immutable
/// once created and referenced by `id` from measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    /// Stable lane identifier embedded in analyzer payloads.
    pub id: String,
    /// Human-readable lane name.
    pub name: String,
    /// Corner coordinates `(column, row)`: top-left, top-right, bottom-left, bottom-right.
    pub coords: [[f64; 2]; 4],
    /// Physical lane length covered by the region, in meters.
    pub length: f64,
    /// Physical lane width, in meters.
    pub width: f64,
    /// Legal speed limit for the lane, in km/h.
    pub max_speed: f64,
}

/// A video source with its configured lanes.
///
/// Owned by the configuration layer; the pipeline only reads it. The lane
/// list is serialized as JSON onto the analyzer command line, so the whole
/// struct round-trips through serde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// Video identifier.
    pub id: String,
    /// Source link (file path or stream URL) handed to analyzers.
    pub link: String,
    /// Ordered lane list.
    pub lanes: Vec<Lane>,
}
