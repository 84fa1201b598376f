//! # Domain model shared across the pipeline.
//!
//! - [`Video`] / [`Lane`]: the monitored source and its lane geometry
//!   (owned by the configuration layer, read-only here).
//! - [`MeasurementKind`] / [`ProcessRecord`]: supervised-process identity
//!   and lifecycle.
//! - [`Measurement`] / [`ComposedResult`]: the raw and derived records the
//!   store persists.

mod measurement;
mod process;
mod video;

pub use measurement::{ComposedHistory, ComposedPayload, ComposedResult, ComposedSample, Measurement};
pub use process::{MeasurementKind, ProcessRecord, ProcessStatus};
pub use video::{Lane, Video};
