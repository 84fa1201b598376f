//! Metric composition: indicator math and the periodic composition loop.

mod cycle;
mod indicator;

pub use cycle::{CompositionJob, CompositionLoop};
pub use indicator::compose_indicator;
