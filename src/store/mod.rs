//! Measurement store: insert/query contract and the in-memory backend.
//!
//! The pipeline talks to durable storage only through the
//! [`MeasurementStore`] trait; the storage engine itself is an external
//! collaborator. [`MemoryStore`] is the reference implementation backing
//! tests and single-process deployments.

mod memory;
mod store;

pub use memory::MemoryStore;
pub use store::{MeasurementStore, DEFAULT_QUERY_LIMIT};
