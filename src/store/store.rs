//! # Store contract for processes, measurements and composed results.
//!
//! All operations are keyed by measurement kind, parent-run id, process id,
//! lane id and timestamp. Reads sort by timestamp descending and are capped
//! to keep result sets bounded under unbounded-length analyzer runs.
//!
//! ## Rules
//! - Inserts are append-only; records are never mutated after the fact.
//!   Duplicate timestamps are permitted and never fail the caller.
//! - The time filter of
//!   [`measurements_by_parent_and_lane`](MeasurementStore::measurements_by_parent_and_lane)
//!   is applied **before** the lane filter: `limit` bounds the pre-filter
//!   result count, so callers must pass a limit generous enough that lane
//!   filtering still yields enough matches.
//! - Unavailability surfaces as a retriable [`StoreError`]; the caller
//!   decides whether to retry or abort its cycle.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{ComposedHistory, ComposedResult, Measurement, MeasurementKind, ProcessRecord};

/// Default cap on unbounded queries.
pub const DEFAULT_QUERY_LIMIT: usize = 1000;

/// Durable, time-ordered append/query store for the pipeline.
#[async_trait]
pub trait MeasurementStore: Send + Sync + 'static {
    /// Appends a supervised-process record.
    async fn insert_process(&self, record: ProcessRecord) -> Result<(), StoreError>;

    /// Transitions a process record to `Finished`.
    ///
    /// Idempotent: a second call, or a call for an unknown id, is a no-op.
    async fn finish_process(&self, process_id: &str) -> Result<(), StoreError>;

    /// All process records, newest first, capped at [`DEFAULT_QUERY_LIMIT`].
    async fn list_processes(&self) -> Result<Vec<ProcessRecord>, StoreError>;

    /// Appends one measurement under the given kind.
    async fn insert_measurement(
        &self,
        kind: MeasurementKind,
        measurement: Measurement,
    ) -> Result<(), StoreError>;

    /// Measurements for a parent run, newest first, capped at `limit`.
    async fn measurements_by_parent(
        &self,
        kind: MeasurementKind,
        parent_id: &str,
        limit: usize,
    ) -> Result<Vec<Measurement>, StoreError>;

    /// Measurements for a parent run and lane, newest first.
    ///
    /// When `newer_than` is supplied only records with
    /// `created_at > now - newer_than` are considered. The parent/time filter
    /// and `limit` apply **before** the lane filter.
    async fn measurements_by_parent_and_lane(
        &self,
        kind: MeasurementKind,
        parent_id: &str,
        lane_id: &str,
        newer_than: Option<Duration>,
        limit: usize,
    ) -> Result<Vec<Measurement>, StoreError>;

    /// Appends one composed result.
    async fn insert_composed(&self, result: ComposedResult) -> Result<(), StoreError>;

    /// Composed results for a parent run, grouped by lane id, newest first
    /// within each lane, capped at [`DEFAULT_QUERY_LIMIT`] overall.
    async fn composed_by_parent(&self, parent_id: &str) -> Result<ComposedHistory, StoreError>;
}
