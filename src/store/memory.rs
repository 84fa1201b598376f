//! In-memory store backend.
//!
//! Reference implementation of [`MeasurementStore`]: per-kind vectors behind
//! one `RwLock`, sorted on read. Concurrent writers serialize on the lock, so
//! no partial record is ever visible to readers.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::model::{
    ComposedHistory, ComposedResult, ComposedSample, Measurement, MeasurementKind, ProcessRecord,
    ProcessStatus,
};
use crate::store::store::{MeasurementStore, DEFAULT_QUERY_LIMIT};

#[derive(Debug, Default)]
struct Inner {
    processes: Vec<ProcessRecord>,
    measurements: HashMap<MeasurementKind, Vec<Measurement>>,
    composed: Vec<ComposedResult>,
}

/// In-memory [`MeasurementStore`] for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn freshness_threshold(newer_than: Option<Duration>) -> Option<DateTime<Utc>> {
    let window = newer_than?;
    let millis = window.as_millis().min(i64::MAX as u128) as i64;
    Some(Utc::now() - chrono::Duration::milliseconds(millis))
}

#[async_trait]
impl MeasurementStore for MemoryStore {
    async fn insert_process(&self, record: ProcessRecord) -> Result<(), StoreError> {
        self.inner.write().await.processes.push(record);
        Ok(())
    }

    async fn finish_process(&self, process_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.processes.iter_mut().find(|p| p.id == process_id) {
            record.status = ProcessStatus::Finished;
        }
        Ok(())
    }

    async fn list_processes(&self) -> Result<Vec<ProcessRecord>, StoreError> {
        let inner = self.inner.read().await;
        let mut records = inner.processes.clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(DEFAULT_QUERY_LIMIT);
        Ok(records)
    }

    async fn insert_measurement(
        &self,
        kind: MeasurementKind,
        measurement: Measurement,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.measurements.entry(kind).or_default().push(measurement);
        Ok(())
    }

    async fn measurements_by_parent(
        &self,
        kind: MeasurementKind,
        parent_id: &str,
        limit: usize,
    ) -> Result<Vec<Measurement>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Measurement> = inner
            .measurements
            .get(&kind)
            .map(|table| {
                table
                    .iter()
                    .filter(|m| m.parent_id == parent_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn measurements_by_parent_and_lane(
        &self,
        kind: MeasurementKind,
        parent_id: &str,
        lane_id: &str,
        newer_than: Option<Duration>,
        limit: usize,
    ) -> Result<Vec<Measurement>, StoreError> {
        let threshold = freshness_threshold(newer_than);
        let inner = self.inner.read().await;
        let mut rows: Vec<Measurement> = inner
            .measurements
            .get(&kind)
            .map(|table| {
                table
                    .iter()
                    .filter(|m| m.parent_id == parent_id)
                    .filter(|m| threshold.map_or(true, |t| m.created_at > t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        // Lane filter comes after the limit: `limit` bounds the pre-filter set.
        rows.retain(|m| m.lane_id() == Some(lane_id));
        Ok(rows)
    }

    async fn insert_composed(&self, result: ComposedResult) -> Result<(), StoreError> {
        self.inner.write().await.composed.push(result);
        Ok(())
    }

    async fn composed_by_parent(&self, parent_id: &str) -> Result<ComposedHistory, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<&ComposedResult> = inner
            .composed
            .iter()
            .filter(|c| c.parent_id == parent_id)
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(DEFAULT_QUERY_LIMIT);

        let mut lanes: HashMap<String, Vec<ComposedSample>> = HashMap::new();
        for row in rows {
            lanes.entry(row.lane_id.clone()).or_default().push(ComposedSample {
                created_at: row.created_at,
                result: row.result,
            });
        }
        Ok(ComposedHistory {
            parent_id: parent_id.to_string(),
            lanes,
        })
    }
}
