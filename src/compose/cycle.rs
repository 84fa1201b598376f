//! # CompositionLoop: periodic per-lane indicator derivation.
//!
//! One loop runs per parent run (per video), independent of how many
//! measurement kinds exist. Each cycle reads the latest occupancy value and a
//! fresh window of speed samples per lane from the store, composes the
//! indicator, and persists the result back.
//!
//! ## Rules
//! - The loop polls the registry for the **occupancy** process id of its
//!   parent run, not its own id; when that id disappears the loop stops
//!   after finishing the current cycle.
//! - Missing upstream data is not an error: no occupancy → 0.0, no fresh
//!   speed samples → indicator 0.
//! - A store failure for one lane is published and must not abort the other
//!   lanes of the same cycle.
//! - Continuously running and side-effect only: no return value, just
//!   persisted composed results and bus events.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::compose::compose_indicator;
use crate::error::StoreError;
use crate::events::{Bus, Event, EventKind};
use crate::model::{ComposedPayload, ComposedResult, Lane, MeasurementKind, Video};
use crate::registry::ActiveRegistry;
use crate::store::{MeasurementStore, DEFAULT_QUERY_LIMIT};

/// Identity and inputs of one composition loop.
#[derive(Debug, Clone)]
pub struct CompositionJob {
    /// Video whose lanes are composed each cycle.
    pub video: Video,
    /// Parent-run id whose measurements are read and written.
    pub parent_id: String,
    /// Id tagging composition events and results.
    pub process_id: String,
    /// Occupancy process id whose registry entry gates the loop's lifetime.
    pub occupancy_process_id: String,
}

/// Periodic task composing the traffic-impact indicator per lane.
pub struct CompositionLoop<S> {
    store: Arc<S>,
    registry: Arc<ActiveRegistry>,
    bus: Bus,
    interval: Duration,
    freshness: Duration,
    speed_sample_limit: usize,
}

impl<S: MeasurementStore> CompositionLoop<S> {
    /// Creates a loop with the given cadence and freshness window.
    pub fn new(
        store: Arc<S>,
        registry: Arc<ActiveRegistry>,
        bus: Bus,
        interval: Duration,
        freshness: Duration,
        speed_sample_limit: usize,
    ) -> Self {
        Self {
            store,
            registry,
            bus,
            interval,
            freshness,
            speed_sample_limit,
        }
    }

    /// Runs composition cycles until the occupancy process deregisters.
    pub async fn run(&self, job: CompositionJob) {
        loop {
            tokio::time::sleep(self.interval).await;

            for lane in &job.video.lanes {
                if let Err(err) = self.compose_lane(&job, lane).await {
                    self.bus.publish(
                        Event::now(EventKind::CompositionLaneFailed)
                            .with_process(job.process_id.as_str())
                            .with_kind(MeasurementKind::Composed)
                            .with_lane(lane.id.as_str())
                            .with_reason(err.to_string()),
                    );
                }
            }

            if !self.registry.contains(&job.occupancy_process_id).await {
                self.bus.publish(
                    Event::now(EventKind::CompositionFinished)
                        .with_process(job.process_id.as_str())
                        .with_kind(MeasurementKind::Composed),
                );
                break;
            }
        }
    }

    /// Composes and persists one lane's indicator for the current cycle.
    async fn compose_lane(&self, job: &CompositionJob, lane: &Lane) -> Result<(), StoreError> {
        // Latest occupancy regardless of age; the store's limit bounds the
        // pre-lane-filter set, so this needs the generous default.
        let occupancy = self
            .store
            .measurements_by_parent_and_lane(
                MeasurementKind::Occupancy,
                &job.parent_id,
                &lane.id,
                None,
                DEFAULT_QUERY_LIMIT,
            )
            .await?
            .first()
            .and_then(|m| m.value("occupancy"))
            .unwrap_or(0.0);

        let speeds: Vec<f64> = self
            .store
            .measurements_by_parent_and_lane(
                MeasurementKind::Speed,
                &job.parent_id,
                &lane.id,
                Some(self.freshness),
                self.speed_sample_limit,
            )
            .await?
            .iter()
            .filter_map(|m| m.value("speed"))
            .collect();

        let indicator = compose_indicator(occupancy, &speeds, lane.max_speed);
        let result = ComposedPayload {
            occupancy,
            indicator,
        };

        self.store
            .insert_composed(ComposedResult {
                video_id: job.video.id.clone(),
                lane_id: lane.id.clone(),
                parent_id: job.parent_id.clone(),
                created_at: Utc::now(),
                result,
            })
            .await?;

        self.bus.publish(
            Event::now(EventKind::CompositionComputed)
                .with_process(job.process_id.as_str())
                .with_kind(MeasurementKind::Composed)
                .with_lane(lane.id.as_str())
                .with_reason(format!(
                    "occupancy={} indicator={} samples={}",
                    result.occupancy,
                    result.indicator,
                    speeds.len()
                )),
        );
        Ok(())
    }
}
