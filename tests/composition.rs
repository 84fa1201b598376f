//! Composition-loop scenarios over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::time::timeout;

use trafficvisor::{
    ActiveEntry, ActiveRegistry, Bus, ComposedHistory, ComposedResult, CompositionJob,
    CompositionLoop, EventKind, Lane, Measurement, MeasurementKind, MeasurementStore, MemoryStore,
    ProcessRecord, StoreError, Video,
};

const INTERVAL: Duration = Duration::from_millis(50);
const FRESHNESS: Duration = Duration::from_secs(60);

fn lane(id: &str, max_speed: f64) -> Lane {
    Lane {
        id: id.to_string(),
        name: format!("lane {id}"),
        coords: [[0.0, 0.0], [10.0, 0.0], [0.0, 20.0], [10.0, 20.0]],
        length: 25.0,
        width: 3.5,
        max_speed,
    }
}

fn two_lane_video() -> Video {
    Video {
        id: "v-1".to_string(),
        link: "video.mp4".to_string(),
        lanes: vec![lane("L1", 100.0), lane("L2", 100.0)],
    }
}

fn composer(
    store: &Arc<MemoryStore>,
    registry: &Arc<ActiveRegistry>,
) -> CompositionLoop<MemoryStore> {
    CompositionLoop::new(
        Arc::clone(store),
        Arc::clone(registry),
        Bus::new(64),
        INTERVAL,
        FRESHNESS,
        10,
    )
}

fn job(video: Video) -> CompositionJob {
    CompositionJob {
        video,
        parent_id: "run-1".to_string(),
        process_id: "p-composed".to_string(),
        occupancy_process_id: "p-occ".to_string(),
    }
}

async fn register_occupancy(registry: &ActiveRegistry) {
    registry
        .insert(
            "p-occ",
            ActiveEntry {
                kind: MeasurementKind::Occupancy,
                source: "video.mp4".to_string(),
            },
        )
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn end_to_end_two_lanes() {
    let store = Arc::new(MemoryStore::new());
    let registry = ActiveRegistry::new();
    register_occupancy(&registry).await;

    store
        .insert_measurement(
            MeasurementKind::Occupancy,
            Measurement::received_now("run-1", "p-occ", json!({"lane_id": "L1", "occupancy": 0.30})),
        )
        .await
        .unwrap();
    for speed in [45.0, 50.0, 55.0] {
        store
            .insert_measurement(
                MeasurementKind::Speed,
                Measurement::received_now("run-1", "p-speed", json!({"lane_id": "L1", "speed": speed})),
            )
            .await
            .unwrap();
    }

    let composer = composer(&store, &registry);
    let handle = tokio::spawn(async move { composer.run(job(two_lane_video())).await });

    // Let at least one full cycle run, then end the parent supervision.
    tokio::time::sleep(INTERVAL * 3).await;
    registry.remove("p-occ").await;
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("composition loop did not stop")
        .unwrap();

    let history = store.composed_by_parent("run-1").await.unwrap();
    let l1 = &history.lanes["L1"][0];
    assert_eq!(l1.result.occupancy, 0.30);
    assert_eq!(l1.result.indicator, 0.15); // 0.30 × (50 / 100)

    let l2 = &history.lanes["L2"][0];
    assert_eq!(l2.result.occupancy, 0.0);
    assert_eq!(l2.result.indicator, 0.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn stale_speed_samples_yield_zero_indicator() {
    let store = Arc::new(MemoryStore::new());
    let registry = ActiveRegistry::new();
    register_occupancy(&registry).await;

    store
        .insert_measurement(
            MeasurementKind::Occupancy,
            Measurement::received_now("run-1", "p-occ", json!({"lane_id": "L1", "occupancy": 0.40})),
        )
        .await
        .unwrap();
    // Outside the freshness window: must not contribute to the indicator.
    store
        .insert_measurement(
            MeasurementKind::Speed,
            Measurement {
                parent_id: "run-1".to_string(),
                process_id: "p-speed".to_string(),
                created_at: Utc::now() - chrono::Duration::seconds(3600),
                result: json!({"lane_id": "L1", "speed": 80.0}),
            },
        )
        .await
        .unwrap();

    let composer = composer(&store, &registry);
    let video = Video {
        lanes: vec![lane("L1", 100.0)],
        ..two_lane_video()
    };
    let handle = tokio::spawn(async move { composer.run(job(video)).await });

    tokio::time::sleep(INTERVAL * 3).await;
    registry.remove("p-occ").await;
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("composition loop did not stop")
        .unwrap();

    let history = store.composed_by_parent("run-1").await.unwrap();
    let l1 = &history.lanes["L1"][0];
    assert_eq!(l1.result.occupancy, 0.40);
    assert_eq!(l1.result.indicator, 0.0);
}

/// Store double whose lane-filtered reads fail for one lane only.
struct LaneFailingStore {
    inner: MemoryStore,
    broken_lane: &'static str,
}

#[async_trait]
impl MeasurementStore for LaneFailingStore {
    async fn insert_process(&self, record: ProcessRecord) -> Result<(), StoreError> {
        self.inner.insert_process(record).await
    }

    async fn finish_process(&self, process_id: &str) -> Result<(), StoreError> {
        self.inner.finish_process(process_id).await
    }

    async fn list_processes(&self) -> Result<Vec<ProcessRecord>, StoreError> {
        self.inner.list_processes().await
    }

    async fn insert_measurement(
        &self,
        kind: MeasurementKind,
        measurement: Measurement,
    ) -> Result<(), StoreError> {
        self.inner.insert_measurement(kind, measurement).await
    }

    async fn measurements_by_parent(
        &self,
        kind: MeasurementKind,
        parent_id: &str,
        limit: usize,
    ) -> Result<Vec<Measurement>, StoreError> {
        self.inner.measurements_by_parent(kind, parent_id, limit).await
    }

    async fn measurements_by_parent_and_lane(
        &self,
        kind: MeasurementKind,
        parent_id: &str,
        lane_id: &str,
        newer_than: Option<Duration>,
        limit: usize,
    ) -> Result<Vec<Measurement>, StoreError> {
        if lane_id == self.broken_lane {
            return Err(StoreError::Unavailable {
                reason: format!("shard for lane {lane_id} down"),
            });
        }
        self.inner
            .measurements_by_parent_and_lane(kind, parent_id, lane_id, newer_than, limit)
            .await
    }

    async fn insert_composed(&self, result: ComposedResult) -> Result<(), StoreError> {
        self.inner.insert_composed(result).await
    }

    async fn composed_by_parent(&self, parent_id: &str) -> Result<ComposedHistory, StoreError> {
        self.inner.composed_by_parent(parent_id).await
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn lane_store_failure_does_not_abort_other_lanes() {
    let store = Arc::new(LaneFailingStore {
        inner: MemoryStore::new(),
        broken_lane: "L1",
    });
    let registry = ActiveRegistry::new();
    register_occupancy(&registry).await;

    store
        .insert_measurement(
            MeasurementKind::Occupancy,
            Measurement::received_now("run-1", "p-occ", json!({"lane_id": "L2", "occupancy": 0.50})),
        )
        .await
        .unwrap();
    store
        .insert_measurement(
            MeasurementKind::Speed,
            Measurement::received_now("run-1", "p-speed", json!({"lane_id": "L2", "speed": 50.0})),
        )
        .await
        .unwrap();

    let bus = Bus::new(64);
    let mut events = bus.subscribe();
    let composer = CompositionLoop::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        bus,
        INTERVAL,
        FRESHNESS,
        10,
    );
    let handle = tokio::spawn(async move { composer.run(job(two_lane_video())).await });

    tokio::time::sleep(INTERVAL * 3).await;
    registry.remove("p-occ").await;
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("composition loop did not stop")
        .unwrap();

    // The healthy lane keeps composing every cycle; the broken one never
    // lands a result.
    let history = store.composed_by_parent("run-1").await.unwrap();
    assert!(!history.lanes.contains_key("L1"));
    let l2 = &history.lanes["L2"][0];
    assert_eq!(l2.result.occupancy, 0.50);
    assert_eq!(l2.result.indicator, 0.25); // 0.50 × (50 / 100)

    let mut saw_lane_failure = false;
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::CompositionLaneFailed {
            saw_lane_failure = true;
            assert_eq!(ev.lane.as_deref(), Some("L1"));
        }
    }
    assert!(saw_lane_failure, "expected a CompositionLaneFailed event");
}

#[tokio::test(flavor = "multi_thread")]
async fn loop_runs_one_final_cycle_after_parent_ends() {
    let store = Arc::new(MemoryStore::new());
    let registry = ActiveRegistry::new();
    // Occupancy process never registered: the loop composes one cycle, then
    // observes the missing parent and stops.
    let composer = composer(&store, &registry);
    let handle = tokio::spawn(async move { composer.run(job(two_lane_video())).await });

    timeout(Duration::from_secs(2), handle)
        .await
        .expect("composition loop did not stop")
        .unwrap();

    let history = store.composed_by_parent("run-1").await.unwrap();
    assert_eq!(history.lanes["L1"].len(), 1);
    assert_eq!(history.lanes["L2"].len(), 1);
}
