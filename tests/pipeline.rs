//! Orchestrator end-to-end round trip with script-backed analyzers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use trafficvisor::{
    AnalyzerConfig, Config, Lane, MeasurementKind, MeasurementStore, MemoryStore, Orchestrator,
    ProcessStatus, Video,
};

/// Writes a fake analyzer script to a temp path; invoked as `sh <script> ...`
/// so the extra contract args are simply ignored.
fn write_script(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("trafficvisor_{}_{}.sh", name, std::process::id()));
    std::fs::write(&path, body).expect("write analyzer script");
    path
}

fn video() -> Video {
    let lane = |id: &str| Lane {
        id: id.to_string(),
        name: format!("lane {id}"),
        coords: [[0.0, 0.0], [10.0, 0.0], [0.0, 20.0], [10.0, 20.0]],
        length: 25.0,
        width: 3.5,
        max_speed: 100.0,
    };
    Video {
        id: "v-1".to_string(),
        link: "videos/crossing.mp4".to_string(),
        lanes: vec![lane("L1"), lane("L2")],
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn start_stream_stop_shutdown_round_trip() {
    let occupancy_script = write_script(
        "occ",
        "while true; do echo '{\"lane_id\":\"L1\",\"occupancy\":0.30}'; sleep 0.1; done\n",
    );
    let speed_script = write_script(
        "speed",
        "while true; do echo '{\"lane_id\":\"L1\",\"speed\":50}'; sleep 0.1; done\n",
    );

    let config = Config {
        compose_interval: Duration::from_millis(100),
        grace: Duration::from_secs(3),
        analyzers: AnalyzerConfig {
            program: "sh".to_string(),
            occupancy_script: occupancy_script.to_string_lossy().into_owned(),
            speed_script: speed_script.to_string_lossy().into_owned(),
            debug: false,
        },
        ..Config::default()
    };

    let store = Arc::new(MemoryStore::new());
    let orchestrator = Orchestrator::new(Arc::clone(&store), config);

    let run = orchestrator.start(video()).await.unwrap();

    let active = orchestrator.active().await;
    assert_eq!(active.len(), 2);
    assert!(active.iter().any(|(id, _)| id == &run.occupancy_id));
    assert!(active.iter().any(|(id, _)| id == &run.speed_id));

    // Wait until raw measurements and at least one composed cycle landed.
    timeout(Duration::from_secs(10), async {
        loop {
            let occ = store
                .measurements_by_parent(MeasurementKind::Occupancy, &run.parent_id, 10)
                .await
                .unwrap();
            let speed = store
                .measurements_by_parent(MeasurementKind::Speed, &run.parent_id, 10)
                .await
                .unwrap();
            let composed = store.composed_by_parent(&run.parent_id).await.unwrap();
            if !occ.is_empty() && !speed.is_empty() && composed.lanes.contains_key("L1") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .expect("pipeline produced no data");

    let history = orchestrator.composed_by_parent(&run.parent_id).await.unwrap();
    let l1 = &history.lanes["L1"][0];
    assert_eq!(l1.result.occupancy, 0.30);
    assert_eq!(l1.result.indicator, 0.15); // 0.30 × (50 / 100)
    if let Some(l2) = history.lanes.get("L2") {
        assert_eq!(l2[0].result.indicator, 0.0);
    }

    // Cooperative stop: second call observes the id already gone.
    assert!(orchestrator.stop(&run.speed_id).await);
    assert!(orchestrator.stop(&run.occupancy_id).await);
    assert!(!orchestrator.stop(&run.occupancy_id).await);

    orchestrator.shutdown().await.unwrap();
    assert!(orchestrator.active().await.is_empty());

    let processes = orchestrator.processes().await.unwrap();
    assert_eq!(processes.len(), 2);
    assert!(processes.iter().all(|p| p.status == ProcessStatus::Finished));
    assert!(processes.iter().all(|p| p.parent_id == run.parent_id));

    let _ = std::fs::remove_file(occupancy_script);
    let _ = std::fs::remove_file(speed_script);
}

#[tokio::test(flavor = "multi_thread")]
async fn exhausted_analyzers_wind_down_without_stop() {
    let occupancy_script = write_script(
        "occ_once",
        "echo '{\"lane_id\":\"L1\",\"occupancy\":0.25}'\n",
    );
    let speed_script = write_script(
        "speed_once",
        "echo '{\"lane_id\":\"L1\",\"speed\":40}'\necho '{\"lane_id\":\"L1\",\"speed\":60}'\n",
    );

    let config = Config {
        compose_interval: Duration::from_millis(50),
        grace: Duration::from_secs(3),
        analyzers: AnalyzerConfig {
            program: "sh".to_string(),
            occupancy_script: occupancy_script.to_string_lossy().into_owned(),
            speed_script: speed_script.to_string_lossy().into_owned(),
            debug: false,
        },
        ..Config::default()
    };

    let store = Arc::new(MemoryStore::new());
    let orchestrator = Orchestrator::new(Arc::clone(&store), config);
    let run = orchestrator.start(video()).await.unwrap();

    // Both analyzers exhaust on their own; the composition loop then sees the
    // occupancy id gone and stops, so shutdown has nothing left to drain.
    timeout(Duration::from_secs(10), async {
        loop {
            let processes = store.list_processes().await.unwrap();
            let all_finished = processes.len() == 2
                && processes.iter().all(|p| p.status == ProcessStatus::Finished);
            if all_finished {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .expect("analyzers never finished");

    orchestrator.shutdown().await.unwrap();

    let speeds = store
        .measurements_by_parent(MeasurementKind::Speed, &run.parent_id, 10)
        .await
        .unwrap();
    assert_eq!(speeds.len(), 2);

    let _ = std::fs::remove_file(occupancy_script);
    let _ = std::fs::remove_file(speed_script);
}
