//! # Orchestrator: the control surface of the pipeline.
//!
//! Receives start/stop requests, allocates identifiers, spawns one
//! [`ProcessSupervisor`] per analyzer kind plus one [`CompositionLoop`] per
//! video, and exposes read endpoints over the store.
//!
//! ## Architecture
//! ```text
//!  start(video)
//!    ├─► parent-run id + one process id per measurement kind
//!    ├─► registry.insert(occupancy_id), registry.insert(speed_id)
//!    ├─► spawn ProcessSupervisor (occupancy)  ──┐
//!    ├─► spawn ProcessSupervisor (speed)      ──┼──► MeasurementStore
//!    └─► spawn CompositionLoop                ◄─┘   (reads raw, writes composed)
//!
//!  stop(process_id) ──► registry.remove(process_id)   — cooperative, polled
//! ```
//!
//! ## Rules
//! - `stop` is not immediate: the owning supervisor notices on its next poll,
//!   after persisting the record it was handling.
//! - `shutdown` clears the whole registry and drains task handles under the
//!   configured grace; stragglers are reported, never silently dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::compose::{CompositionJob, CompositionLoop};
use crate::config::Config;
use crate::error::{RuntimeError, StoreError, SuperviseError};
use crate::events::{Bus, Event};
use crate::model::{ComposedHistory, Measurement, MeasurementKind, ProcessRecord, Video};
use crate::observers::Observer;
use crate::registry::{ActiveEntry, ActiveRegistry};
use crate::store::MeasurementStore;
use crate::supervise::{AnalyzerCommand, ProcessSupervisor, SuperviseJob};

/// Identifiers allocated by [`Orchestrator::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedRun {
    /// Groups all sibling processes of this request.
    pub parent_id: String,
    /// Occupancy analyzer process id. Stopping it also ends composition.
    pub occupancy_id: String,
    /// Speed analyzer process id.
    pub speed_id: String,
    /// Composition loop id (tags composed events; not registered).
    pub composed_id: String,
}

/// Pipeline orchestrator.
pub struct Orchestrator<S> {
    store: Arc<S>,
    registry: Arc<ActiveRegistry>,
    bus: Bus,
    config: Config,
    shutdown_token: CancellationToken,
    handles: Mutex<Vec<(String, JoinHandle<()>)>>,
}

impl<S: MeasurementStore> Orchestrator<S> {
    /// Creates an orchestrator over the given store.
    pub fn new(store: Arc<S>, config: Config) -> Arc<Self> {
        Arc::new(Self {
            store,
            registry: ActiveRegistry::new(),
            bus: Bus::new(config.bus_capacity),
            config,
            shutdown_token: CancellationToken::new(),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Snapshot of currently registered processes, sorted by process id.
    pub async fn active(&self) -> Vec<(String, ActiveEntry)> {
        self.registry.list().await
    }

    /// Subscribes to pipeline events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Spawns a listener task fanning bus events into `observer`.
    ///
    /// The task runs until `shutdown` or until the bus closes.
    pub fn spawn_observer<O: Observer>(&self, observer: Arc<O>) {
        let mut rx = self.bus.subscribe();
        let token = self.shutdown_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => observer.on_event(&ev).await,
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => continue,
                    }
                }
            }
        });
    }

    /// Starts processing one video: two supervised analyzers plus the
    /// composition loop, all tagged with a fresh parent-run id.
    ///
    /// Registry entries are inserted before the supervisors spawn, so a
    /// supervisor's first liveness poll always sees its own id.
    pub async fn start(&self, video: Video) -> Result<StartedRun, SuperviseError> {
        let run = StartedRun {
            parent_id: Uuid::new_v4().to_string(),
            occupancy_id: Uuid::new_v4().to_string(),
            speed_id: Uuid::new_v4().to_string(),
            composed_id: Uuid::new_v4().to_string(),
        };

        let analyzers = &self.config.analyzers;
        let occupancy_cmd = AnalyzerCommand::build(
            &analyzers.program,
            &analyzers.occupancy_script,
            &video,
            analyzers.debug,
        )?;
        let speed_cmd = AnalyzerCommand::build(
            &analyzers.program,
            &analyzers.speed_script,
            &video,
            analyzers.debug,
        )?;

        self.registry
            .insert(
                &run.occupancy_id,
                ActiveEntry {
                    kind: MeasurementKind::Occupancy,
                    source: video.link.clone(),
                },
            )
            .await;
        self.registry
            .insert(
                &run.speed_id,
                ActiveEntry {
                    kind: MeasurementKind::Speed,
                    source: video.link.clone(),
                },
            )
            .await;

        let mut handles = self.handles.lock().await;
        handles.push((
            run.occupancy_id.clone(),
            self.spawn_supervisor(SuperviseJob {
                parent_id: run.parent_id.clone(),
                process_id: run.occupancy_id.clone(),
                kind: MeasurementKind::Occupancy,
                source: video.link.clone(),
                command: occupancy_cmd,
            }),
        ));
        handles.push((
            run.speed_id.clone(),
            self.spawn_supervisor(SuperviseJob {
                parent_id: run.parent_id.clone(),
                process_id: run.speed_id.clone(),
                kind: MeasurementKind::Speed,
                source: video.link.clone(),
                command: speed_cmd,
            }),
        ));
        handles.push((
            run.composed_id.clone(),
            self.spawn_composition(CompositionJob {
                video,
                parent_id: run.parent_id.clone(),
                process_id: run.composed_id.clone(),
                occupancy_process_id: run.occupancy_id.clone(),
            }),
        ));

        Ok(run)
    }

    /// Requests cooperative cancellation of one process.
    ///
    /// Returns whether the id was registered. The analyzer keeps running
    /// until its supervisor's next poll.
    pub async fn stop(&self, process_id: &str) -> bool {
        self.registry.remove(process_id).await
    }

    /// All supervised-process records, newest first.
    pub async fn processes(&self) -> Result<Vec<ProcessRecord>, StoreError> {
        self.store.list_processes().await
    }

    /// Measurements of one kind for a parent run, newest first.
    pub async fn measurements_by_parent(
        &self,
        kind: MeasurementKind,
        parent_id: &str,
    ) -> Result<Vec<Measurement>, StoreError> {
        self.store
            .measurements_by_parent(kind, parent_id, self.config.query_limit)
            .await
    }

    /// Lane-filtered measurements for a parent run, newest first.
    pub async fn measurements_by_parent_and_lane(
        &self,
        kind: MeasurementKind,
        parent_id: &str,
        lane_id: &str,
        newer_than: Option<Duration>,
    ) -> Result<Vec<Measurement>, StoreError> {
        self.store
            .measurements_by_parent_and_lane(
                kind,
                parent_id,
                lane_id,
                newer_than,
                self.config.query_limit,
            )
            .await
    }

    /// Composed results for a parent run, grouped by lane, newest first.
    pub async fn composed_by_parent(&self, parent_id: &str) -> Result<ComposedHistory, StoreError> {
        self.store.composed_by_parent(parent_id).await
    }

    /// Cancels everything and drains pipeline tasks under the grace period.
    ///
    /// Clears the registry (every supervisor and composition loop stops on
    /// its next poll) and awaits their handles. Tasks still running when the
    /// grace elapses are reported via [`RuntimeError::GraceExceeded`].
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.registry.clear().await;
        self.shutdown_token.cancel();

        let drained: Vec<(String, JoinHandle<()>)> = {
            let mut handles = self.handles.lock().await;
            handles.drain(..).collect()
        };

        let deadline = Instant::now() + self.config.grace;
        let mut stuck = Vec::new();
        for (id, handle) in drained {
            if timeout_at(deadline, handle).await.is_err() {
                stuck.push(id);
            }
        }

        if stuck.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::GraceExceeded {
                grace: self.config.grace,
                stuck,
            })
        }
    }

    fn spawn_supervisor(&self, job: SuperviseJob) -> JoinHandle<()> {
        let supervisor = ProcessSupervisor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            self.bus.clone(),
            self.config.grace,
        );
        tokio::spawn(async move {
            // Errors are published on the bus by the supervisor itself.
            let _ = supervisor.run(job).await;
        })
    }

    fn spawn_composition(&self, job: CompositionJob) -> JoinHandle<()> {
        let composer = CompositionLoop::new(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            self.bus.clone(),
            self.config.compose_interval,
            self.config.speed_freshness,
            self.config.speed_sample_limit,
        );
        tokio::spawn(async move {
            composer.run(job).await;
        })
    }
}
