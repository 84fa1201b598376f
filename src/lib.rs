//! # trafficvisor
//!
//! **Trafficvisor** supervises long-running external traffic-lane analyzer
//! processes, ingests their streamed measurement output, persists it durably,
//! and periodically composes a per-lane traffic-impact indicator from rolling
//! windows of the raw measurements.
//!
//! ## Architecture
//! ```text
//!       start(video) / stop(process_id)
//!                  │
//!                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                     │
//! │  - allocates parent-run id + one process id per measurement kind  │
//! │  - ActiveRegistry (the only cancellation surface, polled)         │
//! │  - Bus (broadcast events) → Observer listeners                    │
//! └─────┬───────────────────────┬──────────────────────┬──────────────┘
//!       ▼                       ▼                      ▼
//! ┌──────────────────┐  ┌──────────────────┐  ┌───────────────────┐
//! │ ProcessSupervisor│  │ ProcessSupervisor│  │  CompositionLoop  │
//! │   (occupancy)    │  │     (speed)      │  │  (per video, 5s)  │
//! └──────┬───────────┘  └──────┬───────────┘  └──────┬────────────┘
//!        │ analyzer stdout,    │                     │ reads latest
//!        │ one JSON per line   │                     │ occupancy + fresh
//!        ▼                     ▼                     ▼ speed window
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  MeasurementStore (trait; MemoryStore reference backend)          │
//! │  raw measurements ──────────────► composed results per lane       │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! ```text
//! ProcessSupervisor::run(job)
//!   ├─► persist ProcessRecord (Running)    — before launch
//!   ├─► spawn analyzer, stream lines
//!   │     ├─ diagnostics (non-`{`)  → skipped
//!   │     ├─ malformed `{` line     → skipped with MalformedLine event
//!   │     └─ measurement            → persisted with receipt timestamp
//!   ├─► poll registry after each record
//!   │     └─ id removed → SIGTERM, grace, SIGKILL
//!   └─► finish record (idempotent), deregister, ProcessFinished
//!
//! CompositionLoop::run(job)           — ends when the occupancy process
//!   every interval, per lane:           deregisters
//!     indicator = occupancy × (avg(fresh speeds) / max_speed)
//! ```
//!
//! ## Core concepts
//!
//! | Concept          | What it is                                               | Entry points                            |
//! |------------------|----------------------------------------------------------|-----------------------------------------|
//! | **Supervision**  | One analyzer subprocess, streamed and cancellable.       | [`ProcessSupervisor`], [`SuperviseJob`] |
//! | **Composition**  | Periodic per-lane indicator derivation.                  | [`CompositionLoop`], [`compose_indicator`] |
//! | **Storage**      | Append/query contract for all records.                   | [`MeasurementStore`], [`MemoryStore`]   |
//! | **Cancellation** | Registry-polled, cooperative, at-least-once.             | [`ActiveRegistry`], [`Orchestrator::stop`] |
//! | **Observability**| Broadcast events with monotonic sequence numbers.        | [`Bus`], [`Event`], [`Observer`]        |
//! | **Errors**       | Typed errors for store, supervision and runtime.         | [`StoreError`], [`SuperviseError`], [`RuntimeError`] |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] observer _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use trafficvisor::{Config, MemoryStore, Orchestrator, Video};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let orchestrator = Orchestrator::new(store, Config::default());
//!
//!     #[cfg(feature = "logging")]
//!     orchestrator.spawn_observer(Arc::new(trafficvisor::LogWriter::default()));
//!
//!     let video: Video = serde_json::from_str(
//!         r#"{"id":"v-1","link":"videos/crossing.mp4","lanes":[]}"#,
//!     )?;
//!
//!     let run = orchestrator.start(video).await?;
//!     // ... later: cooperative stop, then drain.
//!     orchestrator.stop(&run.occupancy_id).await;
//!     orchestrator.stop(&run.speed_id).await;
//!     orchestrator.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod compose;
mod config;
mod error;
mod events;
mod model;
mod observers;
mod orchestrator;
mod registry;
mod store;
mod supervise;

// ---- Public re-exports ----

pub use compose::{compose_indicator, CompositionJob, CompositionLoop};
pub use config::{AnalyzerConfig, Config};
pub use error::{RuntimeError, StoreError, SuperviseError};
pub use events::{Bus, Event, EventKind};
pub use model::{
    ComposedHistory, ComposedPayload, ComposedResult, ComposedSample, Lane, Measurement,
    MeasurementKind, ProcessRecord, ProcessStatus, Video,
};
pub use observers::Observer;
pub use orchestrator::{Orchestrator, StartedRun};
pub use registry::{ActiveEntry, ActiveRegistry};
pub use store::{MeasurementStore, MemoryStore, DEFAULT_QUERY_LIMIT};
pub use supervise::{AnalyzerCommand, ProcessSupervisor, SuperviseJob};

// Optional: expose the built-in logging observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
