//! # ProcessSupervisor: one external analyzer, supervised.
//!
//! Supervises a single analyzer subprocess through its full lifecycle:
//! `Starting → Running → Finished`, with no retries — a failed launch is
//! fatal for that supervision and surfaced upward.
//!
//! ## Flow
//! ```text
//! run(job)
//!   ├─► insert ProcessRecord (Running)       — before launch, for audit
//!   ├─► publish ProcessStarting
//!   ├─► spawn analyzer (stdout piped)
//!   └─► line pump:
//!         ├─ blank / non-`{` line   → skip (analyzer diagnostics)
//!         ├─ malformed `{` line     → publish MalformedLine, skip
//!         ├─ parsed payload         → persist (receipt timestamp)
//!         │                           publish MeasurementRecorded
//!         └─ registry poll          → absent? terminate child, stop
//!
//! exit (exhausted / cancelled / error):
//!   ├─► finish_process (idempotent) + registry remove
//!   └─► publish ProcessFinished
//! ```
//!
//! ## Rules
//! - The process record is written **before** the analyzer launches: a crash
//!   during launch leaves a discoverable `Running` row for later finalization.
//! - Timestamps are assigned at **receipt**, so ordering reflects delivery
//!   order, which may lag true production order under pipe buffering.
//! - The registry is polled **after** each persisted record: a measurement
//!   read before the poll is always persisted even when cancellation raced
//!   it (at-least-once).
//! - Termination is SIGTERM, then SIGKILL after the grace period.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time;

use crate::error::SuperviseError;
use crate::events::{Bus, Event, EventKind};
use crate::model::{Measurement, MeasurementKind, ProcessRecord};
use crate::registry::ActiveRegistry;
use crate::store::MeasurementStore;
use crate::supervise::AnalyzerCommand;

/// Everything one supervision needs to know about its process.
#[derive(Debug, Clone)]
pub struct SuperviseJob {
    /// Parent-run id grouping sibling processes.
    pub parent_id: String,
    /// This process's id; its registry key.
    pub process_id: String,
    /// Measurement kind the analyzer produces.
    pub kind: MeasurementKind,
    /// Video source path, recorded on the process row.
    pub source: String,
    /// Resolved analyzer command line.
    pub command: AnalyzerCommand,
}

/// Why the line pump stopped reading.
enum PumpExit {
    /// The analyzer's output stream ended.
    Exhausted,
    /// The process id disappeared from the registry.
    Cancelled,
}

/// Supervises one external analyzer process.
pub struct ProcessSupervisor<S> {
    store: Arc<S>,
    registry: Arc<ActiveRegistry>,
    bus: Bus,
    grace: Duration,
}

impl<S: MeasurementStore> ProcessSupervisor<S> {
    /// Creates a supervisor bound to the shared store, registry and bus.
    pub fn new(store: Arc<S>, registry: Arc<ActiveRegistry>, bus: Bus, grace: Duration) -> Self {
        Self {
            store,
            registry,
            bus,
            grace,
        }
    }

    /// Runs the supervision to completion.
    ///
    /// Returns when the analyzer's output is exhausted, the process id was
    /// removed from the registry, or a fatal error occurred. In every case
    /// the registry entry is gone and any persisted process record ends
    /// `Finished` — even when the record itself could not be written.
    pub async fn run(&self, job: SuperviseJob) -> Result<(), SuperviseError> {
        if let Err(err) = self
            .store
            .insert_process(ProcessRecord::running(
                &job.process_id,
                &job.parent_id,
                &job.source,
                job.kind,
            ))
            .await
        {
            let err = SuperviseError::from(err);
            self.publish(EventKind::ProcessFailed, &job, Some(err.to_string()));
            self.finalize(&job).await;
            return Err(err);
        }
        self.publish(EventKind::ProcessStarting, &job, None);

        let mut child = match Command::new(&job.command.program)
            .args(&job.command.args)
            .stdout(Stdio::piped())
            .stdin(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(source) => {
                let err = SuperviseError::Launch {
                    program: job.command.program.clone(),
                    source,
                };
                self.publish(EventKind::ProcessLaunchFailed, &job, Some(err.to_string()));
                self.finalize(&job).await;
                return Err(err);
            }
        };

        let result = match child.stdout.take() {
            Some(stdout) => self.pump(&job, stdout).await,
            None => Err(SuperviseError::Stdout),
        };

        match &result {
            Ok(PumpExit::Exhausted) => {
                let _ = child.wait().await;
            }
            Ok(PumpExit::Cancelled) => {
                self.terminate(&mut child).await;
            }
            Err(err) => {
                self.publish(EventKind::ProcessFailed, &job, Some(err.to_string()));
                self.terminate(&mut child).await;
            }
        }

        self.finalize(&job).await;
        self.publish(EventKind::ProcessFinished, &job, None);
        result.map(|_| ())
    }

    /// Reads analyzer output line by line until exhaustion or cancellation.
    async fn pump(&self, job: &SuperviseJob, stdout: ChildStdout) -> Result<PumpExit, SuperviseError> {
        let mut lines = BufReader::new(stdout).lines();

        loop {
            let line = match lines
                .next_line()
                .await
                .map_err(|source| SuperviseError::Read { source })?
            {
                Some(line) => line,
                None => return Ok(PumpExit::Exhausted),
            };

            if line.is_empty() || !line.starts_with('{') {
                continue;
            }

            // Uniform malformed-line policy: skip with a log event.
            let payload: serde_json::Value = match serde_json::from_str(&line) {
                Ok(payload) => payload,
                Err(err) => {
                    self.publish(EventKind::MalformedLine, job, Some(err.to_string()));
                    continue;
                }
            };

            self.store
                .insert_measurement(
                    job.kind,
                    Measurement::received_now(&job.parent_id, &job.process_id, payload),
                )
                .await?;
            self.publish(EventKind::MeasurementRecorded, job, Some(line));

            if !self.registry.contains(&job.process_id).await {
                return Ok(PumpExit::Cancelled);
            }
        }
    }

    /// SIGTERM, wait up to the grace period, then SIGKILL.
    async fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
            if time::timeout(self.grace, child.wait()).await.is_ok() {
                return;
            }
        }
        let _ = child.kill().await;
    }

    /// Marks the process finished and removes it from the registry.
    ///
    /// Runs on every exit path, so the `Running → Finished` transition holds
    /// even when the supervision itself failed.
    async fn finalize(&self, job: &SuperviseJob) {
        if let Err(err) = self.store.finish_process(&job.process_id).await {
            self.publish(EventKind::ProcessFailed, job, Some(err.to_string()));
        }
        self.registry.remove(&job.process_id).await;
    }

    fn publish(&self, kind: EventKind, job: &SuperviseJob, reason: Option<String>) {
        let mut ev = Event::now(kind)
            .with_process(job.process_id.as_str())
            .with_kind(job.kind);
        if let Some(reason) = reason {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);
    }
}
