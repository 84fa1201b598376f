//! # Observer: user-facing event handlers
//!
//! The [`Observer`] trait is the main **extension point** for end users.
//! All pipeline [`Event`]s flow through the bus and into observers.
//!
//! Implementing your own observer allows you to plug in:
//! - metrics export;
//! - custom monitoring or alerting pipelines;
//! - structured logging.
//!
//! ```text
//! Event flow:
//!   ProcessSupervisor ─┐
//!   CompositionLoop  ──┼─ publish(Event) ──► Bus ──► Orchestrator::spawn_observer
//!   Orchestrator     ──┘                               └─► Observer::on_event(&Event)
//! ```
//!
//! A simple [`LogWriter`](crate::LogWriter) is available (enabled via the
//! `logging` feature), useful for debugging and demos.
//!
//! # Example: custom observer
//! ```no_run
//! use trafficvisor::{Observer, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct MetricsObserver;
//!
//! #[async_trait]
//! impl Observer for MetricsObserver {
//!     async fn on_event(&self, event: &Event) {
//!         match event.kind {
//!             EventKind::MeasurementRecorded => {
//!                 println!("[metrics] record from {:?}", event.process);
//!             }
//!             EventKind::ProcessLaunchFailed => {
//!                 println!("[metrics] launch failed: {:?}", event.reason);
//!             }
//!             _ => {}
//!         }
//!     }
//! }
//! ```

use crate::events::Event;
use async_trait::async_trait;

/// # Trait for receiving pipeline events from the bus.
///
/// Observers are called asynchronously by the orchestrator's listener task
/// whenever a new [`Event`] is published.
#[async_trait]
pub trait Observer: Send + Sync + 'static {
    /// Called for every emitted [`Event`].
    async fn on_event(&self, event: &Event);
}
