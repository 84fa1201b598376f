//! # Active-process registry — the cancellation surface.
//!
//! [`ActiveRegistry`] is the process-wide table of currently supervised
//! processes. Removal of an id is the **only** cancellation signal in the
//! pipeline: it is cooperative and polled, never an interrupt.
//!
//! ## Rules
//! - Supervisors insert their id on start and remove it on self-termination.
//! - External stop requests remove ids; the owning supervisor notices on its
//!   next poll (after persisting the record it was handling) and terminates
//!   the analyzer. Cancellation latency is bounded by one record cycle.
//! - Composition loops poll the **occupancy** process id of their parent run,
//!   not their own id.
//! - The raw map is never exposed; all access goes through explicit
//!   insert/remove/contains operations behind one lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::model::MeasurementKind;

/// Registry value: what kind of process an id belongs to and which source it
/// is consuming.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEntry {
    /// Measurement kind produced by the process.
    pub kind: MeasurementKind,
    /// Video source path the process was launched with.
    pub source: String,
}

/// Synchronized map of active supervised processes.
#[derive(Debug, Default)]
pub struct ActiveRegistry {
    inner: RwLock<HashMap<String, ActiveEntry>>,
}

impl ActiveRegistry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a process id. Overwrites any stale entry under the same id.
    pub async fn insert(&self, process_id: impl Into<String>, entry: ActiveEntry) {
        self.inner.write().await.insert(process_id.into(), entry);
    }

    /// Deregisters a process id, cooperatively cancelling its supervision.
    ///
    /// Returns `true` if the id was present. Removing an already-absent id is
    /// benign (a cancellation race resolved by an earlier poll).
    pub async fn remove(&self, process_id: &str) -> bool {
        self.inner.write().await.remove(process_id).is_some()
    }

    /// Liveness check used by supervisors and composition loops.
    pub async fn contains(&self, process_id: &str) -> bool {
        self.inner.read().await.contains_key(process_id)
    }

    /// Snapshot of active ids and their entries, sorted by id.
    pub async fn list(&self) -> Vec<(String, ActiveEntry)> {
        let map = self.inner.read().await;
        let mut items: Vec<_> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        items
    }

    /// Returns `true` when nothing is registered.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Deregisters everything, cancelling all supervisions.
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: MeasurementKind) -> ActiveEntry {
        ActiveEntry {
            kind,
            source: "video.mp4".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_then_contains_then_remove() {
        let reg = ActiveRegistry::new();
        assert!(reg.is_empty().await);

        reg.insert("p-1", entry(MeasurementKind::Occupancy)).await;
        assert!(reg.contains("p-1").await);
        assert!(!reg.contains("p-2").await);

        assert!(reg.remove("p-1").await);
        assert!(!reg.contains("p-1").await);
        assert!(reg.is_empty().await);
    }

    #[tokio::test]
    async fn remove_absent_id_is_benign() {
        let reg = ActiveRegistry::new();
        assert!(!reg.remove("ghost").await);
    }

    #[tokio::test]
    async fn list_is_sorted_and_clear_empties() {
        let reg = ActiveRegistry::new();
        reg.insert("b", entry(MeasurementKind::Speed)).await;
        reg.insert("a", entry(MeasurementKind::Occupancy)).await;

        let ids: Vec<String> = reg.list().await.into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);

        reg.clear().await;
        assert!(reg.is_empty().await);
    }
}
