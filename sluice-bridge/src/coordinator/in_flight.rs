//! Per-pipeline mutual exclusion
//!
//! One slot per pipeline name. A run holds its pipeline's slot through an
//! `InFlightGuard` for its whole lifetime; dropping the guard frees the slot
//! on every exit path, including cancellation and panics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// Keyed in-flight table owned by a coordinator
///
/// Slots are created on first use and kept for the table's lifetime; there is
/// one per distinct pipeline name.
#[derive(Debug, Default)]
pub struct InFlightTable {
    slots: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl InFlightTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, pipeline: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(slots.entry(pipeline.to_string()).or_default())
    }

    /// Takes the slot if no run of `pipeline` is in flight
    pub fn try_acquire(&self, pipeline: &str) -> Option<InFlightGuard> {
        let guard = self.slot(pipeline).try_lock_owned().ok()?;
        debug!("Acquired in-flight slot for pipeline '{}'", pipeline);
        Some(InFlightGuard {
            pipeline: pipeline.to_string(),
            _guard: guard,
        })
    }

    /// Waits for the slot; waiters are served in arrival order
    pub async fn acquire(&self, pipeline: &str) -> InFlightGuard {
        let guard = self.slot(pipeline).lock_owned().await;
        debug!("Acquired in-flight slot for pipeline '{}'", pipeline);
        InFlightGuard {
            pipeline: pipeline.to_string(),
            _guard: guard,
        }
    }

    /// Whether a run of `pipeline` currently holds its slot
    pub fn is_in_flight(&self, pipeline: &str) -> bool {
        let slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slots
            .get(pipeline)
            .is_some_and(|slot| slot.try_lock().is_err())
    }
}

/// Proof that the holder owns a pipeline's in-flight slot
#[derive(Debug)]
pub struct InFlightGuard {
    pipeline: String,
    _guard: OwnedMutexGuard<()>,
}

impl InFlightGuard {
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        debug!("Released in-flight slot for pipeline '{}'", self.pipeline);
    }
}
