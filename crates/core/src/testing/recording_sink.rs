//! Progress sink that keeps every event in memory.

use std::sync::{Arc, Mutex, PoisonError};

use crate::progress::{ProgressEvent, ProgressSink};

/// Records progress events for test assertions.
///
/// Clones share the same buffer, so a clone can be attached to a
/// [`ProgressTracker`](crate::progress::ProgressTracker) while the test keeps
/// the original.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event received so far, in order.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events of one operation.
    pub fn events_for(&self, operation_id: &str) -> Vec<ProgressEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.operation_id() == operation_id)
            .collect()
    }

    /// Event kinds of one operation ("started", "updated", ...).
    pub fn kinds(&self, operation_id: &str) -> Vec<&'static str> {
        self.events_for(operation_id)
            .iter()
            .map(ProgressEvent::kind)
            .collect()
    }

    /// Progress values of the `Updated` events of one operation.
    pub fn progress_values(&self, operation_id: &str) -> Vec<f64> {
        self.events_for(operation_id)
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Updated { progress, .. } => Some(progress),
                _ => None,
            })
            .collect()
    }

    pub fn last_progress(&self, operation_id: &str) -> Option<f64> {
        self.progress_values(operation_id).last().copied()
    }

    /// Ids of every operation that emitted a `Started` event.
    pub fn started_operations(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Started { operation_id, .. } => Some(operation_id),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: &ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
