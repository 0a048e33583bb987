//! Operation tracker and progress sinks.

use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::types::{OperationSnapshot, OperationStatus, ProgressEvent};

/// Destination for progress events (log, channel, websocket, ...).
///
/// Sinks are called synchronously from whatever task drives the tracker,
/// so implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

/// Renders progress events as log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                operation_id,
                name,
                total_steps,
                ..
            } => info!(%operation_id, total_steps, "Started: {}", name),
            ProgressEvent::Updated {
                operation_id,
                progress,
                current_step,
                ..
            } => debug!(
                %operation_id,
                step = current_step.as_deref().unwrap_or(""),
                "Progress {:.1}%",
                progress * 100.0
            ),
            ProgressEvent::Completed { operation_id, details } => {
                info!(%operation_id, %details, "Completed")
            }
            ProgressEvent::Failed { operation_id, reason } => {
                warn!(%operation_id, "Failed: {}", reason)
            }
        }
    }
}

/// Forwards progress events into a bounded tokio channel.
///
/// Events are sent with `try_send`; when the receiver lags behind or is gone
/// the event is dropped rather than blocking the analysis.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Creates a sink together with its receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: &ProgressEvent) {
        if let Err(e) = self.tx.try_send(event.clone()) {
            debug!("Dropped progress event for {}: {}", event.operation_id(), e);
        }
    }
}

/// Process-wide observer of operation lifecycles.
///
/// Operations are addressed by id, so one tracker can be shared between
/// concurrent runs. The tracker only does bookkeeping and emission; it never
/// decides anything about the work being tracked.
pub struct ProgressTracker {
    operations: Mutex<HashMap<String, OperationSnapshot>>,
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    /// Creates a tracker with no sinks attached.
    pub fn new() -> Self {
        Self {
            operations: Mutex::new(HashMap::new()),
            sinks: Vec::new(),
        }
    }

    /// Attaches a sink. Every subsequent event is delivered to it.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, OperationSnapshot>> {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // Never called with the operations lock held.
    fn emit(&self, event: ProgressEvent) {
        for sink in &self.sinks {
            sink.emit(&event);
        }
    }

    /// Registers a new operation. Restarting an existing id replaces it.
    pub fn start_operation(&self, operation_id: &str, name: &str, total_steps: usize, details: Value) {
        let now = Utc::now();
        {
            let mut operations = self.lock();
            if let Some(existing) = operations.get(operation_id) {
                if !existing.status.is_finished() {
                    warn!("Operation {} restarted while still running", operation_id);
                }
            }
            operations.insert(
                operation_id.to_string(),
                OperationSnapshot {
                    operation_id: operation_id.to_string(),
                    name: name.to_string(),
                    total_steps,
                    progress: 0.0,
                    current_step: None,
                    current_step_number: None,
                    status: OperationStatus::Running,
                    details: details.clone(),
                    error: None,
                    started_at: now,
                    updated_at: now,
                },
            );
        }

        self.emit(ProgressEvent::Started {
            operation_id: operation_id.to_string(),
            name: name.to_string(),
            total_steps,
            details,
        });
    }

    /// Records progress for a running operation.
    ///
    /// The value is clamped to `[0, 1]` and never moves backwards: a value
    /// below the last reported one is raised to it. Updates for unknown or
    /// finished operations are ignored.
    pub fn update_progress(
        &self,
        operation_id: &str,
        progress: f64,
        current_step: Option<&str>,
        current_step_number: Option<usize>,
    ) {
        if !progress.is_finite() {
            warn!("Ignoring non-finite progress for {}: {}", operation_id, progress);
            return;
        }

        let effective = {
            let mut operations = self.lock();
            let Some(op) = operations.get_mut(operation_id) else {
                debug!("Progress update for unknown operation {}", operation_id);
                return;
            };
            if op.status.is_finished() {
                debug!("Progress update for finished operation {}", operation_id);
                return;
            }

            op.progress = progress.clamp(0.0, 1.0).max(op.progress);
            if let Some(step) = current_step {
                op.current_step = Some(step.to_string());
            }
            if current_step_number.is_some() {
                op.current_step_number = current_step_number;
            }
            op.updated_at = Utc::now();
            op.progress
        };

        self.emit(ProgressEvent::Updated {
            operation_id: operation_id.to_string(),
            progress: effective,
            current_step: current_step.map(str::to_string),
            current_step_number,
        });
    }

    /// Marks an operation completed. Non-null `details` replace the ones
    /// given at start.
    pub fn complete_operation(&self, operation_id: &str, details: Value) {
        {
            let mut operations = self.lock();
            let Some(op) = operations.get_mut(operation_id) else {
                warn!("Completing unknown operation {}", operation_id);
                return;
            };
            if op.status.is_finished() {
                debug!("Operation {} already finished", operation_id);
                return;
            }
            op.status = OperationStatus::Completed;
            op.progress = 1.0;
            if !details.is_null() {
                op.details = details.clone();
            }
            op.updated_at = Utc::now();
        }

        self.emit(ProgressEvent::Completed {
            operation_id: operation_id.to_string(),
            details,
        });
    }

    /// Marks an operation failed. Further updates are ignored.
    pub fn fail_operation(&self, operation_id: &str, reason: &str) {
        {
            let mut operations = self.lock();
            let Some(op) = operations.get_mut(operation_id) else {
                warn!("Failing unknown operation {}: {}", operation_id, reason);
                return;
            };
            if op.status.is_finished() {
                debug!("Operation {} already finished", operation_id);
                return;
            }
            op.status = OperationStatus::Failed;
            op.error = Some(reason.to_string());
            op.updated_at = Utc::now();
        }

        self.emit(ProgressEvent::Failed {
            operation_id: operation_id.to_string(),
            reason: reason.to_string(),
        });
    }

    /// Current state of one operation.
    pub fn snapshot(&self, operation_id: &str) -> Option<OperationSnapshot> {
        self.lock().get(operation_id).cloned()
    }

    /// All known operations, oldest first.
    pub fn operations(&self) -> Vec<OperationSnapshot> {
        let mut all: Vec<_> = self.lock().values().cloned().collect();
        all.sort_by_key(|op| op.started_at);
        all
    }

    /// Drops completed and failed operations, returning how many were removed.
    pub fn clear_finished(&self) -> usize {
        let mut operations = self.lock();
        let before = operations.len();
        operations.retain(|_, op| !op.status.is_finished());
        before - operations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use serde_json::json;

    fn tracker_with_recorder() -> (ProgressTracker, RecordingSink) {
        let sink = RecordingSink::new();
        let tracker = ProgressTracker::new().with_sink(Arc::new(sink.clone()));
        (tracker, sink)
    }

    #[test]
    fn test_operation_lifecycle() {
        let (tracker, sink) = tracker_with_recorder();

        tracker.start_operation("op-1", "Analyzing", 3, json!({ "video_count": 3 }));
        tracker.update_progress("op-1", 0.5, Some("Processing a.mp4"), Some(2));
        tracker.complete_operation("op-1", json!({ "successful": 3 }));

        let snapshot = tracker.snapshot("op-1").unwrap();
        assert_eq!(snapshot.status, OperationStatus::Completed);
        assert_eq!(snapshot.progress, 1.0);
        assert_eq!(snapshot.current_step.as_deref(), Some("Processing a.mp4"));
        assert_eq!(snapshot.details["successful"], 3);

        let kinds: Vec<_> = sink.events().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["started", "updated", "completed"]);
    }

    #[test]
    fn test_progress_is_clamped_and_monotonic() {
        let (tracker, sink) = tracker_with_recorder();

        tracker.start_operation("op", "Op", 1, Value::Null);
        tracker.update_progress("op", 0.6, None, None);
        tracker.update_progress("op", 0.2, None, None);
        tracker.update_progress("op", 7.0, None, None);

        assert_eq!(sink.progress_values("op"), vec![0.6, 0.6, 1.0]);
    }

    #[test]
    fn test_non_finite_progress_ignored() {
        let (tracker, sink) = tracker_with_recorder();

        tracker.start_operation("op", "Op", 1, Value::Null);
        tracker.update_progress("op", f64::NAN, None, None);

        assert!(sink.progress_values("op").is_empty());
        assert_eq!(tracker.snapshot("op").unwrap().progress, 0.0);
    }

    #[test]
    fn test_failed_operation_rejects_updates() {
        let (tracker, sink) = tracker_with_recorder();

        tracker.start_operation("op", "Op", 1, Value::Null);
        tracker.fail_operation("op", "disk full");
        tracker.update_progress("op", 0.9, None, None);
        tracker.complete_operation("op", Value::Null);

        let snapshot = tracker.snapshot("op").unwrap();
        assert_eq!(snapshot.status, OperationStatus::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("disk full"));
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_unknown_operation_is_ignored() {
        let (tracker, sink) = tracker_with_recorder();

        tracker.update_progress("ghost", 0.5, None, None);
        tracker.complete_operation("ghost", Value::Null);
        tracker.fail_operation("ghost", "nope");

        assert!(sink.events().is_empty());
        assert!(tracker.operations().is_empty());
    }

    #[test]
    fn test_clear_finished() {
        let tracker = ProgressTracker::new();
        tracker.start_operation("a", "A", 1, Value::Null);
        tracker.start_operation("b", "B", 1, Value::Null);
        tracker.complete_operation("a", Value::Null);

        assert_eq!(tracker.clear_finished(), 1);
        assert_eq!(tracker.operations().len(), 1);
        assert!(tracker.snapshot("b").is_some());
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_events() {
        let (sink, mut rx) = ChannelSink::channel(8);
        let tracker = ProgressTracker::new().with_sink(Arc::new(sink));

        tracker.start_operation("op", "Op", 1, Value::Null);
        tracker.fail_operation("op", "boom");

        assert!(matches!(rx.recv().await, Some(ProgressEvent::Started { .. })));
        assert!(matches!(rx.recv().await, Some(ProgressEvent::Failed { .. })));
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (sink, _rx) = ChannelSink::channel(1);
        let tracker = ProgressTracker::new().with_sink(Arc::new(sink));

        tracker.start_operation("op", "Op", 1, Value::Null);
        // Channel is full now; these must not block or panic.
        tracker.update_progress("op", 0.5, None, None);
        tracker.complete_operation("op", Value::Null);

        assert_eq!(
            tracker.snapshot("op").unwrap().status,
            OperationStatus::Completed
        );
    }
}
