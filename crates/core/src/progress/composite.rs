//! Composite progress over weighted stages.

use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::tracker::ProgressTracker;
use super::types::{ProgressError, StageDescriptor, WorkflowRun};

/// Callback mapping a stage-local fraction in `[0, 1]` to workflow progress.
pub type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Progress reporter handed to a collaborator for the duration of one stage.
///
/// Wraps an optional [`ProgressCallback`]; reporting through a detached
/// reporter is a no-op.
#[derive(Default)]
pub struct StageProgress {
    callback: Option<ProgressCallback>,
}

impl StageProgress {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// A reporter that discards everything.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Reports a stage-local fraction in `[0, 1]`.
    pub fn report(&self, fraction: f64) {
        if let Some(callback) = &self.callback {
            callback(fraction);
        }
    }
}

impl std::fmt::Debug for StageProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageProgress")
            .field("attached", &self.callback.is_some())
            .finish()
    }
}

/// Scales stage weights so they sum to 1.0.
///
/// Fails on an empty list or on any weight that is not a positive finite number.
pub fn normalize_weights(
    workflow_id: &str,
    stages: Vec<StageDescriptor>,
) -> Result<Vec<StageDescriptor>, ProgressError> {
    if stages.is_empty() {
        return Err(ProgressError::EmptyWorkflow(workflow_id.to_string()));
    }

    if let Some(bad) = stages
        .iter()
        .find(|s| !s.weight.is_finite() || s.weight <= 0.0)
    {
        return Err(ProgressError::InvalidWeight {
            stage_id: bad.id.clone(),
            weight: bad.weight,
        });
    }

    let total: f64 = stages.iter().map(|s| s.weight).sum();
    Ok(stages
        .into_iter()
        .map(|s| StageDescriptor {
            weight: s.weight / total,
            ..s
        })
        .collect())
}

#[derive(Debug)]
struct WorkflowState {
    run: WorkflowRun,
    completed_weight: f64,
    active_stage: Option<usize>,
    closed: bool,
}

/// Handle over one composite workflow registered with a [`ProgressTracker`].
///
/// The handle owns the cursor state (normalized weights, completed weight,
/// current stage) for its workflow only, so several workflows can share a
/// tracker.
#[derive(Clone)]
pub struct CompositeProgress {
    workflow_id: String,
    tracker: Arc<ProgressTracker>,
    state: Arc<Mutex<WorkflowState>>,
}

impl ProgressTracker {
    /// Registers a composite workflow and returns its handle.
    pub fn start_workflow(
        self: &Arc<Self>,
        workflow_id: &str,
        name: &str,
        stages: Vec<StageDescriptor>,
    ) -> Result<CompositeProgress, ProgressError> {
        let stages = normalize_weights(workflow_id, stages)?;

        let details = json!({
            "stages": stages
                .iter()
                .map(|s| json!({ "id": s.id, "label": s.label, "weight": s.weight }))
                .collect::<Vec<_>>(),
        });
        self.start_operation(workflow_id, name, stages.len(), details);

        Ok(CompositeProgress {
            workflow_id: workflow_id.to_string(),
            tracker: Arc::clone(self),
            state: Arc::new(Mutex::new(WorkflowState {
                run: WorkflowRun {
                    workflow_id: workflow_id.to_string(),
                    stages,
                    current_stage: 0,
                    progress: 0.0,
                },
                completed_weight: 0.0,
                active_stage: None,
                closed: false,
            })),
        })
    }
}

impl CompositeProgress {
    fn lock(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Read-only snapshot of the workflow.
    pub fn run(&self) -> WorkflowRun {
        self.lock().run.clone()
    }

    /// Starts the next declared stage and returns its progress callback.
    pub fn start_next_operation(&self) -> Result<ProgressCallback, ProgressError> {
        let (index, label, base, weight) = {
            let mut state = self.lock();
            if state.closed {
                return Err(ProgressError::WorkflowClosed(self.workflow_id.clone()));
            }
            if let Some(active) = state.active_stage {
                return Err(ProgressError::StageInProgress(
                    state.run.stages[active].id.clone(),
                ));
            }
            let index = state.run.current_stage;
            let Some(stage) = state.run.stages.get(index) else {
                return Err(ProgressError::NoRemainingStages {
                    workflow_id: self.workflow_id.clone(),
                    declared: state.run.stages.len(),
                });
            };
            let started = (index, stage.label.clone(), state.completed_weight, stage.weight);
            state.active_stage = Some(index);
            started
        };

        debug!(workflow_id = %self.workflow_id, "Stage {} started: {}", index + 1, label);
        self.tracker
            .update_progress(&self.workflow_id, base, Some(&label), Some(index + 1));

        let handle = self.clone();
        Ok(Box::new(move |local: f64| {
            if !local.is_finite() {
                return;
            }
            let global = base + weight * local.clamp(0.0, 1.0);
            {
                let mut state = handle.lock();
                if state.closed || state.active_stage != Some(index) {
                    return;
                }
                state.run.progress = state.run.progress.max(global);
            }
            handle
                .tracker
                .update_progress(&handle.workflow_id, global, Some(&label), Some(index + 1));
        }))
    }

    /// Locks in the running stage's weight and advances the cursor.
    pub fn complete_current_operation(&self) -> Result<(), ProgressError> {
        let (progress, label, number) = {
            let mut state = self.lock();
            if state.closed {
                return Err(ProgressError::WorkflowClosed(self.workflow_id.clone()));
            }
            let Some(index) = state.active_stage.take() else {
                return Err(ProgressError::NoActiveStage(self.workflow_id.clone()));
            };
            let (label, weight) = {
                let stage = &state.run.stages[index];
                (stage.label.clone(), stage.weight)
            };
            state.completed_weight += weight;
            state.run.current_stage = index + 1;
            state.run.progress = state.run.progress.max(state.completed_weight);
            (state.run.progress, label, index + 1)
        };

        self.tracker
            .update_progress(&self.workflow_id, progress, Some(&label), Some(number));
        Ok(())
    }

    /// Marks the whole workflow failed. Later updates are dropped.
    pub fn fail_workflow(&self, reason: &str) {
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.active_stage = None;
        }
        self.tracker.fail_operation(&self.workflow_id, reason);
    }

    /// Drives progress to 1.0 and completes the workflow with `details`.
    ///
    /// Stages that were declared but never started (e.g. frames when no scene
    /// was found) count as done.
    pub fn finish(&self, final_step: &str, details: Value) {
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.active_stage = None;
            state.run.progress = 1.0;
        }
        self.tracker
            .update_progress(&self.workflow_id, 1.0, Some(final_step), None);
        self.tracker.complete_operation(&self.workflow_id, details);
    }
}
