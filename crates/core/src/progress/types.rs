//! Types for the progress module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised by progress bookkeeping.
#[derive(Debug, Error, PartialEq)]
pub enum ProgressError {
    /// A workflow was declared without stages.
    #[error("workflow {0} declares no stages")]
    EmptyWorkflow(String),

    /// A stage weight is zero, negative or not finite.
    #[error("stage {stage_id} has invalid weight {weight}")]
    InvalidWeight { stage_id: String, weight: f64 },

    /// `start_next_operation` was called after the last declared stage.
    #[error("workflow {workflow_id} has no stage left to start (declared {declared})")]
    NoRemainingStages { workflow_id: String, declared: usize },

    /// A stage was started while the previous one is still running.
    #[error("stage {0} is still in progress")]
    StageInProgress(String),

    /// `complete_current_operation` was called with no running stage.
    #[error("workflow {0} has no running stage")]
    NoActiveStage(String),

    /// The workflow was already failed or finished.
    #[error("workflow {0} is closed")]
    WorkflowClosed(String),
}

/// One weighted step of a composite workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    /// Stage identifier (e.g. "audio").
    pub id: String,
    /// Human-readable label shown to observers.
    pub label: String,
    /// Relative weight. Normalized to a fraction of 1.0 when the workflow starts.
    pub weight: f64,
}

impl StageDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            weight,
        }
    }
}

/// Read-only view of a composite workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowRun {
    /// Unique workflow identifier.
    pub workflow_id: String,
    /// Stages in execution order, weights normalized.
    pub stages: Vec<StageDescriptor>,
    /// Index of the next stage to start (equals `stages.len()` once all ran).
    pub current_stage: usize,
    /// Cumulative normalized progress.
    pub progress: f64,
}

/// Lifecycle status of a tracked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Running,
    Completed,
    Failed,
}

impl OperationStatus {
    /// Whether the operation no longer accepts updates.
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Point-in-time state of a tracked operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationSnapshot {
    pub operation_id: String,
    pub name: String,
    pub total_steps: usize,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step_number: Option<usize>,
    pub status: OperationStatus,
    pub details: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Event emitted to progress sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started {
        operation_id: String,
        name: String,
        total_steps: usize,
        details: Value,
    },
    Updated {
        operation_id: String,
        progress: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_step: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_step_number: Option<usize>,
    },
    Completed {
        operation_id: String,
        details: Value,
    },
    Failed {
        operation_id: String,
        reason: String,
    },
}

impl ProgressEvent {
    /// Operation this event belongs to.
    pub fn operation_id(&self) -> &str {
        match self {
            Self::Started { operation_id, .. }
            | Self::Updated { operation_id, .. }
            | Self::Completed { operation_id, .. }
            | Self::Failed { operation_id, .. } => operation_id,
        }
    }

    /// Short tag, used for metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Updated { .. } => "updated",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}
