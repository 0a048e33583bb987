//! Progress tracking for long-running operations.
//!
//! The [`ProgressTracker`] records operation lifecycles (start, update,
//! complete, fail) and forwards every transition to the attached
//! [`ProgressSink`]s. Composite workflows made of weighted stages are
//! registered with [`ProgressTracker::start_workflow`], which returns a
//! [`CompositeProgress`] handle that converts stage-local fractions into one
//! normalized workflow progress.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use deepbrief_core::progress::{ProgressTracker, StageDescriptor, TracingSink};
//!
//! let tracker = Arc::new(ProgressTracker::new().with_sink(Arc::new(TracingSink)));
//! let workflow = tracker.start_workflow(
//!     "video_analysis_1a2b3c4d",
//!     "Analyzing talk.mp4",
//!     vec![
//!         StageDescriptor::new("validate", "Validating video file", 0.05),
//!         StageDescriptor::new("scenes", "Detecting scenes", 0.35),
//!     ],
//! )?;
//!
//! let report = workflow.start_next_operation()?;
//! report(0.5);
//! workflow.complete_current_operation()?;
//! ```

mod composite;
mod tracker;
mod types;

pub use composite::{normalize_weights, CompositeProgress, ProgressCallback, StageProgress};
pub use tracker::{ChannelSink, ProgressSink, ProgressTracker, TracingSink};
pub use types::{
    OperationSnapshot, OperationStatus, ProgressError, ProgressEvent, StageDescriptor,
    WorkflowRun,
};
