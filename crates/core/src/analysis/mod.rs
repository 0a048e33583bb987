//! Video analysis workflow.
//!
//! [`PipelineCoordinator`] runs the stages of one analysis in order:
//!
//! 1. validate (always; failure is fatal)
//! 2. audio extraction (optional; a silent video is a benign skip)
//! 3. scene detection (optional)
//! 4. frame extraction (optional; needs at least one detected scene)
//!
//! Each stage's result is classified into a [`StageOutcome`] using the
//! stage's [`FailurePolicy`]. Outputs and errors are gathered by an
//! [`AnalysisAccumulator`] and frozen into an [`AnalysisResult`].

mod config;
mod coordinator;
mod error;
mod outcome;
mod result;

pub use config::{AnalysisConfig, StagePolicies, StageWeights};
pub use coordinator::{AnalysisRequest, BatchRequest, PipelineCoordinator};
pub use error::{AnalysisError, ErrorKind};
pub use outcome::{FailurePolicy, StageId, StageOutcome};
pub use result::{
    AnalysisAccumulator, AnalysisProjection, AnalysisResult, BatchProjection, BatchResult,
    ErrorSummary,
};
