//! Stage identifiers, outcomes and failure policies.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::AnalysisError;

/// One step of the analysis workflow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Validate,
    Audio,
    Scenes,
    Frames,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Validate => "validate",
            StageId::Audio => "audio",
            StageId::Scenes => "scenes",
            StageId::Frames => "frames",
        }
    }

    /// Label shown in progress reports.
    pub fn label(&self) -> &'static str {
        match self {
            StageId::Validate => "Validating video file",
            StageId::Audio => "Extracting audio",
            StageId::Scenes => "Detecting scenes",
            StageId::Frames => "Extracting frames",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified result of running one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    /// The stage produced its payload.
    Success(T),
    /// Expected non-error condition; the stage has nothing to contribute.
    SkippedBenign(String),
    /// Recorded error; the workflow continues.
    SoftFailure(AnalysisError),
    /// Recorded error; the workflow stops.
    Fatal(AnalysisError),
}

impl<T> StageOutcome<T> {
    /// Short tag used for logs and metrics.
    pub fn tag(&self) -> &'static str {
        match self {
            StageOutcome::Success(_) => "success",
            StageOutcome::SkippedBenign(_) => "skipped",
            StageOutcome::SoftFailure(_) => "soft_failure",
            StageOutcome::Fatal(_) => "fatal",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, StageOutcome::Fatal(_))
    }

    pub fn error(&self) -> Option<&AnalysisError> {
        match self {
            StageOutcome::SoftFailure(e) | StageOutcome::Fatal(e) => Some(e),
            _ => None,
        }
    }
}

/// What a stage failure does to the rest of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the error and run the remaining stages.
    Continue,
    /// Record the error and stop.
    Abort,
}

impl FailurePolicy {
    /// Classifies a stage error under this policy.
    pub fn classify<T>(self, error: AnalysisError) -> StageOutcome<T> {
        match self {
            FailurePolicy::Continue => StageOutcome::SoftFailure(error),
            FailurePolicy::Abort => StageOutcome::Fatal(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ErrorKind;

    #[test]
    fn test_policy_classification() {
        let err = AnalysisError::new(ErrorKind::AudioExtractionFailed, StageId::Audio, "boom");

        let soft: StageOutcome<()> = FailurePolicy::Continue.classify(err.clone());
        assert_eq!(soft.tag(), "soft_failure");
        assert!(!soft.is_fatal());

        let fatal: StageOutcome<()> = FailurePolicy::Abort.classify(err.clone());
        assert!(fatal.is_fatal());
        assert_eq!(fatal.error(), Some(&err));
    }

    #[test]
    fn test_skipped_has_no_error() {
        let outcome: StageOutcome<u32> = StageOutcome::SkippedBenign("no audio".to_string());
        assert_eq!(outcome.error(), None);
        assert_eq!(outcome.tag(), "skipped");
    }

    #[test]
    fn test_policy_serde() {
        let policy: FailurePolicy = serde_json::from_str("\"continue\"").unwrap();
        assert_eq!(policy, FailurePolicy::Continue);
        assert_eq!(serde_json::to_string(&StageId::Frames).unwrap(), "\"frames\"");
    }
}
