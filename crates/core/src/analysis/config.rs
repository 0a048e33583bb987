//! Configuration for the analysis coordinator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::outcome::{FailurePolicy, StageId};

/// Coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Default for requests that do not say whether to extract audio.
    #[serde(default = "default_true")]
    pub extract_audio: bool,

    #[serde(default = "default_true")]
    pub detect_scenes: bool,

    /// Only effective together with `detect_scenes`.
    #[serde(default = "default_true")]
    pub extract_frames: bool,

    /// Output directory used when a request has none.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub weights: StageWeights,

    #[serde(default)]
    pub policies: StagePolicies,
}

fn default_true() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            extract_audio: true,
            detect_scenes: true,
            extract_frames: true,
            output_dir: None,
            weights: StageWeights::default(),
            policies: StagePolicies::default(),
        }
    }
}

/// Relative cost of each stage. Renormalized over the selected stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageWeights {
    #[serde(default = "default_validate_weight")]
    pub validate: f64,
    #[serde(default = "default_audio_weight")]
    pub audio: f64,
    #[serde(default = "default_scenes_weight")]
    pub scenes: f64,
    #[serde(default = "default_frames_weight")]
    pub frames: f64,
}

fn default_validate_weight() -> f64 {
    0.05
}

fn default_audio_weight() -> f64 {
    0.25
}

fn default_scenes_weight() -> f64 {
    0.35
}

fn default_frames_weight() -> f64 {
    0.35
}

impl Default for StageWeights {
    fn default() -> Self {
        Self {
            validate: default_validate_weight(),
            audio: default_audio_weight(),
            scenes: default_scenes_weight(),
            frames: default_frames_weight(),
        }
    }
}

impl StageWeights {
    pub fn weight(&self, stage: StageId) -> f64 {
        match stage {
            StageId::Validate => self.validate,
            StageId::Audio => self.audio,
            StageId::Scenes => self.scenes,
            StageId::Frames => self.frames,
        }
    }
}

/// Failure policy of each optional stage. Validation always aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePolicies {
    #[serde(default = "default_continue")]
    pub audio: FailurePolicy,
    #[serde(default = "default_abort")]
    pub scenes: FailurePolicy,
    #[serde(default = "default_abort")]
    pub frames: FailurePolicy,
}

fn default_continue() -> FailurePolicy {
    FailurePolicy::Continue
}

fn default_abort() -> FailurePolicy {
    FailurePolicy::Abort
}

impl Default for StagePolicies {
    fn default() -> Self {
        Self {
            audio: FailurePolicy::Continue,
            scenes: FailurePolicy::Abort,
            frames: FailurePolicy::Abort,
        }
    }
}

impl StagePolicies {
    pub fn policy(&self, stage: StageId) -> FailurePolicy {
        match stage {
            StageId::Validate => FailurePolicy::Abort,
            StageId::Audio => self.audio,
            StageId::Scenes => self.scenes,
            StageId::Frames => self.frames,
        }
    }
}
