//! Collaborator contracts consumed by the analysis coordinator.
//!
//! Implementations are treated as stateless per-call services: the
//! coordinator holds one instance of each for its lifetime and may call them
//! from consecutive runs. Each implementation enforces its own timeouts.

use async_trait::async_trait;
use std::path::Path;

use super::error::{AudioError, FrameExtractionError, SceneDetectionError, ValidationError};
use super::types::{AudioMetadata, FrameMetadata, MediaMetadata, SceneDetectionResult, SceneRequest};
use crate::progress::StageProgress;

/// Inspects a media file and returns its structural metadata.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    /// Validates the file, failing fast on anything that cannot be analyzed.
    async fn validate(&self, path: &Path) -> Result<MediaMetadata, ValidationError>;
}

/// Extracts the audio track of a validated video.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Writes the audio track to `destination` (or a location of the
    /// implementation's choosing) and describes it.
    ///
    /// Returns [`AudioError::NoAudioTrack`] when the video is silent.
    async fn extract_audio(
        &self,
        video: &MediaMetadata,
        destination: Option<&Path>,
        progress: &StageProgress,
    ) -> Result<AudioMetadata, AudioError>;
}

/// Splits a validated video into scenes.
#[async_trait]
pub trait SceneDetector: Send + Sync {
    fn name(&self) -> &str;

    async fn detect_scenes(
        &self,
        video: &MediaMetadata,
        progress: &StageProgress,
    ) -> Result<SceneDetectionResult, SceneDetectionError>;
}

/// Extracts representative frames for a list of scenes.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Extracts one frame per request into `destination`.
    async fn extract_frames(
        &self,
        video: &MediaMetadata,
        scenes: &[SceneRequest],
        destination: Option<&Path>,
        progress: &StageProgress,
    ) -> Result<Vec<FrameMetadata>, FrameExtractionError>;
}
