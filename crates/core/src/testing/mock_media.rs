//! Mock media collaborators for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::fixtures;
use crate::media::{
    AudioError, AudioExtractor, AudioMetadata, FrameExtractionError, FrameExtractor,
    FrameMetadata, MediaMetadata, SceneDetectionError, SceneDetectionResult, SceneDetector,
    SceneRequest, ValidationError, Validator,
};
use crate::progress::StageProgress;

/// Mock implementation of the Validator trait.
///
/// Unknown paths validate as a 60 second 1080p video with audio. Use
/// [`set_metadata`](Self::set_metadata) to return specific metadata and
/// [`set_failure`](Self::set_failure) to reject a path on every call.
///
/// # Example
///
/// ```rust,ignore
/// use deepbrief_core::testing::MockValidator;
///
/// let validator = Arc::new(MockValidator::new());
/// validator.set_failure("/v/broken.mp4", "No video stream found").await;
///
/// // Use in PipelineCoordinator::new(...)
///
/// assert_eq!(validator.recorded_calls().await.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockValidator {
    calls: Arc<RwLock<Vec<PathBuf>>>,
    metadata: Arc<RwLock<HashMap<PathBuf, MediaMetadata>>>,
    failures: Arc<RwLock<HashMap<PathBuf, String>>>,
    /// If set, the next call fails with this error.
    next_error: Arc<RwLock<Option<ValidationError>>>,
    /// If set, the next call panics with this message.
    next_panic: Arc<RwLock<Option<String>>>,
}

impl Default for MockValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockValidator {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            metadata: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            next_panic: Arc::new(RwLock::new(None)),
        }
    }

    /// Paths passed to `validate`, in call order.
    pub async fn recorded_calls(&self) -> Vec<PathBuf> {
        self.calls.read().await.clone()
    }

    pub async fn set_metadata(&self, path: impl AsRef<Path>, metadata: MediaMetadata) {
        self.metadata
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), metadata);
    }

    /// Rejects `path` as invalid media on every call.
    pub async fn set_failure(&self, path: impl AsRef<Path>, reason: impl Into<String>) {
        self.failures
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), reason.into());
    }

    pub async fn set_next_error(&self, error: ValidationError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_next_panic(&self, message: impl Into<String>) {
        *self.next_panic.write().await = Some(message.into());
    }
}

#[async_trait]
impl Validator for MockValidator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn validate(&self, path: &Path) -> Result<MediaMetadata, ValidationError> {
        self.calls.write().await.push(path.to_path_buf());

        if let Some(message) = self.next_panic.write().await.take() {
            panic!("{}", message);
        }
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if let Some(reason) = self.failures.read().await.get(path) {
            return Err(ValidationError::invalid_media(path, reason.clone()));
        }
        if let Some(metadata) = self.metadata.read().await.get(path) {
            return Ok(metadata.clone());
        }

        Ok(fixtures::media_metadata(path, 60.0))
    }
}

/// A recorded audio extraction for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedAudioCall {
    pub video_path: PathBuf,
    pub destination: Option<PathBuf>,
}

/// Mock implementation of the AudioExtractor trait.
///
/// Succeeds with a 16 kHz mono WAV description unless the video has no
/// audio (returns `NoAudioTrack`, like the real extractor) or a failure was
/// configured.
#[derive(Debug)]
pub struct MockAudioExtractor {
    calls: Arc<RwLock<Vec<RecordedAudioCall>>>,
    next_error: Arc<RwLock<Option<AudioError>>>,
    next_panic: Arc<RwLock<Option<String>>>,
}

impl Default for MockAudioExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAudioExtractor {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            next_panic: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedAudioCall> {
        self.calls.read().await.clone()
    }

    pub async fn set_next_error(&self, error: AudioError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_next_panic(&self, message: impl Into<String>) {
        *self.next_panic.write().await = Some(message.into());
    }
}

#[async_trait]
impl AudioExtractor for MockAudioExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn extract_audio(
        &self,
        video: &MediaMetadata,
        destination: Option<&Path>,
        progress: &StageProgress,
    ) -> Result<AudioMetadata, AudioError> {
        self.calls.write().await.push(RecordedAudioCall {
            video_path: video.file_path.clone(),
            destination: destination.map(Path::to_path_buf),
        });

        if let Some(message) = self.next_panic.write().await.take() {
            panic!("{}", message);
        }
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if !video.has_audio {
            return Err(AudioError::NoAudioTrack {
                path: video.file_path.clone(),
            });
        }

        progress.report(0.5);
        let output = destination.map(Path::to_path_buf).unwrap_or_else(|| {
            std::env::temp_dir().join(format!(
                "{}_audio.wav",
                video
                    .file_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default()
            ))
        });
        progress.report(1.0);

        Ok(fixtures::audio_metadata(output, video.duration))
    }
}

/// Mock implementation of the SceneDetector trait.
///
/// Splits the video into three equal scenes unless a result was configured.
#[derive(Debug)]
pub struct MockSceneDetector {
    calls: Arc<RwLock<Vec<PathBuf>>>,
    result: Arc<RwLock<Option<SceneDetectionResult>>>,
    next_error: Arc<RwLock<Option<SceneDetectionError>>>,
    next_panic: Arc<RwLock<Option<String>>>,
    /// Simulated detection time.
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockSceneDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSceneDetector {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            result: Arc::new(RwLock::new(None)),
            next_error: Arc::new(RwLock::new(None)),
            next_panic: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    pub async fn recorded_calls(&self) -> Vec<PathBuf> {
        self.calls.read().await.clone()
    }

    /// Returns `result` for every call.
    pub async fn set_result(&self, result: SceneDetectionResult) {
        *self.result.write().await = Some(result);
    }

    pub async fn set_next_error(&self, error: SceneDetectionError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_next_panic(&self, message: impl Into<String>) {
        *self.next_panic.write().await = Some(message.into());
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }
}

#[async_trait]
impl SceneDetector for MockSceneDetector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn detect_scenes(
        &self,
        video: &MediaMetadata,
        progress: &StageProgress,
    ) -> Result<SceneDetectionResult, SceneDetectionError> {
        self.calls.write().await.push(video.file_path.clone());

        if let Some(message) = self.next_panic.write().await.take() {
            panic!("{}", message);
        }
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        progress.report(0.3);
        let result = match self.result.read().await.as_ref() {
            Some(result) => result.clone(),
            None => fixtures::scene_result(video.duration, 3),
        };
        progress.report(1.0);
        Ok(result)
    }
}

/// A recorded frame extraction for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFrameCall {
    pub video_path: PathBuf,
    pub scenes: Vec<SceneRequest>,
    pub destination: Option<PathBuf>,
}

/// Mock implementation of the FrameExtractor trait.
///
/// Describes one frame per requested scene at the scene midpoint.
#[derive(Debug)]
pub struct MockFrameExtractor {
    calls: Arc<RwLock<Vec<RecordedFrameCall>>>,
    next_error: Arc<RwLock<Option<FrameExtractionError>>>,
    next_panic: Arc<RwLock<Option<String>>>,
}

impl Default for MockFrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFrameExtractor {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            next_panic: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedFrameCall> {
        self.calls.read().await.clone()
    }

    pub async fn set_next_error(&self, error: FrameExtractionError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_next_panic(&self, message: impl Into<String>) {
        *self.next_panic.write().await = Some(message.into());
    }
}

#[async_trait]
impl FrameExtractor for MockFrameExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn extract_frames(
        &self,
        video: &MediaMetadata,
        scenes: &[SceneRequest],
        destination: Option<&Path>,
        progress: &StageProgress,
    ) -> Result<Vec<FrameMetadata>, FrameExtractionError> {
        self.calls.write().await.push(RecordedFrameCall {
            video_path: video.file_path.clone(),
            scenes: scenes.to_vec(),
            destination: destination.map(Path::to_path_buf),
        });

        if let Some(message) = self.next_panic.write().await.take() {
            panic!("{}", message);
        }
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let dir = destination
            .map(Path::to_path_buf)
            .unwrap_or_else(|| std::env::temp_dir().join("frames"));
        let total = scenes.len();
        let mut frames = Vec::with_capacity(total);
        for (i, scene) in scenes.iter().enumerate() {
            frames.push(fixtures::frame_metadata(
                dir.join(format!("scene_{:03}.jpg", scene.index)),
                scene.midpoint(),
                scene.index,
            ));
            progress.report((i + 1) as f64 / total as f64);
        }
        Ok(frames)
    }
}
