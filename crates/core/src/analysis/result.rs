//! Analysis results and their serialized projection.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::error::{AnalysisError, ErrorKind};
use crate::media::{AudioMetadata, FrameMetadata, MediaMetadata, SceneDetectionResult};

/// Collects stage outputs and errors while a run is in progress.
///
/// Frozen into an [`AnalysisResult`] on every exit path.
#[derive(Debug)]
pub struct AnalysisAccumulator {
    run_id: String,
    video_path: PathBuf,
    started: Instant,
    video_info: Option<MediaMetadata>,
    audio_info: Option<AudioMetadata>,
    scene_result: Option<SceneDetectionResult>,
    frame_infos: Vec<FrameMetadata>,
    errors: Vec<AnalysisError>,
}

impl AnalysisAccumulator {
    pub fn new(run_id: impl Into<String>, video_path: impl Into<PathBuf>) -> Self {
        Self {
            run_id: run_id.into(),
            video_path: video_path.into(),
            started: Instant::now(),
            video_info: None,
            audio_info: None,
            scene_result: None,
            frame_infos: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn set_video_info(&mut self, info: MediaMetadata) {
        self.video_info = Some(info);
    }

    pub fn set_audio_info(&mut self, info: AudioMetadata) {
        self.audio_info = Some(info);
    }

    pub fn set_scene_result(&mut self, result: SceneDetectionResult) {
        self.scene_result = Some(result);
    }

    pub fn set_frame_infos(&mut self, frames: Vec<FrameMetadata>) {
        self.frame_infos = frames;
    }

    pub fn record_error(&mut self, error: AnalysisError) {
        self.errors.push(error);
    }

    pub fn video_info(&self) -> Option<&MediaMetadata> {
        self.video_info.as_ref()
    }

    pub fn audio_info(&self) -> Option<&AudioMetadata> {
        self.audio_info.as_ref()
    }

    pub fn scene_result(&self) -> Option<&SceneDetectionResult> {
        self.scene_result.as_ref()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_infos.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn freeze(self) -> AnalysisResult {
        let error_message = self.errors.first().map(AnalysisError::user_message);
        AnalysisResult {
            run_id: self.run_id,
            video_path: self.video_path,
            video_info: self.video_info,
            audio_info: self.audio_info,
            scene_result: self.scene_result,
            frame_infos: self.frame_infos,
            processing_time: self.started.elapsed().as_secs_f64(),
            success: self.errors.is_empty(),
            error_message,
            errors: self.errors,
        }
    }
}

/// Immutable outcome of analyzing one video.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    run_id: String,
    video_path: PathBuf,
    video_info: Option<MediaMetadata>,
    audio_info: Option<AudioMetadata>,
    scene_result: Option<SceneDetectionResult>,
    frame_infos: Vec<FrameMetadata>,
    processing_time: f64,
    success: bool,
    error_message: Option<String>,
    errors: Vec<AnalysisError>,
}

impl AnalysisResult {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    /// Absent only when validation failed.
    pub fn video_info(&self) -> Option<&MediaMetadata> {
        self.video_info.as_ref()
    }

    pub fn audio_info(&self) -> Option<&AudioMetadata> {
        self.audio_info.as_ref()
    }

    pub fn scene_result(&self) -> Option<&SceneDetectionResult> {
        self.scene_result.as_ref()
    }

    pub fn frame_infos(&self) -> &[FrameMetadata] {
        &self.frame_infos
    }

    /// Wall-clock duration of the run in seconds.
    pub fn processing_time(&self) -> f64 {
        self.processing_time
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// User-facing rendering of the first recorded error.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn errors(&self) -> &[AnalysisError] {
        &self.errors
    }

    pub fn error_summary(&self) -> Option<ErrorSummary> {
        if self.errors.is_empty() {
            return None;
        }
        Some(ErrorSummary {
            total_errors: self.errors.len(),
            error_types: self.errors.iter().map(|e| e.kind).collect(),
            errors: self.errors.clone(),
        })
    }

    pub fn to_projection(&self) -> AnalysisProjection {
        AnalysisProjection {
            run_id: self.run_id.clone(),
            video_path: self.video_path.clone(),
            video_info: self.video_info.clone(),
            audio_info: self.audio_info.clone(),
            scene_result: self.scene_result.clone(),
            frame_infos: self.frame_infos.clone(),
            processing_time: self.processing_time,
            success: self.success,
            error_message: self.error_message.clone(),
            error_summary: self.error_summary(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub total_errors: usize,
    pub error_types: Vec<ErrorKind>,
    pub errors: Vec<AnalysisError>,
}

/// Serializable view of an [`AnalysisResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisProjection {
    pub run_id: String,
    pub video_path: PathBuf,
    pub video_info: Option<MediaMetadata>,
    pub audio_info: Option<AudioMetadata>,
    pub scene_result: Option<SceneDetectionResult>,
    #[serde(default)]
    pub frame_infos: Vec<FrameMetadata>,
    pub processing_time: f64,
    pub success: bool,
    pub error_message: Option<String>,
    pub error_summary: Option<ErrorSummary>,
}

/// Results of a batch run, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    batch_id: String,
    results: Vec<AnalysisResult>,
    interrupted: Option<String>,
}

impl BatchResult {
    pub fn new(
        batch_id: impl Into<String>,
        results: Vec<AnalysisResult>,
        interrupted: Option<String>,
    ) -> Self {
        Self {
            batch_id: batch_id.into(),
            results,
            interrupted,
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn results(&self) -> &[AnalysisResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn successful_count(&self) -> usize {
        self.results.iter().filter(|r| r.success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.successful_count()
    }

    /// Why the batch stopped before processing every input, if it did.
    pub fn interrupted(&self) -> Option<&str> {
        self.interrupted.as_deref()
    }

    pub fn into_results(self) -> Vec<AnalysisResult> {
        self.results
    }

    pub fn to_projection(&self) -> BatchProjection {
        BatchProjection {
            batch_id: self.batch_id.clone(),
            total: self.results.len(),
            successful: self.successful_count(),
            failed: self.failed_count(),
            interrupted: self.interrupted.clone(),
            results: self.results.iter().map(AnalysisResult::to_projection).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProjection {
    pub batch_id: String,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub interrupted: Option<String>,
    pub results: Vec<AnalysisProjection>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StageId;
    use crate::testing::fixtures;

    #[test]
    fn test_empty_run_is_success() {
        let mut acc = AnalysisAccumulator::new("video_analysis_0000abcd", "/v/talk.mp4");
        acc.set_video_info(fixtures::media_metadata("/v/talk.mp4", 60.0));
        let result = acc.freeze();

        assert!(result.success());
        assert_eq!(result.error_message(), None);
        assert_eq!(result.error_summary(), None);

        let json = serde_json::to_value(result.to_projection()).unwrap();
        assert!(json["audio_info"].is_null());
        assert!(json["scene_result"].is_null());
        assert_eq!(json["frame_infos"], serde_json::json!([]));
        assert!(json["error_summary"].is_null());
        assert_eq!(json["video_info"]["duration"], 60.0);
    }

    #[test]
    fn test_first_error_wins() {
        let mut acc = AnalysisAccumulator::new("run", "/v/talk.mp4");
        let first = AnalysisError::new(ErrorKind::AudioExtractionFailed, StageId::Audio, "codec")
            .with_file("/v/talk.mp4");
        let second = AnalysisError::new(ErrorKind::SceneDetectionFailed, StageId::Scenes, "boom")
            .with_file("/v/talk.mp4");
        acc.record_error(first.clone());
        acc.record_error(second);

        let result = acc.freeze();
        assert!(!result.success());
        assert_eq!(result.error_message(), Some(first.user_message().as_str()));

        let summary = result.error_summary().unwrap();
        assert_eq!(summary.total_errors, 2);
        assert_eq!(
            summary.error_types,
            vec![ErrorKind::AudioExtractionFailed, ErrorKind::SceneDetectionFailed]
        );
    }

    #[test]
    fn test_validation_failure_has_null_video_info() {
        let mut acc = AnalysisAccumulator::new("run", "/v/missing.mp4");
        acc.record_error(AnalysisError::new(
            ErrorKind::FileNotFound,
            StageId::Validate,
            "Video file not found",
        ));
        let json = serde_json::to_value(acc.freeze().to_projection()).unwrap();

        assert!(json["video_info"].is_null());
        assert_eq!(json["success"], false);
        assert_eq!(json["error_summary"]["error_types"][0], "FILE_NOT_FOUND");
    }

    #[test]
    fn test_batch_counts() {
        let ok = AnalysisAccumulator::new("a", "/v/a.mp4").freeze();
        let mut failed = AnalysisAccumulator::new("b", "/v/b.mp4");
        failed.record_error(AnalysisError::new(
            ErrorKind::InvalidVideo,
            StageId::Validate,
            "bad",
        ));
        let batch = BatchResult::new("batch_analysis_1", vec![ok, failed.freeze()], None);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.successful_count(), 1);
        assert_eq!(batch.failed_count(), 1);

        let projection = batch.to_projection();
        assert_eq!(projection.total, 2);
        assert_eq!(projection.results[1].video_path, PathBuf::from("/v/b.mp4"));
    }
}
