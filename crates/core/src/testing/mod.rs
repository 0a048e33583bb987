//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the collaborator traits the
//! [`PipelineCoordinator`](crate::analysis::PipelineCoordinator) depends on,
//! so the pipeline can be exercised without ffmpeg or tesseract installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use deepbrief_core::testing::{MockAudioExtractor, MockFrameExtractor, MockSceneDetector, MockValidator};
//!
//! let validator = Arc::new(MockValidator::new());
//! let audio = Arc::new(MockAudioExtractor::new());
//! let scenes = Arc::new(MockSceneDetector::new());
//! let frames = Arc::new(MockFrameExtractor::new());
//!
//! // Configure mock responses
//! audio.set_next_error(AudioError::extraction_failed("codec not supported")).await;
//!
//! let coordinator = PipelineCoordinator::new(config, validator, audio, scenes, frames);
//! ```

mod mock_media;
mod mock_text_detector;
mod recording_sink;

pub use mock_media::{
    MockAudioExtractor, MockFrameExtractor, MockSceneDetector, MockValidator, RecordedAudioCall,
    RecordedFrameCall,
};
pub use mock_text_detector::MockTextDetector;
pub use recording_sink::RecordingSink;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::PathBuf;

    use crate::media::{
        AudioMetadata, FrameMetadata, MediaMetadata, SceneBoundary, SceneDetectionResult,
    };
    use crate::ocr::{BoundingBox, OcrResult, TextRegion};

    /// A 1080p, 30 fps H.264 MP4 with an audio track.
    pub fn media_metadata(path: impl Into<PathBuf>, duration: f64) -> MediaMetadata {
        MediaMetadata {
            file_path: path.into(),
            duration,
            width: 1920,
            height: 1080,
            fps: 30.0,
            format: "mp4".to_string(),
            size_mb: 25.0,
            codec: "h264".to_string(),
            has_audio: true,
        }
    }

    /// Same as [`media_metadata`] without an audio track.
    pub fn silent_media_metadata(path: impl Into<PathBuf>, duration: f64) -> MediaMetadata {
        MediaMetadata {
            has_audio: false,
            ..media_metadata(path, duration)
        }
    }

    /// A 16 kHz mono WAV track.
    pub fn audio_metadata(path: impl Into<PathBuf>, duration: f64) -> AudioMetadata {
        AudioMetadata {
            file_path: path.into(),
            duration,
            sample_rate: 16000,
            channels: 1,
            // 16-bit samples
            size_mb: duration * 16000.0 * 2.0 / (1024.0 * 1024.0),
            format: "wav".to_string(),
        }
    }

    /// `count` equal scenes covering `duration`.
    pub fn scene_result(duration: f64, count: u32) -> SceneDetectionResult {
        let length = duration / count.max(1) as f64;
        let scenes = (0..count)
            .map(|i| {
                let start = i as f64 * length;
                let end = if i + 1 == count { duration } else { start + length };
                SceneBoundary::new(start, end, i + 1, if i == 0 { 1.0 } else { 0.8 })
            })
            .collect();
        SceneDetectionResult::new(scenes, "threshold", 0.4, duration)
    }

    pub fn frame_metadata(path: impl Into<PathBuf>, timestamp: f64, scene_number: u32) -> FrameMetadata {
        FrameMetadata {
            frame_path: path.into(),
            timestamp,
            scene_number,
            width: 1920,
            height: 1080,
            size_kb: 180.0,
            format: "jpg".to_string(),
        }
    }

    /// An OCR result with a title and one body region.
    pub fn ocr_result(title: &str, body: &str) -> OcrResult {
        let mut heading = TextRegion::new(title, 95.0, BoundingBox::new(100, 20, 600, 80));
        heading.is_title = true;
        heading.font_size_estimate = Some(80.0 / 54.0);
        let mut text = TextRegion::new(body, 88.0, BoundingBox::new(100, 200, 400, 28));
        text.font_size_estimate = Some(28.0 / 54.0);

        OcrResult {
            full_text: format!("{} {}", title, body),
            engine_used: "mock".to_string(),
            languages_detected: vec!["eng".to_string()],
            total_text_regions: 2,
            high_confidence_regions: 2,
            average_confidence: 91.5,
            text_regions: vec![heading, text],
            ..OcrResult::empty("mock")
        }
    }
}
