//! Types for the media module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Structural metadata of a validated video file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Path to the video file.
    pub file_path: PathBuf,
    /// Duration in seconds.
    pub duration: f64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: f64,
    /// Container format (e.g. "mp4").
    pub format: String,
    /// File size in megabytes.
    pub size_mb: f64,
    /// Video codec name.
    pub codec: String,
    /// Whether the container carries at least one audio stream.
    #[serde(default)]
    pub has_audio: bool,
}

/// Extracted audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    pub file_path: PathBuf,
    /// Duration in seconds.
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: u32,
    pub size_mb: f64,
    pub format: String,
}

/// One detected scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneBoundary {
    /// Start time in seconds.
    pub start_time: f64,
    /// End time in seconds.
    pub end_time: f64,
    /// `end_time - start_time`.
    pub duration: f64,
    /// 1-based scene index.
    pub scene_number: u32,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f64,
}

impl SceneBoundary {
    pub fn new(start_time: f64, end_time: f64, scene_number: u32, confidence: f64) -> Self {
        Self {
            start_time,
            end_time,
            duration: end_time - start_time,
            scene_number,
            confidence,
        }
    }
}

/// Output of a scene detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDetectionResult {
    /// Scenes ordered by start time.
    pub scenes: Vec<SceneBoundary>,
    pub total_scenes: usize,
    /// Detection method (e.g. "threshold", "fixed_interval").
    pub detection_method: String,
    pub threshold_used: f64,
    pub video_duration: f64,
    pub average_scene_duration: f64,
}

impl SceneDetectionResult {
    /// Builds a result and derives the count and average duration.
    pub fn new(
        scenes: Vec<SceneBoundary>,
        detection_method: impl Into<String>,
        threshold_used: f64,
        video_duration: f64,
    ) -> Self {
        let total_scenes = scenes.len();
        let average_scene_duration = if total_scenes > 0 {
            scenes.iter().map(|s| s.duration).sum::<f64>() / total_scenes as f64
        } else {
            0.0
        };
        Self {
            scenes,
            total_scenes,
            detection_method: detection_method.into(),
            threshold_used,
            video_duration,
            average_scene_duration,
        }
    }

    /// Frame extraction requests, one per scene.
    pub fn frame_requests(&self) -> Vec<SceneRequest> {
        self.scenes.iter().map(SceneRequest::from).collect()
    }
}

/// A `(start, end, index)` request for frame extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneRequest {
    pub start: f64,
    pub end: f64,
    pub index: u32,
}

impl SceneRequest {
    /// Timestamp halfway through the scene.
    pub fn midpoint(&self) -> f64 {
        self.start + (self.end - self.start) / 2.0
    }
}

impl From<&SceneBoundary> for SceneRequest {
    fn from(scene: &SceneBoundary) -> Self {
        Self {
            start: scene.start_time,
            end: scene.end_time,
            index: scene.scene_number,
        }
    }
}

/// One extracted frame image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub frame_path: PathBuf,
    /// Timestamp in seconds.
    pub timestamp: f64,
    pub scene_number: u32,
    pub width: u32,
    pub height: u32,
    pub size_kb: f64,
    pub format: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_result_derives_stats() {
        let result = SceneDetectionResult::new(
            vec![
                SceneBoundary::new(0.0, 10.0, 1, 0.8),
                SceneBoundary::new(10.0, 30.0, 2, 0.6),
            ],
            "threshold",
            0.4,
            30.0,
        );

        assert_eq!(result.total_scenes, 2);
        assert_eq!(result.average_scene_duration, 15.0);
    }

    #[test]
    fn test_empty_scene_result() {
        let result = SceneDetectionResult::new(vec![], "threshold", 0.4, 12.0);
        assert_eq!(result.total_scenes, 0);
        assert_eq!(result.average_scene_duration, 0.0);
        assert!(result.frame_requests().is_empty());
    }

    #[test]
    fn test_frame_requests_follow_scenes() {
        let result = SceneDetectionResult::new(
            vec![
                SceneBoundary::new(0.0, 4.0, 1, 1.0),
                SceneBoundary::new(4.0, 10.0, 2, 1.0),
            ],
            "threshold",
            0.4,
            10.0,
        );

        let requests = result.frame_requests();
        assert_eq!(
            requests,
            vec![
                SceneRequest { start: 0.0, end: 4.0, index: 1 },
                SceneRequest { start: 4.0, end: 10.0, index: 2 },
            ]
        );
        assert_eq!(requests[1].midpoint(), 7.0);
    }

    #[test]
    fn test_media_metadata_defaults_has_audio() {
        let json = r#"{
            "file_path": "/v/talk.mp4", "duration": 60.0, "width": 1280, "height": 720,
            "fps": 30.0, "format": "mp4", "size_mb": 12.5, "codec": "h264"
        }"#;
        let meta: MediaMetadata = serde_json::from_str(json).unwrap();
        assert!(!meta.has_audio);
    }
}
