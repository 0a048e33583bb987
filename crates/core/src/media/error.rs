//! Error types for the media module.

use std::path::PathBuf;
use thiserror::Error;

/// Failure running an external media tool (ffmpeg, ffprobe, tesseract).
#[derive(Debug, Error)]
pub enum ToolError {
    /// Binary not found on disk or in PATH.
    #[error("{tool} not found at path: {}", .path.display())]
    NotFound { tool: String, path: PathBuf },

    /// Process exceeded its time budget and was killed.
    #[error("{tool} timed out after {timeout_secs} seconds")]
    Timeout { tool: String, timeout_secs: u64 },

    /// Process exited unsuccessfully.
    #[error("{tool} exited with code {code:?}")]
    Failed {
        tool: String,
        code: Option<i32>,
        stderr: Option<String>,
    },

    /// I/O error talking to the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Captured stderr, if the tool produced any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }
}

/// Errors raised while validating a video file. Always fatal for a run.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Video file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("Unsupported video format: {format}")]
    UnsupportedFormat {
        path: PathBuf,
        format: String,
        supported: Vec<String>,
    },

    #[error("Video file too large: {size_mb:.1}MB (max {max_mb:.0}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: f64,
        max_mb: f64,
    },

    /// The file could be opened but holds no usable video.
    #[error("Invalid video file: {reason}")]
    InvalidMedia { path: PathBuf, reason: String },

    #[error("Failed to probe video file: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl ValidationError {
    pub fn invalid_media(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidMedia {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn probe_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by audio extraction.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The video has no audio stream. Not an error condition for a run.
    #[error("No audio stream found in {}", .path.display())]
    NoAudioTrack { path: PathBuf },

    #[error("Audio extraction failed: {reason}")]
    ExtractionFailed { reason: String },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl AudioError {
    pub fn extraction_failed(reason: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            reason: reason.into(),
        }
    }

    /// Whether this is the benign "no audio track" condition.
    pub fn is_no_audio_track(&self) -> bool {
        matches!(self, Self::NoAudioTrack { .. })
    }
}

/// Errors raised by scene detection.
#[derive(Debug, Error)]
pub enum SceneDetectionError {
    #[error("Scene detection failed: {reason}")]
    DetectionFailed { reason: String },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl SceneDetectionError {
    pub fn detection_failed(reason: impl Into<String>) -> Self {
        Self::DetectionFailed {
            reason: reason.into(),
        }
    }
}

/// Errors raised by frame extraction.
#[derive(Debug, Error)]
pub enum FrameExtractionError {
    #[error("Frame extraction failed for scene {scene_number}: {reason}")]
    SceneFailed { scene_number: u32, reason: String },

    #[error("Failed to create frame directory: {}", .path.display())]
    OutputDirectory { path: PathBuf },

    #[error("Frame extraction failed: {reason}")]
    ExtractionFailed { reason: String },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

impl FrameExtractionError {
    pub fn extraction_failed(reason: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::NotFound {
            tool: "ffprobe".to_string(),
            path: PathBuf::from("/usr/bin/ffprobe"),
        };
        assert_eq!(err.to_string(), "ffprobe not found at path: /usr/bin/ffprobe");

        let err = ToolError::Timeout {
            tool: "ffmpeg".to_string(),
            timeout_secs: 30,
        };
        assert_eq!(err.to_string(), "ffmpeg timed out after 30 seconds");
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::FileTooLarge {
            path: PathBuf::from("big.mp4"),
            size_mb: 812.44,
            max_mb: 500.0,
        };
        assert_eq!(err.to_string(), "Video file too large: 812.4MB (max 500MB)");
    }

    #[test]
    fn test_tool_error_is_transparent() {
        let err: AudioError = ToolError::Failed {
            tool: "ffmpeg".to_string(),
            code: Some(1),
            stderr: Some("Invalid data".to_string()),
        }
        .into();
        assert_eq!(err.to_string(), "ffmpeg exited with code Some(1)");
        assert!(!err.is_no_audio_track());
    }

    #[test]
    fn test_no_audio_track_detection() {
        let err = AudioError::NoAudioTrack {
            path: PathBuf::from("silent.mp4"),
        };
        assert!(err.is_no_audio_track());
    }
}
