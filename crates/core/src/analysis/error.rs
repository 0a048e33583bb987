//! Recorded analysis errors.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::outcome::StageId;
use crate::media::{AudioError, FrameExtractionError, SceneDetectionError, ToolError, ValidationError};

/// Stable classification tag of a recorded error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    FileNotFound,
    UnsupportedFormat,
    FileTooLarge,
    InvalidVideo,
    ValidationFailed,
    NoAudioStream,
    AudioExtractionFailed,
    SceneDetectionFailed,
    FrameExtractionFailed,
    ToolNotFound,
    ToolTimeout,
    UnexpectedError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FileNotFound => "FILE_NOT_FOUND",
            ErrorKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorKind::FileTooLarge => "FILE_TOO_LARGE",
            ErrorKind::InvalidVideo => "INVALID_VIDEO",
            ErrorKind::ValidationFailed => "VALIDATION_FAILED",
            ErrorKind::NoAudioStream => "NO_AUDIO_STREAM",
            ErrorKind::AudioExtractionFailed => "AUDIO_EXTRACTION_FAILED",
            ErrorKind::SceneDetectionFailed => "SCENE_DETECTION_FAILED",
            ErrorKind::FrameExtractionFailed => "FRAME_EXTRACTION_FAILED",
            ErrorKind::ToolNotFound => "TOOL_NOT_FOUND",
            ErrorKind::ToolTimeout => "TOOL_TIMEOUT",
            ErrorKind::UnexpectedError => "UNEXPECTED_ERROR",
        }
    }
}

/// Flattened, cloneable record of one stage error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct AnalysisError {
    pub kind: ErrorKind,
    pub stage: StageId,
    pub message: String,
    pub file_path: Option<PathBuf>,
    #[serde(default)]
    pub details: Value,
}

fn tool_details(tool: &ToolError) -> (Option<ErrorKind>, Value) {
    match tool {
        ToolError::NotFound { tool, path } => (
            Some(ErrorKind::ToolNotFound),
            json!({ "tool": tool, "path": path }),
        ),
        ToolError::Timeout { tool, timeout_secs } => (
            Some(ErrorKind::ToolTimeout),
            json!({ "tool": tool, "timeout_secs": timeout_secs }),
        ),
        ToolError::Failed { tool, code, stderr } => (
            None,
            json!({ "tool": tool, "exit_code": code, "stderr": stderr }),
        ),
        ToolError::Io(_) => (None, Value::Null),
    }
}

impl AnalysisError {
    pub fn new(kind: ErrorKind, stage: StageId, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
            file_path: None,
            details: Value::Null,
        }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// An unclassified fault, such as a collaborator panic.
    pub fn unexpected(stage: StageId, message: impl Into<String>, path: &Path) -> Self {
        Self::new(ErrorKind::UnexpectedError, stage, message).with_file(path)
    }

    pub fn from_validation(err: &ValidationError, path: &Path) -> Self {
        let (kind, details) = match err {
            ValidationError::FileNotFound { .. } => (ErrorKind::FileNotFound, Value::Null),
            ValidationError::UnsupportedFormat {
                format, supported, ..
            } => (
                ErrorKind::UnsupportedFormat,
                json!({ "format": format, "supported_formats": supported }),
            ),
            ValidationError::FileTooLarge { size_mb, max_mb, .. } => (
                ErrorKind::FileTooLarge,
                json!({ "size_mb": size_mb, "max_size_mb": max_mb }),
            ),
            ValidationError::InvalidMedia { .. } => (ErrorKind::InvalidVideo, Value::Null),
            ValidationError::ProbeFailed { .. } => (ErrorKind::ValidationFailed, Value::Null),
            ValidationError::Tool(tool) => {
                let (kind, details) = tool_details(tool);
                (kind.unwrap_or(ErrorKind::ValidationFailed), details)
            }
        };
        Self::new(kind, StageId::Validate, err.to_string())
            .with_file(path)
            .with_details(details)
    }

    pub fn from_audio(err: &AudioError, path: &Path) -> Self {
        let (kind, details) = match err {
            AudioError::NoAudioTrack { .. } => (ErrorKind::NoAudioStream, Value::Null),
            AudioError::ExtractionFailed { .. } => (ErrorKind::AudioExtractionFailed, Value::Null),
            AudioError::Tool(tool) => {
                let (kind, details) = tool_details(tool);
                (kind.unwrap_or(ErrorKind::AudioExtractionFailed), details)
            }
        };
        Self::new(kind, StageId::Audio, err.to_string())
            .with_file(path)
            .with_details(details)
    }

    pub fn from_scenes(err: &SceneDetectionError, path: &Path) -> Self {
        let (kind, details) = match err {
            SceneDetectionError::DetectionFailed { .. } => {
                (ErrorKind::SceneDetectionFailed, Value::Null)
            }
            SceneDetectionError::Tool(tool) => {
                let (kind, details) = tool_details(tool);
                (kind.unwrap_or(ErrorKind::SceneDetectionFailed), details)
            }
        };
        Self::new(kind, StageId::Scenes, err.to_string())
            .with_file(path)
            .with_details(details)
    }

    pub fn from_frames(err: &FrameExtractionError, path: &Path) -> Self {
        let (kind, details) = match err {
            FrameExtractionError::SceneFailed { scene_number, .. } => (
                ErrorKind::FrameExtractionFailed,
                json!({ "scene_number": scene_number }),
            ),
            FrameExtractionError::OutputDirectory { path } => (
                ErrorKind::FrameExtractionFailed,
                json!({ "output_dir": path }),
            ),
            FrameExtractionError::ExtractionFailed { .. } => {
                (ErrorKind::FrameExtractionFailed, Value::Null)
            }
            FrameExtractionError::Tool(tool) => {
                let (kind, details) = tool_details(tool);
                (kind.unwrap_or(ErrorKind::FrameExtractionFailed), details)
            }
        };
        Self::new(kind, StageId::Frames, err.to_string())
            .with_file(path)
            .with_details(details)
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        let file = self
            .file_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "the video".to_string());

        match self.kind {
            ErrorKind::FileNotFound => {
                format!("Could not find {}. Please check the file path.", file)
            }
            ErrorKind::UnsupportedFormat => match self.details.get("supported_formats") {
                Some(Value::Array(formats)) => format!(
                    "{} is not in a supported format. Supported formats: {}.",
                    file,
                    formats
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                _ => format!("{} is not in a supported format.", file),
            },
            ErrorKind::FileTooLarge => format!(
                "{} is too large to analyze. Please use a smaller or compressed file.",
                file
            ),
            ErrorKind::InvalidVideo | ErrorKind::ValidationFailed => format!(
                "{} could not be read as a video. The file may be corrupted.",
                file
            ),
            ErrorKind::NoAudioStream => format!("{} has no audio track.", file),
            ErrorKind::AudioExtractionFailed => {
                format!("Audio could not be extracted from {}: {}", file, self.message)
            }
            ErrorKind::SceneDetectionFailed => {
                format!("Scene detection failed for {}: {}", file, self.message)
            }
            ErrorKind::FrameExtractionFailed => {
                format!("Frame extraction failed for {}: {}", file, self.message)
            }
            ErrorKind::ToolNotFound => {
                "A required media tool is not installed. Please install ffmpeg.".to_string()
            }
            ErrorKind::ToolTimeout => format!(
                "Processing {} took too long and was stopped. Try a shorter video.",
                file
            ),
            ErrorKind::UnexpectedError => format!(
                "Unexpected error during video analysis: {}",
                self.message
            ),
        }
    }
}
