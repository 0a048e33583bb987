//! Media collaborators: validation, audio extraction, scene detection and
//! frame extraction.
//!
//! The coordinator only depends on the traits in this module. The provided
//! [`FfmpegToolkit`] implements all four of them by shelling out to
//! `ffprobe` and `ffmpeg`.

mod config;
mod error;
mod ffmpeg;
mod probe;
pub(crate) mod process;
mod traits;
mod types;

pub use config::MediaConfig;
pub use error::{AudioError, FrameExtractionError, SceneDetectionError, ToolError, ValidationError};
pub use ffmpeg::{build_scenes, fixed_interval_scenes, parse_scene_cuts, FfmpegToolkit};
pub use probe::{parse_frame_rate, parse_probe_output, AudioStream, ProbeInfo, VideoStream};
pub use process::ToolOutput;
pub use traits::{AudioExtractor, FrameExtractor, SceneDetector, Validator};
pub use types::{
    AudioMetadata, FrameMetadata, MediaMetadata, SceneBoundary, SceneDetectionResult, SceneRequest,
};
