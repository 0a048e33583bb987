//! Configuration for the ffmpeg-backed media toolkit.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for [`FfmpegToolkit`](super::FfmpegToolkit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Timeout for a single tool invocation in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Directory for outputs when the caller gives no destination.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Largest accepted video file in megabytes.
    #[serde(default = "default_max_video_size_mb")]
    pub max_video_size_mb: f64,

    /// Accepted file extensions (lowercase, without dot).
    #[serde(default = "default_supported_formats")]
    pub supported_formats: Vec<String>,

    /// Sample rate of extracted audio in Hz.
    #[serde(default = "default_sample_rate")]
    pub audio_sample_rate: u32,

    /// Channel count of extracted audio.
    #[serde(default = "default_channels")]
    pub audio_channels: u32,

    /// Scene change score threshold in (0, 1].
    #[serde(default = "default_scene_threshold")]
    pub scene_threshold: f64,

    /// Scenes shorter than this (seconds) are merged into the previous one.
    #[serde(default = "default_min_scene_duration")]
    pub min_scene_duration: f64,

    /// Scene length (seconds) used when no cut is detected.
    #[serde(default = "default_fallback_interval")]
    pub fallback_interval: f64,

    /// Image format of extracted frames ("jpg" or "png").
    #[serde(default = "default_frame_format")]
    pub frame_format: String,

    /// JPEG quality scale passed to ffmpeg `-q:v` (2 = best, 31 = worst).
    #[serde(default = "default_frame_quality")]
    pub frame_quality: u8,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_timeout() -> u64 {
    1800 // 30 minutes
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("deepbrief")
}

fn default_max_video_size_mb() -> f64 {
    500.0
}

fn default_supported_formats() -> Vec<String> {
    ["mp4", "mov", "avi", "webm", "mkv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u32 {
    1
}

fn default_scene_threshold() -> f64 {
    0.4
}

fn default_min_scene_duration() -> f64 {
    2.0
}

fn default_fallback_interval() -> f64 {
    30.0
}

fn default_frame_format() -> String {
    "jpg".to_string()
}

fn default_frame_quality() -> u8 {
    2
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_timeout(),
            ffmpeg_log_level: default_log_level(),
            temp_dir: default_temp_dir(),
            max_video_size_mb: default_max_video_size_mb(),
            supported_formats: default_supported_formats(),
            audio_sample_rate: default_sample_rate(),
            audio_channels: default_channels(),
            scene_threshold: default_scene_threshold(),
            min_scene_duration: default_min_scene_duration(),
            fallback_interval: default_fallback_interval(),
            frame_format: default_frame_format(),
            frame_quality: default_frame_quality(),
        }
    }
}

impl MediaConfig {
    /// Whether `extension` (any case) is an accepted video format.
    pub fn is_supported(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.supported_formats.iter().any(|f| *f == extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MediaConfig::default();
        assert_eq!(config.audio_sample_rate, 16000);
        assert_eq!(config.scene_threshold, 0.4);
        assert_eq!(config.frame_format, "jpg");
        assert!(config.is_supported("MP4"));
        assert!(!config.is_supported("gif"));
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            scene_threshold = 0.3
            supported_formats = ["mp4"]
        "#;
        let config: MediaConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.scene_threshold, 0.3);
        assert_eq!(config.supported_formats, vec!["mp4".to_string()]);
        assert_eq!(config.max_video_size_mb, 500.0);
    }
}
