//! ffmpeg/ffprobe-backed implementation of the media collaborators.

use async_trait::async_trait;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::config::MediaConfig;
use super::error::{AudioError, FrameExtractionError, SceneDetectionError, ToolError, ValidationError};
use super::probe::{parse_probe_output, ProbeInfo};
use super::process::{run_command, run_with_progress};
use super::traits::{AudioExtractor, FrameExtractor, SceneDetector, Validator};
use super::types::{
    AudioMetadata, FrameMetadata, MediaMetadata, SceneBoundary, SceneDetectionResult, SceneRequest,
};
use crate::progress::StageProgress;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Implements every media collaborator on top of the ffmpeg CLI tools.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    config: MediaConfig,
}

impl FfmpegToolkit {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(MediaConfig::default())
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Checks that ffmpeg and ffprobe can be executed.
    pub async fn check_tools(&self) -> Result<(), ToolError> {
        let version = vec!["-version".to_string()];
        run_command("ffmpeg", &self.config.ffmpeg_path, &version, 10).await?;
        run_command("ffprobe", &self.config.ffprobe_path, &version, 10).await?;
        Ok(())
    }

    /// Runs ffprobe on `path`.
    pub async fn probe(&self, path: &Path) -> Result<ProbeInfo, ValidationError> {
        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            path.to_string_lossy().to_string(),
        ];

        let output = run_command(
            "ffprobe",
            &self.config.ffprobe_path,
            &args,
            self.config.timeout_secs,
        )
        .await
        .map_err(|e| match e {
            ToolError::Failed { stderr, code, .. } => ValidationError::probe_failed(
                path,
                stderr.unwrap_or_else(|| format!("ffprobe exited with code {:?}", code)),
            ),
            other => ValidationError::Tool(other),
        })?;

        parse_probe_output(path, &output.stdout)
            .map_err(|reason| ValidationError::probe_failed(path, reason))
    }

    fn common_args(&self) -> [String; 2] {
        ["-loglevel".to_string(), self.config.ffmpeg_log_level.clone()]
    }

    fn build_audio_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vn".to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            self.config.audio_sample_rate.to_string(),
            "-ac".to_string(),
            self.config.audio_channels.to_string(),
        ];
        args.extend(self.common_args());
        args.extend([
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
        ]);
        args.push(output.to_string_lossy().to_string());
        args
    }

    fn build_scene_args(&self, input: &Path) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!(
                "select='gt(scene,{})',metadata=print:file=-",
                self.config.scene_threshold
            ),
            "-an".to_string(),
            "-f".to_string(),
            "null".to_string(),
        ];
        args.extend(self.common_args());
        args.extend([
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
        ]);
        args.push("-".to_string());
        args
    }

    fn build_frame_args(&self, input: &Path, timestamp: f64, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            format!("{:.3}", timestamp),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
        ];
        if matches!(self.config.frame_format.as_str(), "jpg" | "jpeg") {
            args.extend(["-q:v".to_string(), self.config.frame_quality.to_string()]);
        }
        args.extend(self.common_args());
        args.push(output.to_string_lossy().to_string());
        args
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string())
}

/// Extracts `(time, score)` pairs from `metadata=print` output.
pub fn parse_scene_cuts(output: &str) -> Vec<(f64, f64)> {
    let (Ok(time_re), Ok(score_re)) = (
        Regex::new(r"pts_time:(\d+(?:\.\d+)?)"),
        Regex::new(r"lavfi\.scene_score=(\d+(?:\.\d+)?)"),
    ) else {
        return Vec::new();
    };

    let mut cuts = Vec::new();
    let mut pending: Option<f64> = None;
    for line in output.lines() {
        if let Some(t) = time_re
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            pending = Some(t);
        } else if let Some(score) = score_re
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            if let Some(t) = pending.take() {
                cuts.push((t, score.clamp(0.0, 1.0)));
            }
        }
    }
    cuts
}

/// Builds contiguous scenes covering `[0, duration]` from detected cuts.
///
/// A cut closer than `min_scene_duration` to the previous boundary is
/// dropped, merging the short scene into its predecessor. A trailing scene
/// shorter than the minimum is merged the same way.
pub fn build_scenes(cuts: &[(f64, f64)], duration: f64, min_scene_duration: f64) -> Vec<SceneBoundary> {
    if duration <= 0.0 {
        return Vec::new();
    }

    let mut sorted: Vec<(f64, f64)> = cuts
        .iter()
        .copied()
        .filter(|(t, _)| *t > 0.0 && *t < duration)
        .collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut starts: Vec<(f64, f64)> = vec![(0.0, 1.0)];
    for (time, score) in sorted {
        let last = starts.last().map(|s| s.0).unwrap_or(0.0);
        if time - last < min_scene_duration {
            continue;
        }
        starts.push((time, score));
    }
    if starts.len() > 1 {
        if let Some(&(last, _)) = starts.last() {
            if duration - last < min_scene_duration {
                starts.pop();
            }
        }
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, (start, confidence))| {
            let end = starts.get(i + 1).map(|s| s.0).unwrap_or(duration);
            SceneBoundary::new(*start, end, i as u32 + 1, *confidence)
        })
        .collect()
}

/// Splits `[0, duration]` into scenes of `interval` seconds.
pub fn fixed_interval_scenes(duration: f64, interval: f64) -> Vec<SceneBoundary> {
    if duration <= 0.0 {
        return Vec::new();
    }
    let interval = if interval > 0.0 { interval } else { duration };
    let count = (duration / interval).ceil().max(1.0) as u32;

    (0..count)
        .map(|i| {
            let start = i as f64 * interval;
            let end = ((i + 1) as f64 * interval).min(duration);
            SceneBoundary::new(start, end, i + 1, 0.5)
        })
        .collect()
}

#[async_trait]
impl Validator for FfmpegToolkit {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn validate(&self, path: &Path) -> Result<MediaMetadata, ValidationError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|_| ValidationError::FileNotFound {
                path: path.to_path_buf(),
            })?;
        if !meta.is_file() {
            return Err(ValidationError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !self.config.is_supported(&extension) {
            return Err(ValidationError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: extension,
                supported: self.config.supported_formats.clone(),
            });
        }

        let size_mb = meta.len() as f64 / BYTES_PER_MB;
        if size_mb > self.config.max_video_size_mb {
            return Err(ValidationError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb,
                max_mb: self.config.max_video_size_mb,
            });
        }

        let probe = self.probe(path).await?;
        let Some(video) = probe.video else {
            return Err(ValidationError::invalid_media(path, "No video stream found"));
        };
        if probe.duration <= 0.0 {
            return Err(ValidationError::invalid_media(path, "Video has no duration"));
        }

        debug!(
            path = %path.display(),
            duration = probe.duration,
            width = video.width,
            height = video.height,
            "Video validated"
        );

        Ok(MediaMetadata {
            file_path: path.to_path_buf(),
            duration: probe.duration,
            width: video.width,
            height: video.height,
            fps: video.fps,
            format: extension,
            size_mb,
            codec: video.codec,
            has_audio: probe.audio.is_some(),
        })
    }
}

#[async_trait]
impl AudioExtractor for FfmpegToolkit {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn extract_audio(
        &self,
        video: &MediaMetadata,
        destination: Option<&Path>,
        progress: &StageProgress,
    ) -> Result<AudioMetadata, AudioError> {
        if !video.has_audio {
            return Err(AudioError::NoAudioTrack {
                path: video.file_path.clone(),
            });
        }

        let output: PathBuf = match destination {
            Some(path) => path.to_path_buf(),
            None => self
                .config
                .temp_dir
                .join(format!("{}_audio.wav", file_stem(&video.file_path))),
        };
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AudioError::extraction_failed(format!("{}: {}", parent.display(), e)))?;
        }

        let args = self.build_audio_args(&video.file_path, &output);
        let result = run_with_progress(
            "ffmpeg",
            &self.config.ffmpeg_path,
            &args,
            self.config.timeout_secs,
            video.duration,
            |fraction| progress.report(fraction),
        )
        .await;

        if let Err(ToolError::Failed { stderr: Some(stderr), .. }) = &result {
            if stderr.contains("does not contain any stream")
                || stderr.contains("matches no streams")
            {
                return Err(AudioError::NoAudioTrack {
                    path: video.file_path.clone(),
                });
            }
        }
        result?;

        let probe = self
            .probe(&output)
            .await
            .map_err(|e| AudioError::extraction_failed(e.to_string()))?;
        let stream = probe
            .audio
            .ok_or_else(|| AudioError::extraction_failed("Extracted file has no audio stream"))?;

        progress.report(1.0);
        info!(
            path = %output.display(),
            duration = probe.duration,
            "Audio extracted"
        );

        Ok(AudioMetadata {
            file_path: output,
            duration: stream.duration.unwrap_or(probe.duration),
            sample_rate: stream.sample_rate,
            channels: stream.channels,
            size_mb: probe.size_bytes as f64 / BYTES_PER_MB,
            format: "wav".to_string(),
        })
    }
}

#[async_trait]
impl SceneDetector for FfmpegToolkit {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn detect_scenes(
        &self,
        video: &MediaMetadata,
        progress: &StageProgress,
    ) -> Result<SceneDetectionResult, SceneDetectionError> {
        let args = self.build_scene_args(&video.file_path);
        let output = run_with_progress(
            "ffmpeg",
            &self.config.ffmpeg_path,
            &args,
            self.config.timeout_secs,
            video.duration,
            |fraction| progress.report(fraction),
        )
        .await?;

        let cuts = parse_scene_cuts(&output.stdout);
        let threshold = self.config.scene_threshold;

        let result = if cuts.is_empty() {
            warn!(
                path = %video.file_path.display(),
                interval = self.config.fallback_interval,
                "No scene changes detected, using fixed intervals"
            );
            SceneDetectionResult::new(
                fixed_interval_scenes(video.duration, self.config.fallback_interval),
                "fixed_interval",
                threshold,
                video.duration,
            )
        } else {
            SceneDetectionResult::new(
                build_scenes(&cuts, video.duration, self.config.min_scene_duration),
                "threshold",
                threshold,
                video.duration,
            )
        };

        progress.report(1.0);
        info!(
            path = %video.file_path.display(),
            scenes = result.total_scenes,
            method = %result.detection_method,
            "Scene detection complete"
        );
        Ok(result)
    }
}

#[async_trait]
impl FrameExtractor for FfmpegToolkit {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn extract_frames(
        &self,
        video: &MediaMetadata,
        scenes: &[SceneRequest],
        destination: Option<&Path>,
        progress: &StageProgress,
    ) -> Result<Vec<FrameMetadata>, FrameExtractionError> {
        let dir = destination
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.temp_dir.join("frames"));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|_| FrameExtractionError::OutputDirectory { path: dir.clone() })?;

        let total = scenes.len();
        let mut frames = Vec::with_capacity(total);

        for (i, scene) in scenes.iter().enumerate() {
            let timestamp = scene.midpoint();
            let path = dir.join(format!(
                "scene_{:03}.{}",
                scene.index, self.config.frame_format
            ));
            let args = self.build_frame_args(&video.file_path, timestamp, &path);

            run_command("ffmpeg", &self.config.ffmpeg_path, &args, self.config.timeout_secs)
                .await
                .map_err(|e| FrameExtractionError::SceneFailed {
                    scene_number: scene.index,
                    reason: e.stderr().map(str::to_string).unwrap_or_else(|| e.to_string()),
                })?;

            let size = tokio::fs::metadata(&path)
                .await
                .map_err(|_| FrameExtractionError::SceneFailed {
                    scene_number: scene.index,
                    reason: "Frame file was not created".to_string(),
                })?
                .len();

            frames.push(FrameMetadata {
                frame_path: path,
                timestamp,
                scene_number: scene.index,
                width: video.width,
                height: video.height,
                size_kb: size as f64 / 1024.0,
                format: self.config.frame_format.clone(),
            });

            progress.report((i + 1) as f64 / total as f64);
        }

        info!(dir = %dir.display(), frames = frames.len(), "Frames extracted");
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_scene_cuts() {
        let output = "\
frame:0    pts:120120  pts_time:4.004
lavfi.scene_score=0.532110
frame:1    pts:270270  pts_time:9.009
lavfi.scene_score=0.912000
";
        let cuts = parse_scene_cuts(output);
        assert_eq!(cuts, vec![(4.004, 0.53211), (9.009, 0.912)]);
    }

    #[test]
    fn test_build_scenes_covers_duration() {
        let scenes = build_scenes(&[(10.0, 0.8), (25.0, 0.6)], 40.0, 2.0);

        assert_eq!(scenes.len(), 3);
        assert_eq!(scenes[0].start_time, 0.0);
        assert_eq!(scenes[1].start_time, 10.0);
        assert_eq!(scenes[2].end_time, 40.0);
        assert_eq!(scenes[2].duration, 15.0);
        assert_eq!(
            scenes.iter().map(|s| s.scene_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_build_scenes_merges_short_scenes() {
        // 10.5 is too close to 10.0; 39.0 leaves a 1s tail
        let scenes = build_scenes(&[(10.0, 0.8), (10.5, 0.9), (39.0, 0.7)], 40.0, 2.0);

        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[1].start_time, 10.0);
        assert_eq!(scenes[1].end_time, 40.0);
    }

    #[test]
    fn test_build_scenes_ignores_out_of_range_cuts() {
        let scenes = build_scenes(&[(0.0, 0.9), (50.0, 0.9)], 40.0, 2.0);
        assert_eq!(scenes.len(), 1);
        assert_eq!(scenes[0].duration, 40.0);
    }

    #[test]
    fn test_fixed_interval_scenes() {
        let scenes = fixed_interval_scenes(75.0, 30.0);
        assert_eq!(scenes.len(), 3);
        assert_eq!(scenes[2].start_time, 60.0);
        assert_eq!(scenes[2].end_time, 75.0);

        assert!(fixed_interval_scenes(0.0, 30.0).is_empty());
        assert_eq!(fixed_interval_scenes(12.0, 30.0).len(), 1);
    }

    #[test]
    fn test_build_audio_args() {
        let toolkit = FfmpegToolkit::with_defaults();
        let args = toolkit.build_audio_args(Path::new("/in/talk.mp4"), Path::new("/out/talk_audio.wav"));

        assert!(args.contains(&"pcm_s16le".to_string()));
        assert!(args.contains(&"16000".to_string()));
        assert!(args.contains(&"-vn".to_string()));
        assert_eq!(args.last(), Some(&"/out/talk_audio.wav".to_string()));
    }

    #[test]
    fn test_build_scene_args_uses_threshold() {
        let toolkit = FfmpegToolkit::new(MediaConfig {
            scene_threshold: 0.3,
            ..Default::default()
        });
        let args = toolkit.build_scene_args(Path::new("/in/talk.mp4"));
        assert!(args.contains(&"select='gt(scene,0.3)',metadata=print:file=-".to_string()));
    }

    #[test]
    fn test_build_frame_args_png_has_no_quality() {
        let toolkit = FfmpegToolkit::new(MediaConfig {
            frame_format: "png".to_string(),
            ..Default::default()
        });
        let args = toolkit.build_frame_args(Path::new("/in/a.mp4"), 12.5, Path::new("/out/scene_001.png"));
        assert!(args.contains(&"12.500".to_string()));
        assert!(!args.contains(&"-q:v".to_string()));
    }

    #[tokio::test]
    async fn test_validate_missing_file() {
        let toolkit = FfmpegToolkit::with_defaults();
        let err = toolkit
            .validate(Path::new("/definitely/not/here.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn test_validate_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("slides.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let err = FfmpegToolkit::with_defaults().validate(&path).await.unwrap_err();
        match err {
            ValidationError::UnsupportedFormat { format, .. } => assert_eq!(format, "gif"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_validate_too_large() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("talk.mp4");
        std::fs::write(&path, vec![0u8; 2 * 1024 * 1024]).unwrap();

        let toolkit = FfmpegToolkit::new(MediaConfig {
            max_video_size_mb: 1.0,
            ..Default::default()
        });
        let err = toolkit.validate(&path).await.unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_silent_video_has_no_audio_track() {
        let video = MediaMetadata {
            file_path: PathBuf::from("/in/silent.mp4"),
            duration: 10.0,
            width: 640,
            height: 360,
            fps: 25.0,
            format: "mp4".to_string(),
            size_mb: 1.0,
            codec: "h264".to_string(),
            has_audio: false,
        };

        let err = FfmpegToolkit::with_defaults()
            .extract_audio(&video, None, &StageProgress::detached())
            .await
            .unwrap_err();
        assert!(err.is_no_audio_track());
    }
}
