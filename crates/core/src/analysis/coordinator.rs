//! Pipeline coordinator.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::future::Future;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::config::AnalysisConfig;
use super::error::{AnalysisError, ErrorKind};
use super::outcome::{StageId, StageOutcome};
use super::result::{AnalysisAccumulator, AnalysisResult, BatchResult};
use crate::media::{
    AudioExtractor, AudioMetadata, FfmpegToolkit, FrameExtractor, FrameMetadata, MediaMetadata,
    SceneDetectionResult, SceneDetector, SceneRequest, Validator,
};
use crate::metrics;
use crate::progress::{CompositeProgress, ProgressTracker, StageDescriptor, StageProgress};

fn default_true() -> bool {
    true
}

/// What to do with one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub video_path: PathBuf,
    #[serde(default = "default_true")]
    pub extract_audio: bool,
    #[serde(default = "default_true")]
    pub detect_scenes: bool,
    /// Ignored unless `detect_scenes` is set.
    #[serde(default = "default_true")]
    pub extract_frames: bool,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl AnalysisRequest {
    /// A request running every stage, without an output directory.
    pub fn new(video_path: impl Into<PathBuf>) -> Self {
        Self {
            video_path: video_path.into(),
            extract_audio: true,
            detect_scenes: true,
            extract_frames: true,
            output_dir: None,
        }
    }

    pub fn with_audio(mut self, enabled: bool) -> Self {
        self.extract_audio = enabled;
        self
    }

    pub fn with_scenes(mut self, enabled: bool) -> Self {
        self.detect_scenes = enabled;
        self
    }

    pub fn with_frames(mut self, enabled: bool) -> Self {
        self.extract_frames = enabled;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

/// What to do with a list of videos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub video_paths: Vec<PathBuf>,
    #[serde(default = "default_true")]
    pub extract_audio: bool,
    #[serde(default = "default_true")]
    pub detect_scenes: bool,
    #[serde(default = "default_true")]
    pub extract_frames: bool,
    /// Each video writes to `<output_dir>/<file stem>`.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl BatchRequest {
    pub fn new(video_paths: Vec<PathBuf>) -> Self {
        Self {
            video_paths,
            extract_audio: true,
            detect_scenes: true,
            extract_frames: true,
            output_dir: None,
        }
    }

    /// The single-video request for one entry of the batch.
    pub fn request_for(&self, video_path: &Path) -> AnalysisRequest {
        AnalysisRequest {
            video_path: video_path.to_path_buf(),
            extract_audio: self.extract_audio,
            detect_scenes: self.detect_scenes,
            extract_frames: self.extract_frames,
            output_dir: self
                .output_dir
                .as_ref()
                .map(|dir| dir.join(file_stem(video_path))),
        }
    }
}

fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Awaits a collaborator call, turning a panic into an `UNEXPECTED_ERROR`.
async fn guarded<F, T>(stage: StageId, path: &Path, call: F) -> Result<T, AnalysisError>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(call).catch_unwind().await.map_err(|panic| {
        let message = panic_message(panic.as_ref());
        error!(stage = %stage, path = %path.display(), "Collaborator panicked: {}", message);
        AnalysisError::unexpected(stage, format!("{} stage panicked: {}", stage, message), path)
    })
}

async fn prepare_dir(
    stage: StageId,
    kind: ErrorKind,
    dir: &Path,
    video_path: &Path,
) -> Result<(), AnalysisError> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        AnalysisError::new(
            kind,
            stage,
            format!("Failed to create output directory {}: {}", dir.display(), e),
        )
        .with_file(video_path)
        .with_details(json!({ "output_dir": dir }))
    })
}

/// Composite progress of one run. Inert when the coordinator has no tracker.
struct RunProgress {
    workflow: Option<CompositeProgress>,
}

impl RunProgress {
    fn start(
        tracker: Option<&Arc<ProgressTracker>>,
        run_id: &str,
        name: &str,
        stages: Vec<StageDescriptor>,
    ) -> Self {
        let workflow = tracker.and_then(|tracker| {
            tracker
                .start_workflow(run_id, name, stages)
                .map_err(|e| warn!(run_id = %run_id, "Progress tracking disabled: {}", e))
                .ok()
        });
        Self { workflow }
    }

    fn start_stage(&self) -> StageProgress {
        let Some(workflow) = &self.workflow else {
            return StageProgress::detached();
        };
        match workflow.start_next_operation() {
            Ok(callback) => StageProgress::new(callback),
            Err(e) => {
                warn!(workflow_id = %workflow.workflow_id(), "Cannot start stage: {}", e);
                StageProgress::detached()
            }
        }
    }

    fn complete_stage(&self) {
        if let Some(workflow) = &self.workflow {
            if let Err(e) = workflow.complete_current_operation() {
                warn!(workflow_id = %workflow.workflow_id(), "Cannot complete stage: {}", e);
            }
        }
    }

    fn fail(&self, reason: &str) {
        if let Some(workflow) = &self.workflow {
            workflow.fail_workflow(reason);
        }
    }

    fn finish(&self, details: Value) {
        if let Some(workflow) = &self.workflow {
            workflow.finish("Analysis complete", details);
        }
    }
}

/// Runs the analysis stages of a video in order and aggregates the result.
///
/// Collaborators are injected once and shared by every run. Each call of
/// [`analyze_video`](Self::analyze_video) returns an [`AnalysisResult`];
/// stage failures are recorded in it rather than returned as errors.
pub struct PipelineCoordinator {
    config: AnalysisConfig,
    validator: Arc<dyn Validator>,
    audio_extractor: Arc<dyn AudioExtractor>,
    scene_detector: Arc<dyn SceneDetector>,
    frame_extractor: Arc<dyn FrameExtractor>,
    tracker: Option<Arc<ProgressTracker>>,
}

impl PipelineCoordinator {
    pub fn new(
        config: AnalysisConfig,
        validator: Arc<dyn Validator>,
        audio_extractor: Arc<dyn AudioExtractor>,
        scene_detector: Arc<dyn SceneDetector>,
        frame_extractor: Arc<dyn FrameExtractor>,
    ) -> Self {
        info!(
            validator = validator.name(),
            audio = audio_extractor.name(),
            scenes = scene_detector.name(),
            frames = frame_extractor.name(),
            "PipelineCoordinator initialized"
        );
        Self {
            config,
            validator,
            audio_extractor,
            scene_detector,
            frame_extractor,
            tracker: None,
        }
    }

    /// Uses one [`FfmpegToolkit`] for every collaborator.
    pub fn with_toolkit(config: AnalysisConfig, toolkit: FfmpegToolkit) -> Self {
        let toolkit = Arc::new(toolkit);
        Self::new(
            config,
            toolkit.clone(),
            toolkit.clone(),
            toolkit.clone(),
            toolkit,
        )
    }

    /// Reports run and batch progress to `tracker`.
    pub fn with_progress_tracker(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn progress_tracker(&self) -> Option<&Arc<ProgressTracker>> {
        self.tracker.as_ref()
    }

    /// A request for `video_path` using the configured stage defaults.
    pub fn request(&self, video_path: impl Into<PathBuf>) -> AnalysisRequest {
        AnalysisRequest {
            video_path: video_path.into(),
            extract_audio: self.config.extract_audio,
            detect_scenes: self.config.detect_scenes,
            extract_frames: self.config.extract_frames,
            output_dir: self.config.output_dir.clone(),
        }
    }

    /// Stages a request runs, in execution order.
    pub fn plan_stages(&self, request: &AnalysisRequest) -> Vec<StageId> {
        let mut stages = vec![StageId::Validate];
        if request.extract_audio {
            stages.push(StageId::Audio);
        }
        if request.detect_scenes {
            stages.push(StageId::Scenes);
            if request.extract_frames {
                stages.push(StageId::Frames);
            }
        }
        stages
    }

    /// Analyzes one video. Never fails; problems are recorded in the result.
    pub async fn analyze_video(&self, request: &AnalysisRequest) -> AnalysisResult {
        let run_id = format!("video_analysis_{}", short_id());
        let path = request.video_path.as_path();
        let stages = self.plan_stages(request);
        let descriptors = stages
            .iter()
            .map(|s| StageDescriptor::new(s.as_str(), s.label(), self.config.weights.weight(*s)))
            .collect();

        let progress = RunProgress::start(
            self.tracker.as_ref(),
            &run_id,
            &format!("Analyzing {}", display_name(path)),
            descriptors,
        );

        info!(run_id = %run_id, path = %path.display(), stages = ?stages, "Starting video analysis");

        let mut acc = AnalysisAccumulator::new(&run_id, path);
        match self.run_stages(request, &stages, &progress, &mut acc).await {
            ControlFlow::Continue(()) => {
                let details = json!({
                    "total_scenes": acc.scene_result().map(|s| s.total_scenes).unwrap_or(0),
                    "total_frames": acc.frame_count(),
                    "has_audio": acc.audio_info().is_some(),
                    "video_duration": acc.video_info().map(|v| v.duration).unwrap_or(0.0),
                });
                progress.finish(details);
            }
            ControlFlow::Break(reason) => progress.fail(&reason),
        }

        let result = acc.freeze();
        let label = if result.success() { "success" } else { "failed" };
        metrics::ANALYSIS_RUNS.with_label_values(&[label]).inc();
        metrics::ANALYSIS_DURATION
            .with_label_values(&[label])
            .observe(result.processing_time());

        if result.success() {
            info!(
                run_id = %run_id,
                elapsed = result.processing_time(),
                "Video analysis complete: {}",
                display_name(path)
            );
        } else {
            warn!(
                run_id = %run_id,
                errors = result.errors().len(),
                "Video analysis finished with errors: {}",
                result.error_message().unwrap_or_default()
            );
        }
        result
    }

    /// Analyzes videos one after another. A failing video never stops the batch.
    pub async fn analyze_batch(&self, request: &BatchRequest) -> BatchResult {
        let batch_id = format!("batch_analysis_{}", short_id());
        let total = request.video_paths.len();

        if let Some(tracker) = &self.tracker {
            tracker.start_operation(
                &batch_id,
                &format!("Analyzing {} videos", total),
                total,
                json!({ "video_count": total }),
            );
        }
        info!(batch_id = %batch_id, videos = total, "Starting batch analysis");

        let mut results: Vec<AnalysisResult> = Vec::with_capacity(total);
        let outcome = AssertUnwindSafe(async {
            for (i, path) in request.video_paths.iter().enumerate() {
                info!(batch_id = %batch_id, "Processing video {}/{}: {}", i + 1, total, path.display());
                if let Some(tracker) = &self.tracker {
                    tracker.update_progress(
                        &batch_id,
                        i as f64 / total as f64,
                        Some(&format!("Processing {}", display_name(path))),
                        Some(i + 1),
                    );
                }

                let result = self.analyze_video(&request.request_for(path)).await;
                if !result.success() {
                    error!(
                        batch_id = %batch_id,
                        "Failed to analyze {}: {}",
                        path.display(),
                        result.error_message().unwrap_or_default()
                    );
                }
                results.push(result);
            }
        })
        .catch_unwind()
        .await;

        let successful = results.iter().filter(|r| r.success()).count();
        let interrupted = match outcome {
            Ok(()) => {
                if let Some(tracker) = &self.tracker {
                    tracker.complete_operation(
                        &batch_id,
                        json!({
                            "total_videos": total,
                            "successful": successful,
                            "failed": total - successful,
                        }),
                    );
                }
                metrics::BATCH_RUNS.with_label_values(&["completed"]).inc();
                info!(
                    batch_id = %batch_id,
                    successful,
                    failed = total - successful,
                    "Batch analysis complete: {} videos processed",
                    results.len()
                );
                None
            }
            Err(panic) => {
                let reason = format!("Batch analysis failed: {}", panic_message(panic.as_ref()));
                error!(batch_id = %batch_id, processed = results.len(), "{}", reason);
                if let Some(tracker) = &self.tracker {
                    tracker.fail_operation(&batch_id, &reason);
                }
                metrics::BATCH_RUNS.with_label_values(&["interrupted"]).inc();
                Some(reason)
            }
        };

        metrics::BATCH_VIDEOS.inc_by(results.len() as u64);
        BatchResult::new(batch_id, results, interrupted)
    }

    async fn run_stages(
        &self,
        request: &AnalysisRequest,
        stages: &[StageId],
        progress: &RunProgress,
        acc: &mut AnalysisAccumulator,
    ) -> ControlFlow<String> {
        let path = request.video_path.as_path();

        let started = Instant::now();
        let stage_progress = progress.start_stage();
        let outcome = self.validate(path, &stage_progress).await;
        let Some(video) =
            self.settle(StageId::Validate, outcome, started, progress, &stage_progress, acc)?
        else {
            return ControlFlow::Break("Validation produced no metadata".to_string());
        };
        info!(
            "Video validated: {:.1}s, {}x{}",
            video.duration, video.width, video.height
        );
        acc.set_video_info(video.clone());

        if stages.contains(&StageId::Audio) {
            let started = Instant::now();
            let stage_progress = progress.start_stage();
            let outcome = self.extract_audio(request, &video, &stage_progress).await;
            if let Some(audio) =
                self.settle(StageId::Audio, outcome, started, progress, &stage_progress, acc)?
            {
                info!(
                    "Audio extracted: {:.1}s, {}Hz",
                    audio.duration, audio.sample_rate
                );
                acc.set_audio_info(audio);
            }
        }

        let mut requests: Vec<SceneRequest> = Vec::new();
        if stages.contains(&StageId::Scenes) {
            let started = Instant::now();
            let stage_progress = progress.start_stage();
            let outcome = self.detect_scenes(path, &video, &stage_progress).await;
            if let Some(scenes) =
                self.settle(StageId::Scenes, outcome, started, progress, &stage_progress, acc)?
            {
                info!(
                    "Scenes detected: {} scenes using {}",
                    scenes.total_scenes, scenes.detection_method
                );
                requests = scenes.frame_requests();
                acc.set_scene_result(scenes);
            }
        }

        if stages.contains(&StageId::Frames) {
            if requests.is_empty() {
                debug!(path = %path.display(), "No scenes available, skipping frame extraction");
            } else {
                let started = Instant::now();
                let stage_progress = progress.start_stage();
                let outcome = self
                    .extract_frames(request, &video, &requests, &stage_progress)
                    .await;
                if let Some(frames) =
                    self.settle(StageId::Frames, outcome, started, progress, &stage_progress, acc)?
                {
                    info!(
                        "Frames extracted: {} frames from {} scenes",
                        frames.len(),
                        requests.len()
                    );
                    acc.set_frame_infos(frames);
                }
            }
        }

        ControlFlow::Continue(())
    }

    /// Applies a stage outcome to the accumulator and the workflow.
    ///
    /// Breaks with the user-facing reason on a fatal outcome.
    fn settle<T>(
        &self,
        stage: StageId,
        outcome: StageOutcome<T>,
        started: Instant,
        progress: &RunProgress,
        stage_progress: &StageProgress,
        acc: &mut AnalysisAccumulator,
    ) -> ControlFlow<String, Option<T>> {
        metrics::STAGE_OUTCOMES
            .with_label_values(&[stage.as_str(), outcome.tag()])
            .inc();
        metrics::STAGE_DURATION
            .with_label_values(&[stage.as_str()])
            .observe(started.elapsed().as_secs_f64());

        let payload = match outcome {
            StageOutcome::Success(payload) => Some(payload),
            StageOutcome::SkippedBenign(reason) => {
                warn!(stage = %stage, "Stage skipped: {}", reason);
                None
            }
            StageOutcome::SoftFailure(error) => {
                error!(stage = %stage, kind = error.kind.as_str(), "Stage failed, continuing: {}", error);
                acc.record_error(error);
                None
            }
            StageOutcome::Fatal(error) => {
                error!(stage = %stage, kind = error.kind.as_str(), "Stage failed, aborting: {}", error);
                let reason = error.user_message();
                acc.record_error(error);
                return ControlFlow::Break(reason);
            }
        };

        stage_progress.report(1.0);
        progress.complete_stage();
        ControlFlow::Continue(payload)
    }

    async fn validate(&self, path: &Path, progress: &StageProgress) -> StageOutcome<MediaMetadata> {
        progress.report(0.5);
        match guarded(StageId::Validate, path, self.validator.validate(path)).await {
            Ok(Ok(video)) => StageOutcome::Success(video),
            Ok(Err(e)) => StageOutcome::Fatal(AnalysisError::from_validation(&e, path)),
            Err(unexpected) => StageOutcome::Fatal(unexpected),
        }
    }

    async fn extract_audio(
        &self,
        request: &AnalysisRequest,
        video: &MediaMetadata,
        progress: &StageProgress,
    ) -> StageOutcome<AudioMetadata> {
        let path = request.video_path.as_path();
        let destination = match &request.output_dir {
            Some(dir) => {
                if let Err(e) =
                    prepare_dir(StageId::Audio, ErrorKind::AudioExtractionFailed, dir, path).await
                {
                    return self.config.policies.policy(StageId::Audio).classify(e);
                }
                Some(dir.join(format!("{}_audio.wav", file_stem(path))))
            }
            None => None,
        };

        let call = self
            .audio_extractor
            .extract_audio(video, destination.as_deref(), progress);
        match guarded(StageId::Audio, path, call).await {
            Ok(Ok(audio)) => StageOutcome::Success(audio),
            Ok(Err(e)) if e.is_no_audio_track() => StageOutcome::SkippedBenign(e.to_string()),
            Ok(Err(e)) => self
                .config
                .policies
                .policy(StageId::Audio)
                .classify(AnalysisError::from_audio(&e, path)),
            Err(unexpected) => StageOutcome::Fatal(unexpected),
        }
    }

    async fn detect_scenes(
        &self,
        path: &Path,
        video: &MediaMetadata,
        progress: &StageProgress,
    ) -> StageOutcome<SceneDetectionResult> {
        let call = self.scene_detector.detect_scenes(video, progress);
        match guarded(StageId::Scenes, path, call).await {
            Ok(Ok(scenes)) => StageOutcome::Success(scenes),
            Ok(Err(e)) => self
                .config
                .policies
                .policy(StageId::Scenes)
                .classify(AnalysisError::from_scenes(&e, path)),
            Err(unexpected) => StageOutcome::Fatal(unexpected),
        }
    }

    async fn extract_frames(
        &self,
        request: &AnalysisRequest,
        video: &MediaMetadata,
        scenes: &[SceneRequest],
        progress: &StageProgress,
    ) -> StageOutcome<Vec<FrameMetadata>> {
        let path = request.video_path.as_path();
        let destination = match &request.output_dir {
            Some(dir) => {
                let frames_dir = dir.join("frames");
                if let Err(e) = prepare_dir(
                    StageId::Frames,
                    ErrorKind::FrameExtractionFailed,
                    &frames_dir,
                    path,
                )
                .await
                {
                    return self.config.policies.policy(StageId::Frames).classify(e);
                }
                Some(frames_dir)
            }
            None => None,
        };

        let call =
            self.frame_extractor
                .extract_frames(video, scenes, destination.as_deref(), progress);
        match guarded(StageId::Frames, path, call).await {
            Ok(Ok(frames)) => StageOutcome::Success(frames),
            Ok(Err(e)) => self
                .config
                .policies
                .policy(StageId::Frames)
                .classify(AnalysisError::from_frames(&e, path)),
            Err(unexpected) => StageOutcome::Fatal(unexpected),
        }
    }
}
