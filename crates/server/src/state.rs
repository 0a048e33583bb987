use std::sync::Arc;

use deepbrief_core::{
    analysis::PipelineCoordinator,
    media::FfmpegToolkit,
    ocr::{TesseractDetector, TextDetector},
    progress::{ProgressTracker, TracingSink},
    Config,
};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    coordinator: PipelineCoordinator,
    text_detector: Arc<dyn TextDetector>,
    tracker: Arc<ProgressTracker>,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    /// `coordinator` is expected to report to `tracker`.
    pub fn new(
        config: Config,
        coordinator: PipelineCoordinator,
        text_detector: Arc<dyn TextDetector>,
        tracker: Arc<ProgressTracker>,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            coordinator,
            text_detector,
            tracker,
            ws_broadcaster,
        }
    }

    /// Wires the ffmpeg and tesseract backed collaborators from `config`.
    ///
    /// Progress events go to the log and to every WebSocket client.
    pub fn from_config(config: Config, ws_broadcaster: WsBroadcaster) -> Self {
        let tracker = Arc::new(
            ProgressTracker::new()
                .with_sink(Arc::new(TracingSink))
                .with_sink(Arc::new(ws_broadcaster.clone())),
        );
        let coordinator = PipelineCoordinator::with_toolkit(
            config.analysis.clone(),
            FfmpegToolkit::new(config.media.clone()),
        )
        .with_progress_tracker(Arc::clone(&tracker));
        let text_detector = Arc::new(TesseractDetector::new(config.ocr.clone()));

        Self::new(config, coordinator, text_detector, tracker, ws_broadcaster)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn coordinator(&self) -> &PipelineCoordinator {
        &self.coordinator
    }

    pub fn text_detector(&self) -> &dyn TextDetector {
        self.text_detector.as_ref()
    }

    pub fn tracker(&self) -> &ProgressTracker {
        self.tracker.as_ref()
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}
