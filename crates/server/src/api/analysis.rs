//! Video analysis API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use deepbrief_core::analysis::{AnalysisProjection, BatchProjection, BatchRequest};

use crate::state::AppState;

/// Maximum number of videos in one batch request
const MAX_BATCH_SIZE: usize = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for analyzing one video.
///
/// Omitted flags and output directory fall back to the `[analysis]` config.
#[derive(Debug, Deserialize)]
pub struct AnalyzeBody {
    pub video_path: PathBuf,
    pub extract_audio: Option<bool>,
    pub detect_scenes: Option<bool>,
    pub extract_frames: Option<bool>,
    pub output_dir: Option<PathBuf>,
}

/// Request body for analyzing several videos.
#[derive(Debug, Deserialize)]
pub struct AnalyzeBatchBody {
    pub video_paths: Vec<PathBuf>,
    pub extract_audio: Option<bool>,
    pub detect_scenes: Option<bool>,
    pub extract_frames: Option<bool>,
    pub output_dir: Option<PathBuf>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct AnalysisErrorResponse {
    pub error: String,
}

fn bad_request(error: impl Into<String>) -> (StatusCode, Json<AnalysisErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(AnalysisErrorResponse {
            error: error.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Analyze one video.
///
/// Analysis failures are part of the returned result (`success = false`),
/// so any well-formed request gets a 200.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<AnalysisProjection>, (StatusCode, Json<AnalysisErrorResponse>)> {
    if body.video_path.as_os_str().is_empty() {
        return Err(bad_request("video_path cannot be empty"));
    }

    let coordinator = state.coordinator();
    let mut request = coordinator.request(body.video_path);
    if let Some(enabled) = body.extract_audio {
        request.extract_audio = enabled;
    }
    if let Some(enabled) = body.detect_scenes {
        request.detect_scenes = enabled;
    }
    if let Some(enabled) = body.extract_frames {
        request.extract_frames = enabled;
    }
    if body.output_dir.is_some() {
        request.output_dir = body.output_dir;
    }

    info!(path = %request.video_path.display(), "Analysis requested");
    let result = coordinator.analyze_video(&request).await;
    Ok(Json(result.to_projection()))
}

/// Analyze several videos one after another.
pub async fn analyze_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeBatchBody>,
) -> Result<Json<BatchProjection>, (StatusCode, Json<AnalysisErrorResponse>)> {
    if body.video_paths.is_empty() {
        return Err(bad_request("video_paths cannot be empty"));
    }
    if body.video_paths.len() > MAX_BATCH_SIZE {
        return Err(bad_request(format!(
            "Too many videos: {} (max {})",
            body.video_paths.len(),
            MAX_BATCH_SIZE
        )));
    }
    if body.video_paths.iter().any(|p| p.as_os_str().is_empty()) {
        return Err(bad_request("video_paths cannot contain empty paths"));
    }

    let defaults = &state.config().analysis;
    let request = BatchRequest {
        video_paths: body.video_paths,
        extract_audio: body.extract_audio.unwrap_or(defaults.extract_audio),
        detect_scenes: body.detect_scenes.unwrap_or(defaults.detect_scenes),
        extract_frames: body.extract_frames.unwrap_or(defaults.extract_frames),
        output_dir: body.output_dir.or_else(|| defaults.output_dir.clone()),
    };

    info!(videos = request.video_paths.len(), "Batch analysis requested");
    let batch = state.coordinator().analyze_batch(&request).await;
    Ok(Json(batch.to_projection()))
}
