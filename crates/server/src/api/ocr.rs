//! OCR API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use deepbrief_core::ocr::OcrResult;

use crate::state::AppState;

/// Maximum number of images in one request
const MAX_IMAGES: usize = 500;

#[derive(Debug, Deserialize)]
pub struct OcrBody {
    pub image_paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct OcrResponse {
    pub engine: String,
    /// One result per requested image, in request order.
    pub results: Vec<OcrResult>,
    pub images_with_text: usize,
}

#[derive(Debug, Serialize)]
pub struct OcrErrorResponse {
    pub error: String,
}

/// Detect text in a list of images.
///
/// Unreadable images yield empty results with `error` set.
pub async fn detect_text(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OcrBody>,
) -> Result<Json<OcrResponse>, (StatusCode, Json<OcrErrorResponse>)> {
    if body.image_paths.is_empty() || body.image_paths.len() > MAX_IMAGES {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(OcrErrorResponse {
                error: format!("image_paths must contain 1 to {} paths", MAX_IMAGES),
            }),
        ));
    }

    let detector = state.text_detector();
    let results = detector.detect_text_batch(&body.image_paths).await;
    let images_with_text = results.iter().filter(|r| r.has_text()).count();

    Ok(Json(OcrResponse {
        engine: detector.name().to_string(),
        results,
        images_with_text,
    }))
}
