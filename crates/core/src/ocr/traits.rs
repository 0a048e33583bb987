//! Text detector trait.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::types::OcrResult;

/// Recognizes text in images.
///
/// Implementations do not fail on engine faults: an image that cannot be
/// processed yields an empty [`OcrResult`] with its `error` set.
#[async_trait]
pub trait TextDetector: Send + Sync {
    fn name(&self) -> &str;

    async fn detect_text(&self, image: &Path) -> OcrResult;

    /// Processes each image independently, in order.
    async fn detect_text_batch(&self, images: &[PathBuf]) -> Vec<OcrResult> {
        let mut results = Vec::with_capacity(images.len());
        for image in images {
            results.push(self.detect_text(image).await);
        }
        results
    }
}
