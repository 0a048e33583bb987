//! Mock text detector for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ocr::{OcrResult, TextDetector};

/// Mock implementation of the TextDetector trait.
///
/// Images without a configured result yield an empty result from engine
/// "mock"; images marked with [`set_failure`](Self::set_failure) yield a
/// failed result, like the real detector does on engine faults.
#[derive(Debug)]
pub struct MockTextDetector {
    calls: Arc<RwLock<Vec<PathBuf>>>,
    results: Arc<RwLock<HashMap<PathBuf, OcrResult>>>,
    failures: Arc<RwLock<HashMap<PathBuf, String>>>,
}

impl Default for MockTextDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTextDetector {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            results: Arc::new(RwLock::new(HashMap::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn recorded_calls(&self) -> Vec<PathBuf> {
        self.calls.read().await.clone()
    }

    pub async fn set_result(&self, image: impl AsRef<Path>, result: OcrResult) {
        self.results
            .write()
            .await
            .insert(image.as_ref().to_path_buf(), result);
    }

    pub async fn set_failure(&self, image: impl AsRef<Path>, reason: impl Into<String>) {
        self.failures
            .write()
            .await
            .insert(image.as_ref().to_path_buf(), reason.into());
    }
}

#[async_trait]
impl TextDetector for MockTextDetector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn detect_text(&self, image: &Path) -> OcrResult {
        self.calls.write().await.push(image.to_path_buf());

        if let Some(reason) = self.failures.read().await.get(image) {
            return OcrResult::failed("mock", reason.clone());
        }
        match self.results.read().await.get(image) {
            Some(result) => result.clone(),
            None => OcrResult::empty("mock"),
        }
    }
}
