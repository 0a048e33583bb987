//! Configuration for text detection.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for [`TesseractDetector`](super::TesseractDetector).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// When false every image yields an empty result with engine "none".
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Path to the tesseract binary.
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: PathBuf,

    /// Tesseract language codes (e.g. "eng", "deu").
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Minimum region confidence (0-100) to keep.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Minimum region text length in characters.
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,

    /// Tesseract page segmentation mode.
    #[serde(default = "default_psm")]
    pub page_segmentation_mode: u8,

    /// Timeout per image in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_tesseract_path() -> PathBuf {
    PathBuf::from("tesseract")
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

fn default_confidence_threshold() -> f64 {
    60.0
}

fn default_min_text_length() -> usize {
    2
}

fn default_psm() -> u8 {
    6
}

fn default_timeout() -> u64 {
    60
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            tesseract_path: default_tesseract_path(),
            languages: default_languages(),
            confidence_threshold: default_confidence_threshold(),
            min_text_length: default_min_text_length(),
            page_segmentation_mode: default_psm(),
            timeout_secs: default_timeout(),
        }
    }
}
