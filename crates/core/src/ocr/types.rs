//! Types for the OCR module.

use serde::{Deserialize, Serialize};

/// Pixel rectangle of a text region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Y coordinate of the bottom edge.
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }
}

/// One piece of recognized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRegion {
    pub text: String,
    /// Engine confidence, 0-100.
    pub confidence: f64,
    pub bbox: BoundingBox,
    pub language: Option<String>,
    /// Height relative to the average region height of the image.
    pub font_size_estimate: Option<f64>,
    #[serde(default)]
    pub is_title: bool,
    #[serde(default)]
    pub is_slide_number: bool,
}

impl TextRegion {
    pub fn new(text: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            confidence,
            bbox,
            language: None,
            font_size_estimate: None,
            is_title: false,
            is_slide_number: false,
        }
    }
}

/// Text found in one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    pub text_regions: Vec<TextRegion>,
    /// All region texts joined by spaces.
    pub full_text: String,
    /// Seconds spent on this image.
    pub processing_time: f64,
    pub engine_used: String,
    pub languages_detected: Vec<String>,
    pub total_text_regions: usize,
    /// Regions at or above the confidence threshold.
    pub high_confidence_regions: usize,
    pub average_confidence: f64,
    /// Set when the engine could not process the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OcrResult {
    /// A result without any text.
    pub fn empty(engine: impl Into<String>) -> Self {
        Self {
            text_regions: Vec::new(),
            full_text: String::new(),
            processing_time: 0.0,
            engine_used: engine.into(),
            languages_detected: Vec::new(),
            total_text_regions: 0,
            high_confidence_regions: 0,
            average_confidence: 0.0,
            error: None,
        }
    }

    /// An empty result carrying the reason the engine failed.
    pub fn failed(engine: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::empty(engine)
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text_regions.is_empty()
    }

    /// Regions flagged as slide titles.
    pub fn titles(&self) -> impl Iterator<Item = &TextRegion> {
        self.text_regions.iter().filter(|r| r.is_title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_is_empty() {
        let result = OcrResult::failed("tesseract", "image not found");
        assert!(!result.has_text());
        assert_eq!(result.error.as_deref(), Some("image not found"));
        assert_eq!(result.total_text_regions, 0);
    }

    #[test]
    fn test_error_omitted_when_absent() {
        let json = serde_json::to_value(OcrResult::empty("none")).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["engine_used"], "none");
    }
}
