//! Text detection on extracted frames.

mod config;
mod tesseract;
mod traits;
mod types;

pub use config::OcrConfig;
pub use tesseract::{analyze_regions, filter_regions, parse_tsv, summarize, TesseractDetector};
pub use traits::TextDetector;
pub use types::{BoundingBox, OcrResult, TextRegion};
