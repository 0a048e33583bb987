pub mod analysis;
pub mod config;
pub mod media;
pub mod metrics;
pub mod ocr;
pub mod progress;
pub mod testing;

pub use analysis::{
    AnalysisConfig, AnalysisError, AnalysisRequest, AnalysisResult, BatchRequest, BatchResult,
    ErrorKind, PipelineCoordinator, StageId,
};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use media::{FfmpegToolkit, MediaConfig};
pub use ocr::{OcrConfig, OcrResult, TesseractDetector, TextDetector};
pub use progress::{ProgressEvent, ProgressSink, ProgressTracker};
