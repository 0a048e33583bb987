//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Single-video analysis runs and their stages
//! - Batch runs
//! - OCR

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Analysis Metrics
// =============================================================================

/// Analysis runs total by result.
pub static ANALYSIS_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("deepbrief_analysis_runs_total", "Total video analysis runs"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Analysis duration in seconds.
pub static ANALYSIS_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "deepbrief_analysis_duration_seconds",
            "Duration of a full video analysis",
        )
        .buckets(vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["result"],
    )
    .unwrap()
});

/// Stage outcomes by stage and outcome tag.
pub static STAGE_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("deepbrief_stage_outcomes_total", "Total stage outcomes"),
        &["stage", "outcome"], // outcome: "success", "skipped", "soft_failure", "fatal"
    )
    .unwrap()
});

/// Stage duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("deepbrief_stage_duration_seconds", "Duration of analysis stages")
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Batch Metrics
// =============================================================================

/// Batch runs total by result.
pub static BATCH_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("deepbrief_batch_runs_total", "Total batch analysis runs"),
        &["result"], // "completed", "interrupted"
    )
    .unwrap()
});

/// Videos processed by batch runs.
pub static BATCH_VIDEOS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "deepbrief_batch_videos_total",
        "Total videos processed by batch runs",
    )
    .unwrap()
});

// =============================================================================
// OCR Metrics
// =============================================================================

/// Images processed by OCR, by result.
pub static OCR_IMAGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("deepbrief_ocr_images_total", "Total images processed by OCR"),
        &["result"], // "text", "empty", "error"
    )
    .unwrap()
});

/// OCR processing time per image in seconds.
pub static OCR_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("deepbrief_ocr_duration_seconds", "OCR processing time per image")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Analysis
        Box::new(ANALYSIS_RUNS.clone()),
        Box::new(ANALYSIS_DURATION.clone()),
        Box::new(STAGE_OUTCOMES.clone()),
        Box::new(STAGE_DURATION.clone()),
        // Batch
        Box::new(BATCH_RUNS.clone()),
        Box::new(BATCH_VIDEOS.clone()),
        // OCR
        Box::new(OCR_IMAGES.clone()),
        Box::new(OCR_DURATION.clone()),
    ]
}
