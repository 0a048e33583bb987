//! Tesseract CLI text detector.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

use super::config::OcrConfig;
use super::traits::TextDetector;
use super::types::{BoundingBox, OcrResult, TextRegion};
use crate::media::process::run_command;
use crate::metrics;

const ENGINE: &str = "tesseract";

/// Text detector backed by the `tesseract` command line tool in TSV mode.
#[derive(Debug, Clone)]
pub struct TesseractDetector {
    config: OcrConfig,
}

impl TesseractDetector {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(OcrConfig::default())
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    fn build_args(&self, image: &Path) -> Vec<String> {
        let languages = if self.config.languages.is_empty() {
            "eng".to_string()
        } else {
            self.config.languages.join("+")
        };
        vec![
            image.to_string_lossy().to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            languages,
            "--oem".to_string(),
            "3".to_string(),
            "--psm".to_string(),
            self.config.page_segmentation_mode.to_string(),
            "tsv".to_string(),
        ]
    }

    async fn run(&self, image: &Path) -> Result<Vec<TextRegion>, String> {
        if tokio::fs::metadata(image).await.is_err() {
            return Err(format!("Image file not found: {}", image.display()));
        }

        let output = run_command(
            ENGINE,
            &self.config.tesseract_path,
            &self.build_args(image),
            self.config.timeout_secs,
        )
        .await
        .map_err(|e| match e.stderr() {
            Some(stderr) => format!("{}: {}", e, stderr),
            None => e.to_string(),
        })?;

        let language = self.config.languages.first().cloned();
        Ok(parse_tsv(&output.stdout)
            .into_iter()
            .map(|mut region| {
                region.language = language.clone();
                region
            })
            .collect())
    }
}

/// Parses tesseract TSV output into word regions.
///
/// Rows without text or with a negative confidence (layout rows) are skipped.
pub fn parse_tsv(tsv: &str) -> Vec<TextRegion> {
    tsv.lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 12 {
                return None;
            }
            let confidence = cols[10].trim().parse::<f64>().ok()?;
            let text = cols[11].trim();
            if confidence < 0.0 || text.is_empty() {
                return None;
            }
            let bbox = BoundingBox::new(
                cols[6].trim().parse().ok()?,
                cols[7].trim().parse().ok()?,
                cols[8].trim().parse().ok()?,
                cols[9].trim().parse().ok()?,
            );
            Some(TextRegion::new(text, confidence, bbox))
        })
        .collect()
}

/// Drops regions below the confidence threshold, shorter than the minimum
/// length, or without printable characters.
pub fn filter_regions(
    regions: Vec<TextRegion>,
    confidence_threshold: f64,
    min_text_length: usize,
) -> Vec<TextRegion> {
    regions
        .into_iter()
        .filter(|r| r.confidence >= confidence_threshold)
        .filter(|r| r.text.chars().count() >= min_text_length)
        .filter(|r| !r.text.trim().is_empty() && r.text.chars().any(|c| !c.is_control()))
        .collect()
}

/// Annotates relative font size plus title and slide-number flags.
pub fn analyze_regions(mut regions: Vec<TextRegion>) -> Vec<TextRegion> {
    if regions.is_empty() {
        return regions;
    }

    let avg_height =
        regions.iter().map(|r| r.bbox.height as f64).sum::<f64>() / regions.len() as f64;
    let image_height = regions.iter().map(|r| r.bbox.bottom()).max().unwrap_or(0) as f64;

    for region in &mut regions {
        let height = region.bbox.height as f64;
        let top = region.bbox.y as f64;

        region.font_size_estimate = Some(if avg_height > 0.0 {
            height / avg_height
        } else {
            1.0
        });

        // Larger than average and near the top
        if height > avg_height * 1.5 && top < avg_height * 2.0 {
            region.is_title = true;
        }

        // Short, numeric, small and in the bottom fifth
        let text = region.text.trim();
        if text.chars().any(|c| c.is_ascii_digit())
            && text.chars().count() <= 10
            && height < avg_height * 0.8
            && top > image_height * 0.8
        {
            region.is_slide_number = true;
        }
    }

    regions
}

/// Builds the final result from analyzed regions.
pub fn summarize(
    regions: Vec<TextRegion>,
    engine: &str,
    confidence_threshold: f64,
    processing_time: f64,
) -> OcrResult {
    let total = regions.len();
    let high_confidence = regions
        .iter()
        .filter(|r| r.confidence >= confidence_threshold)
        .count();
    let average_confidence = if total > 0 {
        regions.iter().map(|r| r.confidence).sum::<f64>() / total as f64
    } else {
        0.0
    };
    let languages: BTreeSet<String> = regions.iter().filter_map(|r| r.language.clone()).collect();
    let full_text = regions
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();

    OcrResult {
        text_regions: regions,
        full_text,
        processing_time,
        engine_used: engine.to_string(),
        languages_detected: languages.into_iter().collect(),
        total_text_regions: total,
        high_confidence_regions: high_confidence,
        average_confidence,
        error: None,
    }
}

#[async_trait]
impl TextDetector for TesseractDetector {
    fn name(&self) -> &str {
        ENGINE
    }

    async fn detect_text(&self, image: &Path) -> OcrResult {
        if !self.config.enabled {
            return OcrResult::empty("none");
        }

        let started = Instant::now();
        let result = match self.run(image).await {
            Ok(regions) => {
                let regions = analyze_regions(filter_regions(
                    regions,
                    self.config.confidence_threshold,
                    self.config.min_text_length,
                ));
                summarize(
                    regions,
                    ENGINE,
                    self.config.confidence_threshold,
                    started.elapsed().as_secs_f64(),
                )
            }
            Err(reason) => {
                warn!(image = %image.display(), "OCR failed: {}", reason);
                metrics::OCR_IMAGES.with_label_values(&["error"]).inc();
                return OcrResult {
                    processing_time: started.elapsed().as_secs_f64(),
                    ..OcrResult::failed(ENGINE, reason)
                };
            }
        };

        metrics::OCR_DURATION.observe(result.processing_time);
        metrics::OCR_IMAGES
            .with_label_values(&[if result.has_text() { "text" } else { "empty" }])
            .inc();
        debug!(
            image = %image.display(),
            regions = result.total_text_regions,
            chars = result.full_text.len(),
            avg_confidence = result.average_confidence,
            "OCR completed"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t1280\t720\t-1\t
5\t1\t1\t1\t1\t1\t100\t20\t300\t80\t96.5\tQuarterly
5\t1\t1\t1\t1\t2\t420\t20\t260\t80\t95.1\tResults
5\t1\t2\t1\t1\t1\t100\t200\t120\t28\t88.0\tRevenue
5\t1\t2\t1\t1\t2\t230\t200\t80\t28\t41.2\tgrew
5\t1\t3\t1\t1\t1\t1200\t690\t20\t18\t91.0\t12
";

    #[test]
    fn test_parse_tsv_skips_layout_rows() {
        let regions = parse_tsv(TSV);
        assert_eq!(regions.len(), 5);
        assert_eq!(regions[0].text, "Quarterly");
        assert_eq!(regions[0].bbox, BoundingBox::new(100, 20, 300, 80));
        assert_eq!(regions[0].confidence, 96.5);
    }

    #[test]
    fn test_filter_regions() {
        let regions = filter_regions(parse_tsv(TSV), 60.0, 2);
        let texts: Vec<&str> = regions.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Quarterly", "Results", "Revenue", "12"]);

        let regions = filter_regions(parse_tsv(TSV), 60.0, 3);
        assert!(regions.iter().all(|r| r.text != "12"));
    }

    #[test]
    fn test_title_and_slide_number_heuristics() {
        let regions = analyze_regions(filter_regions(parse_tsv(TSV), 60.0, 2));

        // avg height = (80 + 80 + 28 + 18) / 4 = 51.5
        assert!(regions[0].is_title);
        assert!(regions[1].is_title);
        assert!(!regions[2].is_title);
        assert!(regions[3].is_slide_number);
        assert!(!regions[0].is_slide_number);

        let estimate = regions[0].font_size_estimate.unwrap();
        assert!((estimate - 80.0 / 51.5).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_stats() {
        let mut regions = filter_regions(parse_tsv(TSV), 0.0, 1);
        for r in &mut regions {
            r.language = Some("eng".to_string());
        }
        let result = summarize(regions, ENGINE, 90.0, 0.2);

        assert_eq!(result.total_text_regions, 5);
        assert_eq!(result.high_confidence_regions, 3);
        assert_eq!(result.full_text, "Quarterly Results Revenue grew 12");
        assert_eq!(result.languages_detected, vec!["eng".to_string()]);
        assert!((result.average_confidence - 82.36).abs() < 1e-9);
    }

    #[test]
    fn test_build_args() {
        let detector = TesseractDetector::new(OcrConfig {
            languages: vec!["eng".to_string(), "deu".to_string()],
            ..Default::default()
        });
        let args = detector.build_args(Path::new("/f/scene_001.jpg"));
        assert_eq!(args[1], "stdout");
        assert!(args.contains(&"eng+deu".to_string()));
        assert_eq!(args.last(), Some(&"tsv".to_string()));
    }

    #[tokio::test]
    async fn test_disabled_returns_empty() {
        let detector = TesseractDetector::new(OcrConfig {
            enabled: false,
            ..Default::default()
        });
        let result = detector.detect_text(Path::new("/f/missing.jpg")).await;
        assert_eq!(result.engine_used, "none");
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_missing_image_degrades() {
        let detector = TesseractDetector::with_defaults();
        let results = detector
            .detect_text_batch(&[
                std::path::PathBuf::from("/f/missing_1.jpg"),
                std::path::PathBuf::from("/f/missing_2.jpg"),
            ])
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.has_text() && r.error.is_some()));
    }
}
