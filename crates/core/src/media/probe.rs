//! ffprobe JSON parsing.

use serde::Deserialize;
use std::path::Path;

/// Parsed subset of `ffprobe -show_format -show_streams` output.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub duration: f64,
    pub size_bytes: u64,
    pub format: String,
    pub video: Option<VideoStream>,
    pub audio: Option<AudioStream>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoStream {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u32,
    /// Stream duration when reported separately from the container.
    pub duration: Option<f64>,
}

#[derive(Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    format_name: String,
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: String,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Parses a frame rate like "30000/1001" or "25".
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            (den > 0.0).then(|| num / den)
        }
        None => rate.trim().parse::<f64>().ok(),
    }
}

/// Parses ffprobe JSON output.
pub fn parse_probe_output(path: &Path, output: &str) -> Result<ProbeInfo, String> {
    let probe: ProbeOutput = serde_json::from_str(output)
        .map_err(|e| format!("Failed to parse ffprobe output for {}: {}", path.display(), e))?;

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size_bytes = probe
        .format
        .size
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let format = probe
        .format
        .format_name
        .split(',')
        .next()
        .unwrap_or("unknown")
        .to_string();

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .map(|s| VideoStream {
            codec: s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            width: s.width.unwrap_or(0),
            height: s.height.unwrap_or(0),
            fps: s
                .r_frame_rate
                .as_deref()
                .and_then(parse_frame_rate)
                .unwrap_or(0.0),
        });

    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .map(|s| AudioStream {
            codec: s.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            sample_rate: s
                .sample_rate
                .as_deref()
                .and_then(|r| r.parse::<u32>().ok())
                .unwrap_or(0),
            channels: s.channels.unwrap_or(0),
            duration: s.duration.as_deref().and_then(|d| d.parse::<f64>().ok()),
        });

    Ok(ProbeInfo {
        duration,
        size_bytes,
        format,
        video,
        audio,
    })
}
