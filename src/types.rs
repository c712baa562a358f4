// src/types.rs

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub tracking: TrackingConfig,
    pub render: RenderConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: String,
    pub input_size: usize,
    pub input_name: String,
    /// Candidates below this score are dropped inside the detector, before NMS.
    pub candidate_threshold: f32,
    pub iou_threshold: f32,
    pub num_threads: usize,
    pub use_cuda: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Exclusive: a best candidate must score strictly above this.
    pub confidence_threshold: f32,
    pub trajectory_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub line_thickness: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub codec: String,
    pub fallback_fps: f64,
    pub input_dir: String,
    pub output_dir: String,
    pub progress_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

/// Centroid of the tracked object's box, in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Stream-level properties read once when a source is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    pub fps: f64,
    pub width: i32,
    pub height: i32,
    pub total_frames: i64,
}

/// How an output sink should be configured.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkSettings {
    pub codec: String,
    pub fps: f64,
    pub width: i32,
    pub height: i32,
}

/// Boundary record of one headless run, handed to whatever serves the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub filename: String,
    pub frames: u64,
    pub fps: f64,
    pub resolution: String,
}

impl ProcessingResult {
    pub fn success(output_path: &Path, frames: u64, fps: f64, width: i32, height: i32) -> Self {
        let filename = output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            success: true,
            message: "Processing complete".to_string(),
            video: Some(VideoSummary {
                filename,
                frames,
                fps,
                resolution: format!("{}x{}", width, height),
            }),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            video: None,
            error: Some(error.into()),
        }
    }
}
