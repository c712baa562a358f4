// src/config.rs

use crate::error::TrackerError;
use crate::types::{
    Config, LoggingConfig, ModelConfig, RenderConfig, TrackingConfig, VideoConfig,
};
use std::fs;
use std::path::Path;

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        let threshold = self.tracking.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(TrackerError::Config(format!(
                "tracking.confidence_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if self.tracking.trajectory_capacity == 0 {
            return Err(TrackerError::Config(
                "tracking.trajectory_capacity must be at least 1".to_string(),
            ));
        }
        if self.render.line_thickness <= 0 {
            return Err(TrackerError::Config(
                "render.line_thickness must be positive".to_string(),
            ));
        }
        if self.video.codec.chars().count() != 4 {
            return Err(TrackerError::Config(format!(
                "video.codec must be a four character code, got {:?}",
                self.video.codec
            )));
        }
        if self.video.fallback_fps <= 0.0 {
            return Err(TrackerError::Config(
                "video.fallback_fps must be positive".to_string(),
            ));
        }
        if self.model.input_size == 0 {
            return Err(TrackerError::Config(
                "model.input_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/barbell.onnx".to_string(),
            input_size: 640,
            input_name: "images".to_string(),
            candidate_threshold: 0.25,
            iou_threshold: 0.45,
            num_threads: 4,
            use_cuda: false,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            trajectory_capacity: 1000,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { line_thickness: 3 }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            codec: "mp4v".to_string(),
            fallback_fps: 30.0,
            input_dir: "input".to_string(),
            output_dir: "output".to_string(),
            progress_interval: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
