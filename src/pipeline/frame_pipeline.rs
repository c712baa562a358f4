// src/pipeline/frame_pipeline.rs
//
// detect -> extract -> append -> render, in that order, for every frame.
// A frame's own detection is part of the path drawn on it.

use super::metrics::PipelineMetrics;
use crate::detection::{extract_position, Detector};
use crate::error::TrackerError;
use crate::renderer::PathRenderer;
use crate::trajectory::Trajectory;
use crate::types::{Config, Position};
use opencv::core::Mat;
use std::time::Instant;
use tracing::debug;

pub struct FramePipeline<D> {
    detector: D,
    confidence_threshold: f32,
    trajectory: Trajectory,
    renderer: PathRenderer,
    metrics: PipelineMetrics,
}

impl<D: Detector> FramePipeline<D> {
    pub fn new(detector: D, confidence_threshold: f32, capacity: usize, renderer: PathRenderer) -> Self {
        Self {
            detector,
            confidence_threshold,
            trajectory: Trajectory::with_capacity(capacity),
            renderer,
            metrics: PipelineMetrics::new(),
        }
    }

    pub fn from_config(detector: D, config: &Config) -> Self {
        Self::new(
            detector,
            config.tracking.confidence_threshold,
            config.tracking.trajectory_capacity,
            PathRenderer::new(config.render.line_thickness),
        )
    }

    /// Run one frame through the pipeline, drawing onto it in place.
    /// Returns the position tracked on this frame, if any.
    pub fn process(&mut self, frame: &mut Mat) -> Result<Option<Position>, TrackerError> {
        let frame_number = self.metrics.total_frames + 1;

        let started = Instant::now();
        let detections = self.detector.infer(frame).map_err(|e| TrackerError::Detection {
            frame: frame_number,
            message: format!("{:#}", e),
        })?;
        let detect_time = started.elapsed();

        let position = extract_position(&detections, self.confidence_threshold);
        if let Some(position) = position {
            self.trajectory.push(position);
        }

        debug!(
            "Frame {}: {} candidates, tracked={:?}, path={}",
            frame_number,
            detections.len(),
            position,
            self.trajectory.len()
        );

        self.renderer.draw(frame, &self.trajectory)?;
        self.metrics
            .record_frame(detections.len(), position.is_some(), detect_time);

        Ok(position)
    }

    pub fn clear_trajectory(&mut self) {
        self.trajectory.clear();
        self.metrics.trajectory_clears += 1;
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }
}
