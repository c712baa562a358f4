// src/pipeline/metrics.rs
//
// Per-run counters. One pipeline run is single-threaded, so these are
// plain integers owned by the pipeline.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: u64,
    pub frames_with_position: u64,
    pub candidates_seen: u64,
    pub trajectory_clears: u64,
    pub detect_time: Duration,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: 0,
            frames_with_position: 0,
            candidates_seen: 0,
            trajectory_clears: 0,
            detect_time: Duration::ZERO,
            started_at: Instant::now(),
        }
    }

    pub fn record_frame(&mut self, candidates: usize, tracked: bool, detect_time: Duration) {
        self.total_frames += 1;
        self.candidates_seen += candidates as u64;
        self.detect_time += detect_time;
        if tracked {
            self.frames_with_position += 1;
        }
    }

    pub fn fps(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            self.total_frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn avg_detect_ms(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.detect_time.as_secs_f64() * 1000.0 / self.total_frames as f64
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames,
            frames_with_position: self.frames_with_position,
            candidates_seen: self.candidates_seen,
            trajectory_clears: self.trajectory_clears,
            avg_detect_ms: self.avg_detect_ms(),
            fps: self.fps(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub frames_with_position: u64,
    pub candidates_seen: u64,
    pub trajectory_clears: u64,
    pub avg_detect_ms: f64,
    pub fps: f64,
    pub elapsed_secs: f64,
}
