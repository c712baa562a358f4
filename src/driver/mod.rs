// src/driver/mod.rs
//
// Whole-video drivers: the headless one behind the API/batch path and the
// interactive one for desktop checks. Both own their pipeline (and so
// their trajectory) for exactly one run.

pub mod headless;
pub mod interactive;

pub use headless::{process_video_headless, run_headless, RunStats};
pub use interactive::{
    run_interactive, FrameDisplay, HighGuiDisplay, KeyCommand, LiveSummary, WINDOW_NAME,
};

use crate::error::TrackerError;
use crate::pipeline::PipelineMetrics;
use crate::types::SinkSettings;
use crate::video_processor::{progress_percent, FrameSink};
use opencv::{core::Mat, prelude::*};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Create the output's parent directory tree if needed.
pub(crate) fn ensure_parent_dir(output: &Path) -> std::io::Result<()> {
    match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            info!("Creating output directory {}", dir.display());
            fs::create_dir_all(dir)
        }
        _ => Ok(()),
    }
}

/// Frame rate for the sink; some containers report 0.
pub(crate) fn effective_fps(source_fps: f64, fallback: f64) -> f64 {
    if source_fps.is_finite() && source_fps > 0.0 {
        source_fps
    } else {
        warn!(
            "Source reports frame rate {}, writing at {} FPS",
            source_fps, fallback
        );
        fallback
    }
}

/// Remove a partially written output after a failed run.
pub(crate) fn discard_partial_output(output: &Path) {
    if !output.exists() {
        return;
    }
    match fs::remove_file(output) {
        Ok(()) => info!("Removed partial output {}", output.display()),
        Err(e) => warn!("Could not remove partial output {}: {}", output.display(), e),
    }
}

/// Write one frame, refusing any frame whose size differs from the sink's.
/// OpenCV's writer drops such frames without reporting an error.
pub(crate) fn write_frame<K: FrameSink>(
    sink: &mut K,
    frame: &Mat,
    settings: &SinkSettings,
    output: &Path,
) -> Result<(), TrackerError> {
    let (width, height) = (frame.cols(), frame.rows());
    if (width, height) != (settings.width, settings.height) {
        return Err(TrackerError::Write {
            output: output.display().to_string(),
            message: format!(
                "frame is {}x{} but the output was opened for {}x{}",
                width, height, settings.width, settings.height
            ),
        });
    }
    sink.write(frame)
}

pub(crate) fn log_progress(processed: u64, interval: u64, total_frames: i64) {
    if interval == 0 || processed % interval != 0 {
        return;
    }
    if total_frames > 0 {
        info!(
            "Progress: {} frames ({:.1}%)",
            processed,
            progress_percent(processed, total_frames)
        );
    } else {
        info!("Progress: {} frames", processed);
    }
}

pub(crate) fn log_run_summary(metrics: &PipelineMetrics) {
    let summary = metrics.summary();
    info!(
        "Run summary: {} frames, {} with a tracked position, {} clears, avg detect {:.1} ms, {:.1} FPS",
        summary.total_frames,
        summary.frames_with_position,
        summary.trajectory_clears,
        summary.avg_detect_ms,
        summary.fps
    );
}
