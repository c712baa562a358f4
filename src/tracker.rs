// src/tracker.rs

use crate::detection::Detector;
use crate::driver::{self, FrameDisplay, LiveSummary};
use crate::error::TrackerError;
use crate::types::{Config, ProcessingResult};
use crate::video_processor::{find_video_files, OpenCvBackend, VideoBackend};
use chrono::Local;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const RESULTS_FILE: &str = "results.jsonl";

/// Default output name for a desktop run: `tracked_video_<YYYYmmdd_HHMMSS>.mp4`.
pub fn default_output_path(dir: impl AsRef<Path>) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.as_ref().join(format!("tracked_video_{}.mp4", stamp))
}

/// One line of the batch results file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    pub input: PathBuf,
    pub output: PathBuf,
    pub result: ProcessingResult,
}

/// Owns a detector for the lifetime of the process and runs videos through
/// it one at a time. Every run starts with an empty trajectory.
pub struct BarbellTracker<D, B = OpenCvBackend> {
    detector: D,
    backend: B,
    config: Config,
}

impl<D: Detector> BarbellTracker<D, OpenCvBackend> {
    pub fn new(detector: D, config: Config) -> Self {
        Self::with_backend(detector, OpenCvBackend, config)
    }
}

impl<D: Detector, B: VideoBackend> BarbellTracker<D, B> {
    pub fn with_backend(detector: D, backend: B, config: Config) -> Self {
        Self {
            detector,
            backend,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn process_video_headless(&mut self, input: &str, output: &Path) -> ProcessingResult {
        driver::process_video_headless(&self.backend, &mut self.detector, input, output, &self.config)
    }

    pub fn process_video<V: FrameDisplay>(
        &mut self,
        display: &mut V,
        input: &str,
        output: Option<&Path>,
    ) -> Result<LiveSummary, TrackerError> {
        driver::run_interactive(
            &self.backend,
            &mut self.detector,
            display,
            input,
            output,
            &self.config,
        )
    }

    /// Track every video under `input_dir`, writing `<stem>_tracked.mp4`
    /// files and one JSON line per video into `output_dir`.
    pub fn process_directory(
        &mut self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<Vec<BatchEntry>, TrackerError> {
        let videos = find_video_files(input_dir)?;

        fs::create_dir_all(output_dir)?;
        let mut results = OpenOptions::new()
            .create(true)
            .append(true)
            .open(output_dir.join(RESULTS_FILE))?;

        let mut entries = Vec::with_capacity(videos.len());
        for (i, input) in videos.into_iter().enumerate() {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("video_{}", i));
            let output = output_dir.join(format!("{}_tracked.mp4", stem));

            info!("[{}] Processing {}", i + 1, input.display());
            let result = self.process_video_headless(&input.to_string_lossy(), &output);
            if !result.success {
                warn!("Skipping {}: {}", input.display(), result.message);
            }

            let entry = BatchEntry {
                input,
                output,
                result,
            };
            serde_json::to_writer(&mut results, &entry).map_err(io::Error::from)?;
            results.write_all(b"\n")?;
            entries.push(entry);
        }

        let succeeded = entries.iter().filter(|e| e.result.success).count();
        info!("✓ Batch complete: {}/{} succeeded", succeeded, entries.len());
        Ok(entries)
    }
}
