// src/driver/interactive.rs
//
// Live display loop for desktop checks. One blocking iteration per frame:
// process, show, optionally write, then poll the keyboard once.

use super::{
    discard_partial_output, effective_fps, ensure_parent_dir, log_progress, log_run_summary,
    write_frame,
};
use crate::detection::Detector;
use crate::error::TrackerError;
use crate::pipeline::FramePipeline;
use crate::types::{Config, SinkSettings};
use crate::video_processor::{FrameSink, FrameSource, VideoBackend};
use opencv::{core::Mat, highgui};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const WINDOW_NAME: &str = "Barbell Tracking";

/// Delay passed to the key poll, in milliseconds.
const KEY_POLL_MS: i32 = 1;

pub trait FrameDisplay {
    fn show(&mut self, frame: &Mat) -> Result<(), TrackerError>;

    /// Wait up to `delay_ms` for a key. Returns the low byte of the key code.
    fn poll_key(&mut self, delay_ms: i32) -> Result<Option<i32>, TrackerError>;

    fn close(&mut self) -> Result<(), TrackerError>;
}

pub struct HighGuiDisplay {
    window: String,
    open: bool,
}

impl HighGuiDisplay {
    pub fn new(window: &str) -> Result<Self, TrackerError> {
        highgui::named_window(window, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            window: window.to_string(),
            open: true,
        })
    }
}

impl FrameDisplay for HighGuiDisplay {
    fn show(&mut self, frame: &Mat) -> Result<(), TrackerError> {
        highgui::imshow(&self.window, frame)?;
        Ok(())
    }

    fn poll_key(&mut self, delay_ms: i32) -> Result<Option<i32>, TrackerError> {
        let key = highgui::wait_key(delay_ms)?;
        Ok((key >= 0).then_some(key & 0xFF))
    }

    fn close(&mut self) -> Result<(), TrackerError> {
        if self.open {
            self.open = false;
            highgui::destroy_window(&self.window)?;
        }
        Ok(())
    }
}

impl Drop for HighGuiDisplay {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close window {}: {}", self.window, e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Quit,
    Clear,
}

impl KeyCommand {
    pub fn from_key(key: i32) -> Option<Self> {
        match (key & 0xFF) as u8 {
            b'q' => Some(Self::Quit),
            b'c' => Some(Self::Clear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveSummary {
    pub frames: u64,
    pub frames_written: u64,
    pub clears: u64,
    pub quit_by_user: bool,
    pub output: Option<PathBuf>,
}

/// Output side of a live run when saving.
struct Recording<'a, K> {
    sink: K,
    settings: SinkSettings,
    path: &'a Path,
}

/// Run the live loop until the stream ends or the operator quits.
/// When `output` is given, processed frames are also written there at the
/// source's own dimensions.
pub fn run_interactive<B, D, V>(
    backend: &B,
    detector: D,
    display: &mut V,
    input: &str,
    output: Option<&Path>,
    config: &Config,
) -> Result<LiveSummary, TrackerError>
where
    B: VideoBackend,
    D: Detector,
    V: FrameDisplay,
{
    let mut source = backend.open_source(input)?;
    let properties = source.properties();

    let mut recording = match output {
        Some(path) => {
            ensure_parent_dir(path)?;
            let settings = SinkSettings {
                codec: config.video.codec.clone(),
                fps: effective_fps(properties.fps, config.video.fallback_fps),
                width: properties.width,
                height: properties.height,
            };
            let sink = backend.open_sink(path, &settings)?;
            Some(Recording {
                sink,
                settings,
                path,
            })
        }
        None => None,
    };

    let mut pipeline = FramePipeline::from_config(detector, config);
    info!("Press 'q' to quit, 'c' to clear path");

    let looped = live_loop(
        &mut source,
        recording.as_mut(),
        &mut pipeline,
        display,
        config.video.progress_interval,
        properties.total_frames,
    );

    let mut cleanup = source.release();
    if let Some(rec) = recording.as_mut() {
        cleanup = cleanup.and(rec.sink.release());
    }
    cleanup = cleanup.and(display.close());

    let (frames_written, quit_by_user) = match looped.and_then(|done| cleanup.map(|()| done)) {
        Ok(done) => done,
        Err(e) => {
            if let Some(rec) = recording.take() {
                let path = rec.path;
                drop(rec);
                discard_partial_output(path);
            }
            return Err(e);
        }
    };

    log_run_summary(pipeline.metrics());
    if let Some(path) = output {
        info!("Video saved to: {}", path.display());
    }

    let metrics = pipeline.metrics();
    Ok(LiveSummary {
        frames: metrics.total_frames,
        frames_written,
        clears: metrics.trajectory_clears,
        quit_by_user,
        output: output.map(Path::to_path_buf),
    })
}

/// Returns (frames written, quit requested).
fn live_loop<S, K, D, V>(
    source: &mut S,
    mut recording: Option<&mut Recording<'_, K>>,
    pipeline: &mut FramePipeline<D>,
    display: &mut V,
    progress_interval: u64,
    total_frames: i64,
) -> Result<(u64, bool), TrackerError>
where
    S: FrameSource,
    K: FrameSink,
    D: Detector,
    V: FrameDisplay,
{
    let mut written: u64 = 0;
    let mut shown: u64 = 0;

    loop {
        let mut frame = Mat::default();
        if !source.read(&mut frame)? {
            return Ok((written, false));
        }

        pipeline.process(&mut frame)?;
        display.show(&frame)?;
        shown += 1;

        if let Some(rec) = recording.as_deref_mut() {
            write_frame(&mut rec.sink, &frame, &rec.settings, rec.path)?;
            written += 1;
        }
        log_progress(shown, progress_interval, total_frames);

        match display.poll_key(KEY_POLL_MS)?.and_then(KeyCommand::from_key) {
            Some(KeyCommand::Quit) => return Ok((written, true)),
            Some(KeyCommand::Clear) => {
                pipeline.clear_trajectory();
                info!("Trajectory cleared");
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Detection;
    use crate::testing::{MemoryBackend, MemoryVideo, ScriptedDetector, ScriptedDisplay};

    fn barbell() -> Detection {
        Detection::new([0.0, 0.0, 10.0, 10.0], 0.9)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(KeyCommand::from_key('q' as i32), Some(KeyCommand::Quit));
        assert_eq!(KeyCommand::from_key('c' as i32), Some(KeyCommand::Clear));
        // High bits from modifier state are masked off.
        assert_eq!(KeyCommand::from_key(0x10_0000 | 'q' as i32), Some(KeyCommand::Quit));
        assert_eq!(KeyCommand::from_key('x' as i32), None);
    }

    #[test]
    fn test_runs_to_end_of_stream() {
        let backend = MemoryBackend::new().with_video("cam", MemoryVideo::blank(32, 24, 5, 30.0));
        let mut display = ScriptedDisplay::default();

        let summary = run_interactive(
            &backend,
            ScriptedDetector::repeating(barbell()),
            &mut display,
            "cam",
            None,
            &Config::default(),
        )
        .unwrap();

        assert_eq!(summary.frames, 5);
        assert_eq!(summary.frames_written, 0);
        assert!(!summary.quit_by_user);
        assert_eq!(display.shown, 5);
        assert!(display.closed);
        assert_eq!(backend.log().sources_released, 1);
    }

    #[test]
    fn test_quit_key_stops_loop() {
        let backend = MemoryBackend::new().with_video("cam", MemoryVideo::blank(32, 24, 10, 30.0));
        let mut display = ScriptedDisplay::with_keys(vec![None, None, Some('q')]);

        let summary = run_interactive(
            &backend,
            ScriptedDetector::repeating(barbell()),
            &mut display,
            "cam",
            None,
            &Config::default(),
        )
        .unwrap();

        assert!(summary.quit_by_user);
        assert_eq!(summary.frames, 3);
        assert_eq!(display.shown, 3);
    }

    #[test]
    fn test_clear_key_keeps_running() {
        let backend = MemoryBackend::new().with_video("cam", MemoryVideo::blank(32, 24, 4, 30.0));
        let mut display = ScriptedDisplay::with_keys(vec![None, Some('c'), None, None]);

        let summary = run_interactive(
            &backend,
            ScriptedDetector::repeating(barbell()),
            &mut display,
            "cam",
            None,
            &Config::default(),
        )
        .unwrap();

        assert_eq!(summary.frames, 4);
        assert_eq!(summary.clears, 1);
        assert!(!summary.quit_by_user);
    }

    #[test]
    fn test_saves_at_native_dimensions() {
        // Landscape source: no orientation correction in live mode.
        let backend = MemoryBackend::new().with_video("cam", MemoryVideo::blank(64, 36, 3, 25.0));
        let mut display = ScriptedDisplay::default();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("live/session.mp4");

        let summary = run_interactive(
            &backend,
            ScriptedDetector::new(Vec::new()),
            &mut display,
            "cam",
            Some(output.as_path()),
            &Config::default(),
        )
        .unwrap();

        assert_eq!(summary.frames_written, 3);
        assert_eq!(summary.output.as_deref(), Some(output.as_path()));
        assert!(output.exists());
        assert!(dir.path().join("live").is_dir());

        let log = backend.log();
        let sink = &log.sinks[0];
        assert_eq!((sink.settings.width, sink.settings.height), (64, 36));
        assert_eq!(sink.settings.fps, 25.0);
        assert!(sink.released);
    }

    #[test]
    fn test_detection_error_propagates_after_cleanup() {
        let backend = MemoryBackend::new().with_video("cam", MemoryVideo::blank(32, 24, 4, 30.0));
        let mut display = ScriptedDisplay::default();

        let err = run_interactive(
            &backend,
            ScriptedDetector::failing_at(2, barbell()),
            &mut display,
            "cam",
            None,
            &Config::default(),
        )
        .unwrap_err();

        assert!(matches!(err, TrackerError::Detection { frame: 2, .. }));
        assert!(display.closed);
        assert_eq!(backend.log().sources_released, 1);
    }

    #[test]
    fn test_detection_error_removes_saved_output() {
        let backend = MemoryBackend::new().with_video("cam", MemoryVideo::blank(32, 24, 4, 30.0));
        let mut display = ScriptedDisplay::default();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("session.mp4");

        let err = run_interactive(
            &backend,
            ScriptedDetector::failing_at(3, barbell()),
            &mut display,
            "cam",
            Some(output.as_path()),
            &Config::default(),
        )
        .unwrap_err();

        assert!(matches!(err, TrackerError::Detection { frame: 3, .. }));
        let log = backend.log();
        assert_eq!(log.sinks[0].frames.len(), 2);
        assert!(log.sinks[0].released);
        drop(log);
        assert!(!output.exists());
    }

    #[test]
    fn test_write_error_removes_saved_output() {
        let backend = MemoryBackend::new()
            .with_video("cam", MemoryVideo::blank(32, 24, 4, 30.0))
            .failing_write_at(2);
        let mut display = ScriptedDisplay::default();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("session.mp4");

        let err = run_interactive(
            &backend,
            ScriptedDetector::new(Vec::new()),
            &mut display,
            "cam",
            Some(output.as_path()),
            &Config::default(),
        )
        .unwrap_err();

        assert!(matches!(err, TrackerError::Write { .. }));
        assert!(display.closed);
        assert_eq!(backend.log().sources_released, 1);
        assert!(!output.exists());
    }

    #[test]
    fn test_mismatched_frame_size_is_write_error() {
        let mut video = MemoryVideo::blank(32, 24, 2, 30.0);
        video.properties.height = 20;
        let backend = MemoryBackend::new().with_video("cam", video);
        let mut display = ScriptedDisplay::default();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("session.mp4");

        let err = run_interactive(
            &backend,
            ScriptedDetector::new(Vec::new()),
            &mut display,
            "cam",
            Some(output.as_path()),
            &Config::default(),
        )
        .unwrap_err();

        assert!(matches!(err, TrackerError::Write { .. }));
        assert!(backend.log().sinks[0].frames.is_empty());
        assert!(!output.exists());
    }
}
