// src/driver/headless.rs

use super::{
    discard_partial_output, effective_fps, ensure_parent_dir, log_progress, log_run_summary,
    write_frame,
};
use crate::detection::Detector;
use crate::error::TrackerError;
use crate::orientation::Orientation;
use crate::pipeline::FramePipeline;
use crate::types::{Config, ProcessingResult, SinkSettings};
use crate::video_processor::{FrameSink, FrameSource, VideoBackend};
use opencv::core::Mat;
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RunStats {
    pub frames_processed: u64,
    pub frames_with_position: u64,
    pub fps: f64,
    pub width: i32,
    pub height: i32,
    pub rotated: bool,
}

/// Process one video without a display. Never fails: errors become a
/// failure result.
pub fn process_video_headless<B, D>(
    backend: &B,
    detector: D,
    input: &str,
    output: &Path,
    config: &Config,
) -> ProcessingResult
where
    B: VideoBackend,
    D: Detector,
{
    match run_headless(backend, detector, input, output, config) {
        Ok(stats) => {
            info!(
                "✓ {} -> {} ({} frames, {} tracked, {}x{}{})",
                input,
                output.display(),
                stats.frames_processed,
                stats.frames_with_position,
                stats.width,
                stats.height,
                if stats.rotated { ", rotated" } else { "" }
            );
            ProcessingResult::success(
                output,
                stats.frames_processed,
                stats.fps,
                stats.width,
                stats.height,
            )
        }
        Err(e) => {
            error!("Failed to process {}: {}", input, e);
            ProcessingResult::failure(e.user_message(), e.to_string())
        }
    }
}

pub fn run_headless<B, D>(
    backend: &B,
    detector: D,
    input: &str,
    output: &Path,
    config: &Config,
) -> Result<RunStats, TrackerError>
where
    B: VideoBackend,
    D: Detector,
{
    let mut source = backend.open_source(input)?;
    let properties = source.properties();

    // Probe one frame so an unreadable stream fails before any output exists.
    let mut probe = Mat::default();
    if !source.read(&mut probe)? {
        return Err(TrackerError::Read {
            input: input.to_string(),
        });
    }
    let replay = match source.rewind() {
        Ok(true) => None,
        Ok(false) => {
            warn!("{} is not seekable, replaying probe frame", input);
            Some(probe)
        }
        Err(e) => {
            warn!("Rewind failed on {} ({}), replaying probe frame", input, e);
            Some(probe)
        }
    };

    let orientation = Orientation::detect(&properties);
    let (width, height) = orientation.output_size(&properties);
    if orientation.needs_rotation() {
        info!(
            "Stream reports {}x{}: rotating 90° clockwise, output {}x{}",
            properties.width, properties.height, width, height
        );
    }

    ensure_parent_dir(output)?;
    let settings = SinkSettings {
        codec: config.video.codec.clone(),
        fps: effective_fps(properties.fps, config.video.fallback_fps),
        width,
        height,
    };
    let mut sink = backend.open_sink(output, &settings)?;

    let mut pipeline = FramePipeline::from_config(detector, config);
    let streamed = stream_frames(
        &mut source,
        &mut sink,
        &mut pipeline,
        replay,
        orientation,
        &settings,
        output,
        config.video.progress_interval,
        properties.total_frames,
    );

    // Both handles are released whatever happened in the loop.
    let released_source = source.release();
    let released_sink = sink.release();

    let frames_processed = match streamed
        .and_then(|frames| released_source.map(|()| frames))
        .and_then(|frames| released_sink.map(|()| frames))
    {
        Ok(frames) => frames,
        Err(e) => {
            drop(sink);
            discard_partial_output(output);
            return Err(e);
        }
    };

    log_run_summary(pipeline.metrics());

    Ok(RunStats {
        frames_processed,
        frames_with_position: pipeline.metrics().frames_with_position,
        fps: settings.fps,
        width,
        height,
        rotated: orientation.needs_rotation(),
    })
}

fn stream_frames<S, K, D>(
    source: &mut S,
    sink: &mut K,
    pipeline: &mut FramePipeline<D>,
    mut replay: Option<Mat>,
    orientation: Orientation,
    settings: &SinkSettings,
    output: &Path,
    progress_interval: u64,
    total_frames: i64,
) -> Result<u64, TrackerError>
where
    S: FrameSource,
    K: FrameSink,
    D: Detector,
{
    let mut processed: u64 = 0;

    loop {
        let raw = match replay.take() {
            Some(frame) => frame,
            None => {
                let mut frame = Mat::default();
                if !source.read(&mut frame)? {
                    break;
                }
                frame
            }
        };

        let mut frame = orientation.apply(raw)?;
        pipeline.process(&mut frame)?;
        write_frame(sink, &frame, settings, output)?;
        processed += 1;
        log_progress(processed, progress_interval, total_frames);
    }

    Ok(processed)
}
