// src/testing.rs
//
// In-memory collaborators for driver and pipeline tests: a video backend
// that serves prepared frames, records what was written and leaves an
// empty file at each sink path, a detector
// that replays scripted candidates, and a display fed scripted keys.

use crate::detection::{Detection, Detector};
use crate::driver::interactive::FrameDisplay;
use crate::error::TrackerError;
use crate::types::{SinkSettings, VideoProperties};
use crate::video_processor::{FrameSink, FrameSource, VideoBackend};
use anyhow::{bail, Result};
use opencv::{
    core::{self, Mat},
    prelude::*,
};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub fn blank_frame(width: i32, height: i32) -> Mat {
    Mat::new_rows_cols_with_default(height, width, core::CV_8UC3, core::Scalar::all(0.0)).unwrap()
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

pub struct ScriptedDetector {
    script: VecDeque<Vec<Detection>>,
    fallback: Vec<Detection>,
    fail_at: Option<u64>,
    calls: u64,
    pub frame_sizes: Vec<(i32, i32)>,
}

impl ScriptedDetector {
    /// One entry per frame; nothing is detected once the script runs out.
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script: script.into(),
            fallback: Vec::new(),
            fail_at: None,
            calls: 0,
            frame_sizes: Vec::new(),
        }
    }

    pub fn repeating(detection: Detection) -> Self {
        Self {
            fallback: vec![detection],
            ..Self::new(Vec::new())
        }
    }

    /// Repeats `detection` but errors on the `frame`-th call (1-based).
    pub fn failing_at(frame: u64, detection: Detection) -> Self {
        Self {
            fail_at: Some(frame),
            ..Self::repeating(detection)
        }
    }
}

impl Detector for ScriptedDetector {
    fn infer(&mut self, frame: &Mat) -> Result<Vec<Detection>> {
        self.calls += 1;
        self.frame_sizes.push((frame.cols(), frame.rows()));
        if self.fail_at == Some(self.calls) {
            bail!("scripted failure");
        }
        Ok(self
            .script
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

// ---------------------------------------------------------------------------
// Video backend
// ---------------------------------------------------------------------------

pub struct MemoryVideo {
    pub properties: VideoProperties,
    pub frames: Vec<Mat>,
    pub seekable: bool,
}

impl MemoryVideo {
    /// `count` black frames of `width` x `height`, reported as such.
    pub fn blank(width: i32, height: i32, count: usize, fps: f64) -> Self {
        Self {
            properties: VideoProperties {
                fps,
                width,
                height,
                total_frames: count as i64,
            },
            frames: (0..count).map(|_| blank_frame(width, height)).collect(),
            seekable: true,
        }
    }

    pub fn non_seekable(mut self) -> Self {
        self.seekable = false;
        self
    }
}

#[derive(Debug)]
pub struct SinkRecord {
    pub path: PathBuf,
    pub settings: SinkSettings,
    pub frames: Vec<Mat>,
    pub released: bool,
}

#[derive(Debug, Default)]
pub struct BackendLog {
    pub sources_opened: usize,
    pub sources_released: usize,
    pub sinks: Vec<SinkRecord>,
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    videos: Arc<HashMap<String, Arc<MemoryVideo>>>,
    log: Arc<Mutex<BackendLog>>,
    fail_write_at: Option<usize>,
    fail_sink_open: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, name: &str, video: MemoryVideo) -> Self {
        Arc::make_mut(&mut self.videos).insert(name.to_string(), Arc::new(video));
        self
    }

    /// The `n`-th write (1-based) to any sink fails.
    pub fn failing_write_at(mut self, n: usize) -> Self {
        self.fail_write_at = Some(n);
        self
    }

    pub fn failing_sink_open(mut self) -> Self {
        self.fail_sink_open = true;
        self
    }

    pub fn log(&self) -> MutexGuard<'_, BackendLog> {
        self.log.lock().unwrap()
    }
}

impl VideoBackend for MemoryBackend {
    type Source = MemorySource;
    type Sink = MemorySink;

    fn open_source(&self, input: &str) -> Result<MemorySource, TrackerError> {
        let video = self.videos.get(input).cloned().ok_or_else(|| TrackerError::Open {
            input: input.to_string(),
        })?;
        self.log().sources_opened += 1;
        Ok(MemorySource {
            video,
            position: 0,
            released: false,
            log: Arc::clone(&self.log),
        })
    }

    fn open_sink(&self, output: &Path, settings: &SinkSettings) -> Result<MemorySink, TrackerError> {
        if self.fail_sink_open {
            return Err(TrackerError::Write {
                output: output.display().to_string(),
                message: "scripted open failure".to_string(),
            });
        }
        // Like a real writer, opening creates the container file.
        std::fs::write(output, b"")?;
        let mut log = self.log();
        log.sinks.push(SinkRecord {
            path: output.to_path_buf(),
            settings: settings.clone(),
            frames: Vec::new(),
            released: false,
        });
        Ok(MemorySink {
            index: log.sinks.len() - 1,
            fail_write_at: self.fail_write_at,
            writes: 0,
            log: Arc::clone(&self.log),
        })
    }
}

pub struct MemorySource {
    video: Arc<MemoryVideo>,
    position: usize,
    released: bool,
    log: Arc<Mutex<BackendLog>>,
}

impl FrameSource for MemorySource {
    fn properties(&self) -> VideoProperties {
        self.video.properties
    }

    fn read(&mut self, frame: &mut Mat) -> Result<bool, TrackerError> {
        match self.video.frames.get(self.position) {
            Some(next) => {
                *frame = next.try_clone()?;
                self.position += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn rewind(&mut self) -> Result<bool, TrackerError> {
        if self.video.seekable {
            self.position = 0;
        }
        Ok(self.video.seekable)
    }

    fn release(&mut self) -> Result<(), TrackerError> {
        if !self.released {
            self.released = true;
            self.log.lock().unwrap().sources_released += 1;
        }
        Ok(())
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

pub struct MemorySink {
    index: usize,
    fail_write_at: Option<usize>,
    writes: usize,
    log: Arc<Mutex<BackendLog>>,
}

impl FrameSink for MemorySink {
    fn write(&mut self, frame: &Mat) -> Result<(), TrackerError> {
        self.writes += 1;
        if self.fail_write_at == Some(self.writes) {
            return Err(TrackerError::Write {
                output: "memory".to_string(),
                message: "scripted write failure".to_string(),
            });
        }
        let copy = frame.try_clone()?;
        self.log.lock().unwrap().sinks[self.index].frames.push(copy);
        Ok(())
    }

    fn release(&mut self) -> Result<(), TrackerError> {
        self.log.lock().unwrap().sinks[self.index].released = true;
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedDisplay {
    keys: VecDeque<Option<i32>>,
    pub shown: usize,
    pub closed: bool,
}

impl ScriptedDisplay {
    /// One poll result per displayed frame; no key once the script runs out.
    pub fn with_keys(keys: Vec<Option<char>>) -> Self {
        Self {
            keys: keys.into_iter().map(|k| k.map(|c| c as i32)).collect(),
            ..Self::default()
        }
    }
}

impl FrameDisplay for ScriptedDisplay {
    fn show(&mut self, _frame: &Mat) -> Result<(), TrackerError> {
        self.shown += 1;
        Ok(())
    }

    fn poll_key(&mut self, _delay_ms: i32) -> Result<Option<i32>, TrackerError> {
        Ok(self.keys.pop_front().flatten())
    }

    fn close(&mut self) -> Result<(), TrackerError> {
        self.closed = true;
        Ok(())
    }
}
