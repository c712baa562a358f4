// src/video_processor.rs

use crate::error::TrackerError;
use crate::types::{SinkSettings, VideoProperties};
use opencv::{
    core::{self, Mat},
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "mkv", "m4v"];

/// A frame-addressable input stream.
pub trait FrameSource {
    fn properties(&self) -> VideoProperties;

    /// Read the next frame into `frame`. `Ok(false)` means end of stream.
    fn read(&mut self, frame: &mut Mat) -> Result<bool, TrackerError>;

    /// Seek back to the first frame. `Ok(false)` if the stream refused.
    fn rewind(&mut self) -> Result<bool, TrackerError>;

    fn release(&mut self) -> Result<(), TrackerError>;
}

pub trait FrameSink {
    fn write(&mut self, frame: &Mat) -> Result<(), TrackerError>;

    fn release(&mut self) -> Result<(), TrackerError>;
}

/// Opens sources and sinks for a run.
pub trait VideoBackend {
    type Source: FrameSource;
    type Sink: FrameSink;

    fn open_source(&self, input: &str) -> Result<Self::Source, TrackerError>;

    fn open_sink(&self, output: &Path, settings: &SinkSettings) -> Result<Self::Sink, TrackerError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCvBackend;

impl VideoBackend for OpenCvBackend {
    type Source = VideoReader;
    type Sink = VideoSink;

    fn open_source(&self, input: &str) -> Result<VideoReader, TrackerError> {
        VideoReader::open(input)
    }

    fn open_sink(&self, output: &Path, settings: &SinkSettings) -> Result<VideoSink, TrackerError> {
        VideoSink::create(output, settings)
    }
}

pub struct VideoReader {
    cap: VideoCapture,
    input: String,
    properties: VideoProperties,
}

impl VideoReader {
    /// Opens a file path, or a camera device when `input` is an integer index.
    pub fn open(input: &str) -> Result<Self, TrackerError> {
        info!("Opening video: {}", input);

        let open_failed = || TrackerError::Open {
            input: input.to_string(),
        };

        let cap = match input.trim().parse::<i32>() {
            Ok(device) => VideoCapture::new(device, videoio::CAP_ANY),
            Err(_) => VideoCapture::from_file(input, videoio::CAP_ANY),
        }
        .map_err(|e| {
            debug!("VideoCapture error for {}: {}", input, e);
            open_failed()
        })?;

        if !cap.is_opened().unwrap_or(false) {
            return Err(open_failed());
        }

        let fps = cap.get(videoio::CAP_PROP_FPS)?;
        let total_frames = cap.get(videoio::CAP_PROP_FRAME_COUNT)? as i64;
        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

        info!(
            "Video properties: {}x{} @ {:.1} FPS, {} frames",
            width, height, fps, total_frames
        );

        Ok(Self {
            cap,
            input: input.to_string(),
            properties: VideoProperties {
                fps,
                width,
                height,
                total_frames,
            },
        })
    }
}

impl FrameSource for VideoReader {
    fn properties(&self) -> VideoProperties {
        self.properties
    }

    fn read(&mut self, frame: &mut Mat) -> Result<bool, TrackerError> {
        let ok = self.cap.read(frame).map_err(|e| {
            debug!("read error on {}: {}", self.input, e);
            TrackerError::Read {
                input: self.input.clone(),
            }
        })?;

        if !ok || frame.empty() {
            return Ok(false);
        }
        Ok(true)
    }

    fn rewind(&mut self) -> Result<bool, TrackerError> {
        Ok(self.cap.set(videoio::CAP_PROP_POS_FRAMES, 0.0)?)
    }

    fn release(&mut self) -> Result<(), TrackerError> {
        self.cap.release()?;
        Ok(())
    }
}

impl Drop for VideoReader {
    fn drop(&mut self) {
        if let Err(e) = self.cap.release() {
            warn!("Failed to release {}: {}", self.input, e);
        }
    }
}

pub struct VideoSink {
    writer: VideoWriter,
    output: PathBuf,
}

impl VideoSink {
    pub fn create(output: &Path, settings: &SinkSettings) -> Result<Self, TrackerError> {
        let write_failed = |message: String| TrackerError::Write {
            output: output.display().to_string(),
            message,
        };

        let code: Vec<char> = settings.codec.chars().collect();
        let [c1, c2, c3, c4] = code.as_slice() else {
            return Err(write_failed(format!("invalid codec {:?}", settings.codec)));
        };
        let fourcc = VideoWriter::fourcc(*c1, *c2, *c3, *c4)?;

        let path = output
            .to_str()
            .ok_or_else(|| write_failed("output path is not valid UTF-8".to_string()))?;

        let writer = VideoWriter::new(
            path,
            fourcc,
            settings.fps,
            core::Size::new(settings.width, settings.height),
            true,
        )
        .map_err(|e| write_failed(e.to_string()))?;

        if !writer.is_opened().unwrap_or(false) {
            return Err(write_failed(format!(
                "writer did not open ({} {}x{} @ {:.2})",
                settings.codec, settings.width, settings.height, settings.fps
            )));
        }

        info!(
            "Output video: {} ({} {}x{} @ {:.2} FPS)",
            output.display(),
            settings.codec,
            settings.width,
            settings.height,
            settings.fps
        );

        Ok(Self {
            writer,
            output: output.to_path_buf(),
        })
    }
}

impl FrameSink for VideoSink {
    fn write(&mut self, frame: &Mat) -> Result<(), TrackerError> {
        self.writer.write(frame).map_err(|e| TrackerError::Write {
            output: self.output.display().to_string(),
            message: e.to_string(),
        })
    }

    fn release(&mut self) -> Result<(), TrackerError> {
        self.writer.release()?;
        Ok(())
    }
}

impl Drop for VideoSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.release() {
            warn!("Failed to finalize {}: {}", self.output.display(), e);
        }
    }
}

pub fn progress_percent(current: u64, total: i64) -> f32 {
    if total <= 0 {
        return 0.0;
    }
    (current as f32 / total as f32) * 100.0
}

/// Video files under `dir`, sorted by path.
pub fn find_video_files(dir: &Path) -> Result<Vec<PathBuf>, TrackerError> {
    if !dir.is_dir() {
        return Err(TrackerError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", dir.display()),
        )));
    }

    let mut videos: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| is_video_file(path))
        .collect();
    videos.sort();

    info!("Found {} video files in {}", videos.len(), dir.display());
    Ok(videos)
}

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
