// src/lib.rs
//
// Barbell path tracking for lift videos. Each frame goes through a
// detector, the best confident candidate's centroid is appended to a
// bounded trajectory, and the trajectory is drawn back onto the frame as
// a gradient polyline. Drivers run whole videos headless (file to file)
// or interactively (window plus keyboard).

pub mod config;
pub mod detection;
pub mod driver;
pub mod error;
pub mod orientation;
pub mod pipeline;
pub mod renderer;
pub mod tracker;
pub mod trajectory;
pub mod types;
pub mod video_processor;

#[cfg(feature = "onnx")]
pub mod yolo;

#[cfg(test)]
pub(crate) mod testing;

pub use detection::{extract_position, Detection, Detector, SharedDetector};
pub use error::TrackerError;
pub use pipeline::FramePipeline;
pub use renderer::PathRenderer;
pub use tracker::{default_output_path, BarbellTracker, BatchEntry};
pub use trajectory::Trajectory;
pub use types::{Config, Position, ProcessingResult, VideoProperties};
pub use video_processor::OpenCvBackend;

#[cfg(feature = "onnx")]
pub use yolo::YoloDetector;
