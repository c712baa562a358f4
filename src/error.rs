// src/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("could not open video source: {input}")]
    Open { input: String },

    #[error("could not read a frame from: {input}")]
    Read { input: String },

    #[error("detection failed on frame {frame}: {message}")]
    Detection { frame: u64, message: String },

    #[error("could not write output {output}: {message}")]
    Write { output: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("video backend error: {0}")]
    Backend(#[from] opencv::Error),
}

impl TrackerError {
    /// Short text for the `message` field of a failure result.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Open { .. } => "Could not open video file",
            Self::Read { .. } => "Could not read video",
            Self::Detection { .. } => "Detection failed",
            Self::Write { .. } => "Could not write output video",
            Self::Config(_) => "Invalid configuration",
            Self::Io(_) | Self::Backend(_) => "Processing failed",
        }
    }
}
