// src/orientation.rs
//
// Phone recordings from the capture app arrive with landscape stream
// dimensions while the content is portrait. Any source reporting
// width > height is rotated 90 degrees clockwise before processing.
// This is a fixed heuristic for that device, not EXIF rotation handling.

use crate::types::VideoProperties;
use opencv::core::{self, Mat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    AsRecorded,
    Rotate90Clockwise,
}

impl Orientation {
    pub fn detect(properties: &VideoProperties) -> Self {
        if properties.width > properties.height {
            Self::Rotate90Clockwise
        } else {
            Self::AsRecorded
        }
    }

    pub fn needs_rotation(&self) -> bool {
        matches!(self, Self::Rotate90Clockwise)
    }

    /// Output (width, height) for frames of the given stream.
    pub fn output_size(&self, properties: &VideoProperties) -> (i32, i32) {
        match self {
            Self::AsRecorded => (properties.width, properties.height),
            Self::Rotate90Clockwise => (properties.height, properties.width),
        }
    }

    /// Returns the frame to process: the input itself, or a rotated copy.
    pub fn apply(&self, frame: Mat) -> opencv::Result<Mat> {
        match self {
            Self::AsRecorded => Ok(frame),
            Self::Rotate90Clockwise => {
                let mut rotated = Mat::default();
                core::rotate(&frame, &mut rotated, core::ROTATE_90_CLOCKWISE)?;
                Ok(rotated)
            }
        }
    }
}
