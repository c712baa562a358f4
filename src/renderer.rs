// src/renderer.rs

use crate::trajectory::Trajectory;
use opencv::{
    core::{self, Mat},
    imgproc,
};

pub const DEFAULT_LINE_THICKNESS: i32 = 3;

/// Draws the trajectory as connected segments, blue at the oldest end
/// shading to red at the newest.
#[derive(Debug, Clone, Copy)]
pub struct PathRenderer {
    thickness: i32,
}

impl PathRenderer {
    pub fn new(thickness: i32) -> Self {
        Self { thickness }
    }

    /// Draw onto `frame` in place. Fewer than two points leaves the frame untouched.
    pub fn draw(&self, frame: &mut Mat, trajectory: &Trajectory) -> opencv::Result<()> {
        let n = trajectory.len();
        if n < 2 {
            return Ok(());
        }

        let starts = trajectory.iter();
        let ends = trajectory.iter().skip(1);

        for (i, (from, to)) in starts.zip(ends).enumerate() {
            let (b, g, r) = gradient_bgr(i + 1, n);
            imgproc::line(
                frame,
                core::Point::new(from.x, from.y),
                core::Point::new(to.x, to.y),
                core::Scalar::new(b as f64, g as f64, r as f64, 0.0),
                self.thickness,
                imgproc::LINE_8,
                0,
            )?;
        }

        Ok(())
    }
}

impl Default for PathRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_THICKNESS)
    }
}

/// Color of the segment ending at `index` in a path of `len` points,
/// as (blue, green, red). Uses `index / len`, so the newest segment
/// approaches but never reaches pure red.
pub fn gradient_bgr(index: usize, len: usize) -> (u8, u8, u8) {
    let ratio = index as f64 / len as f64;
    let blue = (255.0 * (1.0 - ratio)) as u8;
    let red = (255.0 * ratio) as u8;
    (blue, 0, red)
}
