// src/detection.rs

use crate::types::Position;
use anyhow::{anyhow, Result};
use opencv::core::Mat;
use std::sync::{Arc, Mutex};

/// Default exclusive confidence gate for the tracked object.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: [f32; 4], // [x1, y1, x2, y2] in frame coordinates
    pub confidence: f32,
    pub class_id: usize,
}

impl Detection {
    pub fn new(bbox: [f32; 4], confidence: f32) -> Self {
        Self {
            bbox,
            confidence,
            class_id: 0,
        }
    }

    /// Box center, truncated toward zero.
    pub fn centroid(&self) -> Position {
        let [x1, y1, x2, y2] = self.bbox;
        Position::new(((x1 + x2) / 2.0) as i32, ((y1 + y2) / 2.0) as i32)
    }
}

/// Anything that can turn a frame into candidate boxes.
///
/// Implementations must return an empty list, not an error, when nothing is found.
pub trait Detector {
    fn infer(&mut self, frame: &Mat) -> Result<Vec<Detection>>;
}

impl<D: Detector + ?Sized> Detector for &mut D {
    fn infer(&mut self, frame: &Mat) -> Result<Vec<Detection>> {
        (**self).infer(frame)
    }
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn infer(&mut self, frame: &Mat) -> Result<Vec<Detection>> {
        (**self).infer(frame)
    }
}

/// One model instance behind a lock, cloneable into concurrent runs.
/// Each `infer` call holds the lock for its full duration.
pub struct SharedDetector<D> {
    inner: Arc<Mutex<D>>,
}

impl<D> SharedDetector<D> {
    pub fn new(detector: D) -> Self {
        Self {
            inner: Arc::new(Mutex::new(detector)),
        }
    }
}

impl<D> Clone for SharedDetector<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Detector> Detector for SharedDetector<D> {
    fn infer(&mut self, frame: &Mat) -> Result<Vec<Detection>> {
        let mut detector = self
            .inner
            .lock()
            .map_err(|_| anyhow!("shared detector lock poisoned"))?;
        detector.infer(frame)
    }
}

/// Pick the single tracked position for a frame.
///
/// Only the highest-confidence candidate is considered; it must score
/// strictly above `threshold` or the frame yields nothing.
pub fn extract_position(detections: &[Detection], threshold: f32) -> Option<Position> {
    let best = detections.iter().max_by(|a, b| {
        a.confidence
            .partial_cmp(&b.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;

    if best.confidence > threshold {
        Some(best.centroid())
    } else {
        None
    }
}
