// src/yolo.rs
//
// ONNX Runtime adapter for a single-output YOLO export ([1, 4 + classes, anchors]).

use crate::detection::{Detection, Detector};
use crate::types::ModelConfig;
use anyhow::{bail, Context, Result};
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};
use ort::{
    execution_providers::CUDAExecutionProvider,
    session::{builder::GraphOptimizationLevel, Session},
};
use tracing::{debug, info};

const PAD_VALUE: f64 = 114.0;

pub struct YoloDetector {
    session: Session,
    input_size: usize,
    input_name: String,
    candidate_threshold: f32,
    iou_threshold: f32,
}

impl YoloDetector {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        info!("Loading YOLO model: {}", config.path);

        let mut builder = Session::builder()?;
        if config.use_cuda {
            info!("Enabling CUDA execution provider");
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default().with_device_id(0).build()])?;
        }

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.num_threads)?
            .commit_from_file(&config.path)
            .with_context(|| format!("Failed to load model {}", config.path))?;

        info!("✓ YOLO detector initialized");
        Ok(Self {
            session,
            input_size: config.input_size,
            input_name: config.input_name.clone(),
            candidate_threshold: config.candidate_threshold,
            iou_threshold: config.iou_threshold,
        })
    }

    fn run(&mut self, input: Vec<f32>) -> Result<(Vec<usize>, Vec<f32>)> {
        let shape = [1, 3, self.input_size, self.input_size];
        let input_value =
            ort::value::Value::from_array((shape.as_slice(), input.into_boxed_slice()))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_value])?;
        let (output_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims = output_shape.iter().map(|&d| d as usize).collect();

        Ok((dims, data.to_vec()))
    }
}

impl Detector for YoloDetector {
    fn infer(&mut self, frame: &Mat) -> Result<Vec<Detection>> {
        let width = frame.cols() as usize;
        let height = frame.rows() as usize;
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }
        if frame.typ() != core::CV_8UC3 {
            bail!("expected an 8-bit BGR frame, got Mat type {}", frame.typ());
        }

        let letterbox = Letterbox::new(width, height, self.input_size);
        let input = letterbox.to_tensor(frame)?;
        let (dims, output) = self.run(input)?;

        let detections = decode_predictions(&output, &dims, &letterbox, self.candidate_threshold)?;
        let detections = nms(detections, self.iou_threshold);

        debug!("Detected {} candidates", detections.len());
        Ok(detections)
    }
}

/// Aspect-preserving resize into a square canvas, centered with padding.
/// Padding is whole pixels so placement and unmapping agree exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub src_w: usize,
    pub src_h: usize,
    pub target: usize,
    pub scale: f32,
    pub scaled_w: usize,
    pub scaled_h: usize,
    pub pad_x: usize,
    pub pad_y: usize,
}

impl Letterbox {
    pub fn new(src_w: usize, src_h: usize, target: usize) -> Self {
        let scale = (target as f32 / src_w as f32).min(target as f32 / src_h as f32);
        let scaled_w = ((src_w as f32 * scale).round() as usize).clamp(1, target);
        let scaled_h = ((src_h as f32 * scale).round() as usize).clamp(1, target);

        Self {
            src_w,
            src_h,
            target,
            scale,
            scaled_w,
            scaled_h,
            pad_x: (target - scaled_w) / 2,
            pad_y: (target - scaled_h) / 2,
        }
    }

    /// BGR frame -> normalized RGB CHW tensor data.
    pub fn to_tensor(&self, frame: &Mat) -> opencv::Result<Vec<f32>> {
        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            core::Size::new(self.scaled_w as i32, self.scaled_h as i32),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let right = self.target - self.scaled_w - self.pad_x;
        let bottom = self.target - self.scaled_h - self.pad_y;
        let mut canvas = Mat::default();
        core::copy_make_border(
            &resized,
            &mut canvas,
            self.pad_y as i32,
            bottom as i32,
            self.pad_x as i32,
            right as i32,
            core::BORDER_CONSTANT,
            core::Scalar::all(PAD_VALUE),
        )?;

        let plane = self.target * self.target;
        let mut input = vec![0.0f32; 3 * plane];
        for (i, bgr) in canvas.data_bytes()?.chunks_exact(3).enumerate() {
            input[i] = bgr[2] as f32 / 255.0;
            input[plane + i] = bgr[1] as f32 / 255.0;
            input[2 * plane + i] = bgr[0] as f32 / 255.0;
        }
        Ok(input)
    }

    /// Model-space box back to frame coordinates, clamped to the frame.
    pub fn unmap(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> [f32; 4] {
        let w = self.src_w as f32;
        let h = self.src_h as f32;
        let (pad_x, pad_y) = (self.pad_x as f32, self.pad_y as f32);
        [
            ((x1 - pad_x) / self.scale).clamp(0.0, w),
            ((y1 - pad_y) / self.scale).clamp(0.0, h),
            ((x2 - pad_x) / self.scale).clamp(0.0, w),
            ((y2 - pad_y) / self.scale).clamp(0.0, h),
        ]
    }
}

/// Decode a `[1, 4 + classes, anchors]` output. Each anchor column holds
/// `cx, cy, w, h` followed by one score per class.
pub fn decode_predictions(
    output: &[f32],
    dims: &[usize],
    letterbox: &Letterbox,
    conf_thresh: f32,
) -> Result<Vec<Detection>> {
    let (rows, anchors) = match dims {
        [1, rows, anchors] | [rows, anchors] => (*rows, *anchors),
        _ => bail!("unexpected YOLO output shape {:?}", dims),
    };
    if rows < 5 {
        bail!("YOLO output has {} rows, need at least 5", rows);
    }
    if output.len() < rows * anchors {
        bail!(
            "YOLO output too short: {} values for shape {:?}",
            output.len(),
            dims
        );
    }
    let classes = rows - 4;

    let mut detections = Vec::new();
    for i in 0..anchors {
        let mut best_conf = 0.0f32;
        let mut best_class = 0;
        for c in 0..classes {
            let conf = output[anchors * (4 + c) + i];
            if conf > best_conf {
                best_conf = conf;
                best_class = c;
            }
        }
        if best_conf < conf_thresh {
            continue;
        }

        let cx = output[i];
        let cy = output[anchors + i];
        let w = output[anchors * 2 + i];
        let h = output[anchors * 3 + i];

        detections.push(Detection {
            bbox: letterbox.unmap(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0),
            confidence: best_conf,
            class_id: best_class,
        });
    }

    Ok(detections)
}

pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    for det in detections {
        if keep.iter().all(|k| iou(&k.bbox, &det.bbox) < iou_threshold) {
            keep.push(det);
        }
    }
    keep
}

/// Intersection over union of two `[x1, y1, x2, y2]` boxes.
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let area = |r: &[f32; 4]| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);

    let overlap = area(&[a[0].max(b[0]), a[1].max(b[1]), a[2].min(b[2]), a[3].min(b[3])]);
    let union = area(a) + area(b) - overlap;
    if union > 0.0 {
        overlap / union
    } else {
        0.0
    }
}
