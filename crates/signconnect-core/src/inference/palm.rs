//! `BlazePalm` palm detection.
//!
//! Runs MediaPipe's `palm_detection_full` graph exported to ONNX. The graph
//! takes a letterboxed 192x192 RGB image and scores 2016 SSD anchors: two per
//! cell on a 24x24 grid and six per cell on a 12x12 grid. Each anchor
//! regresses a palm box and seven palm keypoints (wrist, finger bases,
//! thumb).

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView, RgbImage};
use tracing::debug;

use super::onnx::{OnnxModel, OutputTensor};
use super::utils::{sigmoid, square_to_input};

/// Input image size for `BlazePalm`.
pub const INPUT_SIZE: usize = 192;

/// Anchors on the 24x24 map (2 per cell).
const ANCHORS_24: usize = 24 * 24 * 2;

/// Anchors on the 12x12 map (6 per cell).
const ANCHORS_12: usize = 12 * 12 * 6;

/// Number of anchor boxes (detections).
const NUM_ANCHORS: usize = ANCHORS_24 + ANCHORS_12;

/// Regression values per anchor: box (4) + 7 keypoints (14).
const NUM_COORDS: usize = 18;

/// Number of palm keypoints.
pub const NUM_KEYPOINTS: usize = 7;

/// Shape of the regressor output.
pub const BOXES_SHAPE: [i64; 3] = [1, NUM_ANCHORS as i64, NUM_COORDS as i64];

/// Shape of the score output (logits).
pub const SCORES_SHAPE: [i64; 3] = [1, NUM_ANCHORS as i64, 1];

/// Raw score clipping before the sigmoid.
const SCORE_CLIP: f32 = 100.0;

/// Non-maximum suppression IOU threshold.
const NMS_THRESHOLD: f32 = 0.3;

/// A detected palm with bounding box and keypoints, in coordinates
/// normalized to the original image.
#[derive(Debug, Clone)]
pub struct PalmDetection {
    /// Palm bounding box `[x_min, y_min, x_max, y_max]`.
    pub bbox: [f32; 4],
    /// Detection confidence score.
    pub score: f32,
    /// Seven keypoints `[x, y]`: wrist, index MCP, middle MCP, ring MCP,
    /// pinky MCP, thumb CMC, thumb MCP.
    pub keypoints: [[f32; 2]; NUM_KEYPOINTS],
}

impl PalmDetection {
    /// Wrist keypoint `[x, y]`.
    #[must_use]
    pub const fn wrist(&self) -> [f32; 2] {
        self.keypoints[0]
    }

    /// Middle finger MCP keypoint `[x, y]`.
    #[must_use]
    pub const fn middle_mcp(&self) -> [f32; 2] {
        self.keypoints[2]
    }
}

/// Raw palm graph outputs, picked out by shape.
#[derive(Debug)]
pub(crate) struct PalmOutputs {
    /// `NUM_ANCHORS * NUM_COORDS` regression values.
    boxes: Vec<f32>,
    /// `NUM_ANCHORS` score logits.
    scores: Vec<f32>,
}

impl PalmOutputs {
    /// Finds the regressor `[1, 2016, 18]` and score `[1, 2016, 1]` tensors.
    ///
    /// Output names differ between converters (`Identity`/`Identity_1` from
    /// tf2onnx, `regressors`/`classificators` elsewhere), so shapes decide.
    pub(crate) fn resolve(outputs: Vec<OutputTensor>) -> Result<Self> {
        let mut boxes = None;
        let mut scores = None;
        for tensor in outputs {
            if tensor.has_shape(&BOXES_SHAPE) && boxes.is_none() {
                boxes = Some(tensor.data);
            } else if tensor.has_shape(&SCORES_SHAPE) && scores.is_none() {
                scores = Some(tensor.data);
            } else {
                debug!("Ignoring palm output '{}' {:?}", tensor.name, tensor.shape);
            }
        }

        Ok(Self {
            boxes: boxes.context("Palm model has no [1, 2016, 18] regressor output")?,
            scores: scores.context("Palm model has no [1, 2016, 1] score output")?,
        })
    }
}

/// Mapping from the square, padded model input back to the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Letterbox {
    /// Side of the padded square, in source pixels.
    side: f32,
    pad_x: f32,
    pad_y: f32,
    width: f32,
    height: f32,
}

impl Letterbox {
    fn new(width: u32, height: u32) -> Self {
        let side = width.max(height);
        Self {
            side: side as f32,
            pad_x: ((side - width) / 2) as f32,
            pad_y: ((side - height) / 2) as f32,
            width: width as f32,
            height: height as f32,
        }
    }

    /// Left and top padding in whole pixels.
    fn offsets(&self) -> (i64, i64) {
        (self.pad_x as i64, self.pad_y as i64)
    }

    /// Maps a point normalized to the padded square to one normalized to the image.
    fn unpad(&self, p: [f32; 2]) -> [f32; 2] {
        [
            (p[0] * self.side - self.pad_x) / self.width,
            (p[1] * self.side - self.pad_y) / self.height,
        ]
    }
}

/// `BlazePalm` palm detection model.
pub struct BlazePalm {
    model: OnnxModel,
    anchors: Vec<[f32; 2]>,
}

impl BlazePalm {
    /// Loads the palm detection graph and checks its outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the graph does not
    /// produce the expected regressor and score tensors.
    pub fn load(path: &Path) -> Result<Self> {
        let model = OnnxModel::load(path, INPUT_SIZE)?;
        PalmOutputs::resolve(model.warm_up()?)
            .with_context(|| format!("Unexpected palm detection graph: {}", path.display()))?;

        Ok(Self {
            model,
            anchors: Self::generate_anchors(),
        })
    }

    /// Generates anchor centers for the two feature map scales.
    ///
    /// Anchors have a fixed unit size, so only the centers are stored.
    fn generate_anchors() -> Vec<[f32; 2]> {
        let mut anchors = Vec::with_capacity(NUM_ANCHORS);
        for (grid, per_cell) in [(24_u8, 2), (12_u8, 6)] {
            for y in 0..grid {
                for x in 0..grid {
                    let cx = (f32::from(x) + 0.5) / f32::from(grid);
                    let cy = (f32::from(y) + 0.5) / f32::from(grid);
                    anchors.extend(std::iter::repeat([cx, cy]).take(per_cell));
                }
            }
        }
        anchors
    }

    /// Letterboxes an image to a square and converts it to model input.
    ///
    /// # Returns
    /// NHWC pixels in `[0, 1]` and the mapping back to the source image.
    fn preprocess(image: &DynamicImage) -> (Vec<f32>, Letterbox) {
        let (width, height) = image.dimensions();
        let letterbox = Letterbox::new(width, height);

        let side = letterbox.side as u32;
        let (pad_x, pad_y) = letterbox.offsets();
        let mut square = RgbImage::new(side, side);
        image::imageops::overlay(&mut square, &image.to_rgb8(), pad_x, pad_y);

        (square_to_input(&square, INPUT_SIZE), letterbox)
    }

    /// Detects palms in an image.
    ///
    /// # Returns
    /// Detections above `min_score`, best first, after non-maximum suppression.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    pub fn detect(&self, image: &DynamicImage, min_score: f32) -> Result<Vec<PalmDetection>> {
        let (input, letterbox) = Self::preprocess(image);
        let outputs = PalmOutputs::resolve(self.model.run(input)?)?;

        let detections = decode_rows(&self.anchors, &outputs, min_score, &letterbox);
        Ok(nms(detections))
    }
}

/// Decodes raw network output into palm detections.
fn decode_rows(
    anchors: &[[f32; 2]],
    outputs: &PalmOutputs,
    min_score: f32,
    letterbox: &Letterbox,
) -> Vec<PalmDetection> {
    let input_size = INPUT_SIZE as f32;
    let mut detections = Vec::new();

    let rows = outputs.boxes.chunks_exact(NUM_COORDS);
    for ((anchor, &logit), raw) in anchors.iter().zip(&outputs.scores).zip(rows) {
        let score = sigmoid(logit.clamp(-SCORE_CLIP, SCORE_CLIP));
        if score < min_score {
            continue;
        }

        let cx = anchor[0] + raw[0] / input_size;
        let cy = anchor[1] + raw[1] / input_size;
        let w = raw[2] / input_size;
        let h = raw[3] / input_size;

        let min = letterbox.unpad([cx - w / 2.0, cy - h / 2.0]);
        let max = letterbox.unpad([cx + w / 2.0, cy + h / 2.0]);

        let mut keypoints = [[0.0f32; 2]; NUM_KEYPOINTS];
        for (k, kp) in keypoints.iter_mut().enumerate() {
            *kp = letterbox.unpad([
                anchor[0] + raw[4 + k * 2] / input_size,
                anchor[1] + raw[4 + k * 2 + 1] / input_size,
            ]);
        }

        detections.push(PalmDetection {
            bbox: [min[0], min[1], max[0], max[1]],
            score,
            keypoints,
        });
    }

    detections
}

/// Non-maximum suppression to remove overlapping detections.
///
/// Palm counts are tiny, so the quadratic loop is fine.
fn nms(mut detections: Vec<PalmDetection>) -> Vec<PalmDetection> {
    // Sort by score descending (NaN scores treated as equal)
    detections.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<PalmDetection> = Vec::new();
    for det in detections {
        if keep.iter().all(|k| iou(&k.bbox, &det.bbox) < NMS_THRESHOLD) {
            keep.push(det);
        }
    }
    keep
}

/// Intersection over Union for two bounding boxes.
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = (a[2] - a[0]) * (a[3] - a[1]) + (b[2] - b[0]) * (b[3] - b[1]) - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn det(bbox: [f32; 4], score: f32) -> PalmDetection {
        PalmDetection {
            bbox,
            score,
            keypoints: [[0.0; 2]; NUM_KEYPOINTS],
        }
    }

    fn tensor(name: &str, shape: &[i64]) -> OutputTensor {
        let len = shape.iter().product::<i64>() as usize;
        OutputTensor {
            name: name.to_string(),
            shape: shape.to_vec(),
            data: vec![0.0; len],
        }
    }

    fn outputs_with_one_palm(logit: f32) -> PalmOutputs {
        let mut boxes = vec![0.0; NUM_ANCHORS * NUM_COORDS];
        let mut scores = vec![-SCORE_CLIP; NUM_ANCHORS];
        // First anchor of the 12x12 grid, centre (1/24, 1/24) of the square
        let row = ANCHORS_24;
        scores[row] = logit;
        boxes[row * NUM_COORDS + 2] = 19.2; // w = 0.1
        boxes[row * NUM_COORDS + 3] = 19.2; // h = 0.1
        PalmOutputs { boxes, scores }
    }

    #[test]
    fn test_anchor_count() {
        let anchors = BlazePalm::generate_anchors();
        assert_eq!(anchors.len(), 2016);
        assert!((anchors[0][0] - 0.5 / 24.0).abs() < 1e-6);
        assert!((anchors[ANCHORS_24][0] - 0.5 / 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_resolve_tf2onnx_outputs() {
        let outputs = PalmOutputs::resolve(vec![
            tensor("Identity", &[1, 2016, 18]),
            tensor("Identity_1", &[1, 2016, 1]),
        ])
        .unwrap();
        assert_eq!(outputs.boxes.len(), 2016 * 18);
        assert_eq!(outputs.scores.len(), 2016);
    }

    #[test]
    fn test_resolve_ignores_output_order() {
        let outputs = PalmOutputs::resolve(vec![
            tensor("classificators", &[1, 2016, 1]),
            tensor("regressors", &[1, 2016, 18]),
        ])
        .unwrap();
        assert_eq!(outputs.scores.len(), 2016);
    }

    #[test]
    fn test_resolve_rejects_other_anchor_layouts() {
        // The older 256 px palm model has 2944 anchors
        let err = PalmOutputs::resolve(vec![
            tensor("Identity", &[1, 2944, 18]),
            tensor("Identity_1", &[1, 2944, 1]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("[1, 2016, 18]"));
    }

    #[test]
    fn test_decode_filters_by_score() {
        let letterbox = Letterbox::new(192, 192);
        let anchors = BlazePalm::generate_anchors();

        let kept = decode_rows(&anchors, &outputs_with_one_palm(5.0), 0.5, &letterbox);
        assert_eq!(kept.len(), 1);
        let [x0, y0, x1, y1] = kept[0].bbox;
        assert!((x0 - (1.0 / 24.0 - 0.05)).abs() < 1e-5);
        assert!((y1 - (1.0 / 24.0 + 0.05)).abs() < 1e-5);
        assert!(x1 > x0 && y1 > y0);
        assert!(kept[0].score > 0.99);

        let dropped = decode_rows(&anchors, &outputs_with_one_palm(-5.0), 0.5, &letterbox);
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = [0.0, 0.0, 0.5, 0.5];
        let b = [0.25, 0.25, 0.75, 0.75];
        let expected = 0.0625 / 0.4375;
        assert!((iou(&a, &b) - expected).abs() < 1e-6);
        assert!(iou(&a, &[0.6, 0.6, 1.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_best_of_overlapping() {
        let kept = nms(vec![
            det([0.0, 0.0, 0.5, 0.5], 0.6),
            det([0.01, 0.01, 0.5, 0.5], 0.9),
            det([0.6, 0.6, 0.9, 0.9], 0.7),
        ]);
        assert_eq!(kept.len(), 2);
        assert!((kept[0].score - 0.9).abs() < f32::EPSILON);
        assert!((kept[1].score - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_letterbox_unpad_wide_image() {
        // 200x100 is padded by 50 rows top and bottom
        let lb = Letterbox::new(200, 100);
        let p = lb.unpad([0.5, 0.25]);
        assert!((p[0] - 0.5).abs() < 1e-6);
        assert!(p[1].abs() < 1e-6);
        let p = lb.unpad([1.0, 0.75]);
        assert!((p[0] - 1.0).abs() < 1e-6);
        assert!((p[1] - 1.0).abs() < 1e-6);
    }
}
