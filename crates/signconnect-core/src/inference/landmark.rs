//! Hand landmark regression model.
//!
//! Runs MediaPipe's `hand_landmark_full` graph exported to ONNX on a square
//! crop around a detected palm. The graph returns the 21 hand landmarks in
//! crop pixels, a hand presence score, a handedness score and world
//! landmarks (unused here).

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView, RgbImage};
use tracing::debug;

use super::onnx::{OnnxModel, OutputTensor};
use super::utils::square_to_input;
use crate::domain::{COORDS_PER_LANDMARK, HAND_SLOT_LEN, LANDMARKS_PER_HAND};

/// Input size of the landmark crop.
pub const INPUT_SIZE: usize = 224;

/// Shape of the screen and world landmark outputs.
pub const LANDMARKS_SHAPE: [i64; 2] = [1, HAND_SLOT_LEN as i64];

/// Shape of the presence and handedness outputs.
pub const SCORE_SHAPE: [i64; 2] = [1, 1];

/// Square region of the source image the landmark model looks at, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandRoi {
    /// Left edge (may be negative or beyond the image).
    pub x: f32,
    /// Top edge (may be negative or beyond the image).
    pub y: f32,
    /// Side length.
    pub size: f32,
}

/// Raw landmark model output for one crop.
#[derive(Debug, Clone)]
pub struct HandLandmarks {
    /// Landmarks `[x, y, z]` normalized to the crop (z on the x scale).
    pub points: [[f32; 3]; LANDMARKS_PER_HAND],
    /// Probability that the crop contains a hand.
    pub presence: f32,
    /// Probability that the hand is a right hand.
    pub right_score: f32,
}

impl HandLandmarks {
    /// Picks the landmark graph outputs apart.
    ///
    /// The graph declares screen landmarks before world landmarks and the
    /// presence score before handedness, so among tensors of equal shape
    /// the first one wins. Both scores are already probabilities.
    pub(crate) fn from_outputs(outputs: &[OutputTensor]) -> Result<Self> {
        let raw = outputs
            .iter()
            .find(|t| t.has_shape(&LANDMARKS_SHAPE))
            .context("Landmark model has no [1, 63] landmark output")?;

        let mut scores = outputs.iter().filter(|t| t.has_shape(&SCORE_SHAPE));
        let presence = scores
            .next()
            .context("Landmark model has no [1, 1] presence output")?;
        let handedness = scores
            .next()
            .context("Landmark model has no [1, 1] handedness output")?;

        debug!(
            "Landmark outputs: landmarks '{}', presence '{}', handedness '{}'",
            raw.name, presence.name, handedness.name
        );

        let input_size = INPUT_SIZE as f32;
        let mut points = [[0.0f32; 3]; LANDMARKS_PER_HAND];
        for (point, chunk) in points
            .iter_mut()
            .zip(raw.data.chunks_exact(COORDS_PER_LANDMARK))
        {
            *point = [
                chunk[0] / input_size,
                chunk[1] / input_size,
                chunk[2] / input_size,
            ];
        }

        Ok(Self {
            points,
            presence: presence.data[0],
            right_score: handedness.data[0],
        })
    }

    /// Maps the crop-relative landmarks to coordinates normalized to the image.
    ///
    /// `x` and `z` are normalized by image width, `y` by image height.
    #[must_use]
    pub fn to_image(&self, roi: &HandRoi, width: u32, height: u32) -> [[f32; 3]; LANDMARKS_PER_HAND] {
        let (w, h) = (width as f32, height as f32);
        self.points.map(|[x, y, z]| {
            [
                (roi.x + x * roi.size) / w,
                (roi.y + y * roi.size) / h,
                z * roi.size / w,
            ]
        })
    }
}

/// Hand landmark regression model.
pub struct HandLandmarkModel {
    model: OnnxModel,
}

impl HandLandmarkModel {
    /// Loads the landmark graph and checks its outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the graph does not
    /// produce landmark, presence and handedness tensors.
    pub fn load(path: &Path) -> Result<Self> {
        let model = OnnxModel::load(path, INPUT_SIZE)?;
        HandLandmarks::from_outputs(&model.warm_up()?)
            .with_context(|| format!("Unexpected hand landmark graph: {}", path.display()))?;
        Ok(Self { model })
    }

    /// Crops a hand region and converts it to model input.
    ///
    /// Parts of the region outside the image are filled with black.
    #[must_use]
    pub fn preprocess(image: &DynamicImage, roi: &HandRoi) -> Vec<f32> {
        let side = roi.size.round().max(1.0) as u32;
        let (x0, y0) = (roi.x.round() as i64, roi.y.round() as i64);
        let (img_w, img_h) = image.dimensions();

        // Intersection of the region with the image
        let ix0 = x0.clamp(0, i64::from(img_w));
        let iy0 = y0.clamp(0, i64::from(img_h));
        let ix1 = (x0 + i64::from(side)).clamp(0, i64::from(img_w));
        let iy1 = (y0 + i64::from(side)).clamp(0, i64::from(img_h));

        let mut canvas = RgbImage::new(side, side);
        if ix1 > ix0 && iy1 > iy0 {
            let visible = image
                .crop_imm(ix0 as u32, iy0 as u32, (ix1 - ix0) as u32, (iy1 - iy0) as u32)
                .to_rgb8();
            image::imageops::overlay(&mut canvas, &visible, ix0 - x0, iy0 - y0);
        }

        square_to_input(&canvas, INPUT_SIZE)
    }

    /// Crops the region and regresses its landmarks.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    pub fn landmarks(&self, image: &DynamicImage, roi: &HandRoi) -> Result<HandLandmarks> {
        let input = Self::preprocess(image, roi);
        HandLandmarks::from_outputs(&self.model.run(input)?)
    }
}
