//! Two-stage hand tracker.
//!
//! Finds hands with MediaPipe's two graphs, run through ONNX Runtime:
//! - `BlazePalm` for palm detection and palm keypoints
//! - the landmark model for 21 landmarks, presence and handedness on a
//!   crop around each palm

// Allow common ML/image code patterns
#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use tracing::{debug, warn};

use super::landmark::{HandLandmarkModel, HandRoi};
use super::palm::{BlazePalm, PalmDetection};
use crate::domain::{sha256_file, DetectedHand, Handedness, Landmark};
use crate::ports::{DetectionOptions, HandDetector};

/// Palm box enlargement for the landmark crop.
const ROI_SCALE: f32 = 2.6;

/// Shift of the crop centre towards the fingers, in palm box sizes.
const ROI_SHIFT: f32 = 0.5;

/// Handedness score above which a hand is reported as `Right`.
const RIGHT_HAND_THRESHOLD: f32 = 0.5;

/// Computes the square landmark crop for a palm, in pixels.
///
/// The crop is the palm box enlarged by [`ROI_SCALE`] and moved along the
/// wrist to middle-finger direction so the whole hand fits.
#[must_use]
pub fn palm_roi(palm: &PalmDetection, width: u32, height: u32) -> HandRoi {
    let (w, h) = (width as f32, height as f32);
    let [x0, y0, x1, y1] = palm.bbox;
    let box_size = ((x1 - x0) * w).max((y1 - y0) * h);

    let [wx, wy] = palm.wrist();
    let [mx, my] = palm.middle_mcp();
    let (dx, dy) = ((mx - wx) * w, (my - wy) * h);
    let len = dx.hypot(dy);
    let (ux, uy) = if len > f32::EPSILON {
        (dx / len, dy / len)
    } else {
        (0.0, -1.0)
    };

    let cx = (x0 + x1) / 2.0 * w + ux * ROI_SHIFT * box_size;
    let cy = (y0 + y1) / 2.0 * h + uy * ROI_SHIFT * box_size;
    let size = box_size * ROI_SCALE;

    HandRoi {
        x: cx - size / 2.0,
        y: cy - size / 2.0,
        size,
    }
}

/// Hand tracker backed by `BlazePalm` and the landmark model.
pub struct HandTracker {
    palm: BlazePalm,
    landmarks: HandLandmarkModel,
    checksums: BTreeMap<String, String>,
}

impl HandTracker {
    /// Loads both ONNX graphs.
    ///
    /// # Errors
    ///
    /// Returns an error if either file is missing, cannot be parsed, or
    /// does not have the expected outputs.
    pub fn load(palm_path: &Path, landmark_path: &Path) -> Result<Self> {
        debug!("Loading BlazePalm from {}", palm_path.display());
        let palm = BlazePalm::load(palm_path).context("Failed to load palm detection model")?;

        debug!("Loading hand landmark model from {}", landmark_path.display());
        let landmarks =
            HandLandmarkModel::load(landmark_path).context("Failed to load hand landmark model")?;

        let mut checksums = BTreeMap::new();
        for path in [palm_path, landmark_path] {
            let name = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
            checksums.insert(name, sha256_file(path)?);
        }

        Ok(Self {
            palm,
            landmarks,
            checksums,
        })
    }

    fn track(&self, image: &DynamicImage, options: &DetectionOptions) -> Result<Vec<DetectedHand>> {
        let (width, height) = image.dimensions();
        let palms = self
            .palm
            .detect(image, options.min_detection_confidence)
            .context("Palm detection failed")?;

        debug!("Found {} palms", palms.len());

        let mut hands = Vec::new();
        for palm in palms {
            if hands.len() >= options.max_hands {
                break;
            }

            let roi = palm_roi(&palm, width, height);
            let raw = match self.landmarks.landmarks(image, &roi) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Failed to regress hand landmarks: {}", e);
                    continue;
                }
            };

            if raw.presence < options.min_detection_confidence {
                debug!("Skipping low-presence hand: {:.2}", raw.presence);
                continue;
            }

            let handedness = if raw.right_score > RIGHT_HAND_THRESHOLD {
                Handedness::Right
            } else {
                Handedness::Left
            };
            let landmarks = raw
                .to_image(&roi, width, height)
                .map(|[x, y, z]| Landmark::new(x, y, z));

            debug!(
                "Hand at {:?}: {} (palm {:.2}, presence {:.2})",
                palm.bbox, handedness, palm.score, raw.presence
            );

            hands.push(DetectedHand {
                landmarks,
                handedness,
                score: raw.presence,
            });
        }

        Ok(hands)
    }
}

impl HandDetector for HandTracker {
    fn detect(
        &self,
        image: &DynamicImage,
        options: &DetectionOptions,
    ) -> anyhow::Result<Vec<DetectedHand>> {
        self.track(image, options)
    }

    fn checksums(&self) -> BTreeMap<String, String> {
        self.checksums.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palm(bbox: [f32; 4], wrist: [f32; 2], middle: [f32; 2]) -> PalmDetection {
        let mut keypoints = [[0.0; 2]; 7];
        keypoints[0] = wrist;
        keypoints[2] = middle;
        PalmDetection {
            bbox,
            score: 0.9,
            keypoints,
        }
    }

    #[test]
    fn test_roi_is_scaled_and_shifted_towards_fingers() {
        // 100 px palm centred at (200, 200), fingers pointing up
        let det = palm([0.375, 0.375, 0.625, 0.625], [0.5, 0.6], [0.5, 0.4]);
        let roi = palm_roi(&det, 400, 400);

        assert!((roi.size - 260.0).abs() < 1e-3);
        let cx = roi.x + roi.size / 2.0;
        let cy = roi.y + roi.size / 2.0;
        assert!((cx - 200.0).abs() < 1e-3);
        assert!((cy - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_roi_uses_longer_box_side_in_pixels() {
        // Normalized square box on a wide image is wider than tall in pixels
        let det = palm([0.4, 0.4, 0.6, 0.6], [0.5, 0.5], [0.5, 0.5]);
        let roi = palm_roi(&det, 800, 400);
        assert!((roi.size - 160.0 * ROI_SCALE).abs() < 1e-3);
    }

    #[test]
    fn test_load_missing_weights_fails() {
        let err = HandTracker::load(
            Path::new("/nonexistent/palm_detection.onnx"),
            Path::new("/nonexistent/hand_landmark.onnx"),
        )
        .err()
        .map(|e| format!("{e:#}"));
        assert!(err.is_some_and(|e| e.contains("palm detection")));
    }
}
