//! Landmark extractor: image bytes to keypoint vector.
//!
//! Serving and training both go through [`LandmarkExtractor`] with the same
//! [`ExtractorConfig`], so the features a model sees at inference time are
//! produced exactly like the ones it was trained on.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{pack, ExtractError, KeypointVector, Packed};
use crate::ports::{DetectionOptions, HandDetector};

/// Feature extraction settings shared by training and serving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Flip the image horizontally before detection.
    ///
    /// Front-facing cameras deliver a mirrored view; flipping it back makes
    /// the subject's right hand come out as `Right`.
    pub mirror: bool,
    /// Maximum number of hands to detect.
    pub max_hands: usize,
    /// Minimum detection confidence (0.0 to 1.0).
    pub min_detection_confidence: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        let detection = DetectionOptions::default();
        Self {
            mirror: true,
            max_hands: detection.max_hands,
            min_detection_confidence: detection.min_detection_confidence,
        }
    }
}

impl ExtractorConfig {
    /// Returns the detector options for this configuration.
    #[must_use]
    pub const fn detection_options(&self) -> DetectionOptions {
        DetectionOptions {
            max_hands: self.max_hands,
            min_detection_confidence: self.min_detection_confidence,
        }
    }
}

/// Turns images into [`KeypointVector`]s using a [`HandDetector`].
pub struct LandmarkExtractor {
    detector: Box<dyn HandDetector>,
    config: ExtractorConfig,
}

impl LandmarkExtractor {
    #[must_use]
    pub fn new(detector: Box<dyn HandDetector>, config: ExtractorConfig) -> Self {
        Self { detector, config }
    }

    #[must_use]
    pub const fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Returns the underlying detector.
    #[must_use]
    pub fn detector(&self) -> &dyn HandDetector {
        self.detector.as_ref()
    }

    /// Decodes raw image bytes and extracts their keypoint vector.
    ///
    /// A valid image without hands yields the all-zero vector.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Decode`] if the bytes are not a decodable
    /// image and [`ExtractError::Detection`] if the detector fails.
    pub fn extract(&self, image_bytes: &[u8]) -> Result<KeypointVector, ExtractError> {
        let image = image::load_from_memory(image_bytes)?;
        self.extract_image(&image)
    }

    /// Extracts the keypoint vector of an already decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Detection`] if the detector fails.
    pub fn extract_image(&self, image: &DynamicImage) -> Result<KeypointVector, ExtractError> {
        self.extract_packed(image).map(|packed| packed.vector)
    }

    /// Like [`Self::extract_image`], but keeps the packing diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Detection`] if the detector fails.
    pub fn extract_packed(&self, image: &DynamicImage) -> Result<Packed, ExtractError> {
        let mirrored;
        let input = if self.config.mirror {
            mirrored = image.fliph();
            &mirrored
        } else {
            image
        };

        let mut hands = self
            .detector
            .detect(input, &self.config.detection_options())
            .map_err(ExtractError::Detection)?;
        hands.truncate(self.config.max_hands);

        let packed = pack(&hands);
        debug!(
            "Detected {} hand(s): {:?}",
            hands.len(),
            hands.iter().map(|h| h.handedness).collect::<Vec<_>>()
        );
        if packed.has_collision() {
            debug!(
                "BothHandsSameLabel: {:?} reported more than once, keeping the last detection",
                packed.collisions
            );
        }

        Ok(packed)
    }
}
