//! Hand detector port.

use std::collections::BTreeMap;

use image::DynamicImage;

use crate::domain::DetectedHand;

/// Per-call detection settings.
///
/// Detection is always static-image: every call is independent and no
/// tracking state is carried between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionOptions {
    /// Maximum number of hands to return.
    pub max_hands: usize,
    /// Minimum palm detection and hand presence confidence (0.0 to 1.0).
    pub min_detection_confidence: f32,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            max_hands: 2,
            min_detection_confidence: 0.5,
        }
    }
}

/// Port for finding hand landmarks in a decoded image.
pub trait HandDetector: Send + Sync {
    /// Detects up to `options.max_hands` hands, in detection order.
    ///
    /// An image without hands yields an empty vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the detector fails internally.
    fn detect(
        &self,
        image: &DynamicImage,
        options: &DetectionOptions,
    ) -> anyhow::Result<Vec<DetectedHand>>;

    /// Identifies the detector weights (file name to SHA-256), used to check
    /// that serving runs the detector the model was trained with.
    fn checksums(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}
