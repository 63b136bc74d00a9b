//! Response shapes returned by the inference entry point.

use serde::{Deserialize, Serialize};

/// Sentinel label for failures on the service side.
pub const ERROR_LABEL: &str = "Error";

/// Sentinel label for frames without a usable hand.
pub const NO_HAND_LABEL: &str = "No Hand";

/// Raw classifier output: arg-max class and its softmax probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassPrediction {
    pub class_index: usize,
    pub confidence: f32,
}

/// Response of the inference entry point.
///
/// Always well formed: failures are reported through sentinel labels with
/// zero confidence rather than as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignPrediction {
    /// Predicted label, or one of the sentinels `"Error"`, `"No Hand"`, `"Unknown"`.
    pub label: String,
    /// Softmax probability of the predicted label (0.0 for sentinels).
    pub confidence: f32,
    /// Human-readable status.
    pub message: String,
}

impl SignPrediction {
    /// A successful prediction.
    #[must_use]
    pub fn recognized(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
            message: "Real-time AI Prediction".into(),
        }
    }

    /// The classifier picked a class the label map does not know.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            label: super::UNKNOWN_LABEL.into(),
            confidence: 0.0,
            message: "Predicted class is not in the label map.".into(),
        }
    }

    /// The classifier artifacts were not loaded at startup.
    #[must_use]
    pub fn model_not_loaded() -> Self {
        Self::error("Model not loaded.")
    }

    /// The hand tracking models were not loaded at startup.
    #[must_use]
    pub fn tracker_not_loaded() -> Self {
        Self::error("Hand tracker not loaded.")
    }

    /// A service-side failure.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            label: ERROR_LABEL.into(),
            confidence: 0.0,
            message: message.into(),
        }
    }

    /// The image decoded but contained no hand.
    #[must_use]
    pub fn no_hand() -> Self {
        Self::without_hand("No hand detected.")
    }

    /// The image bytes could not be decoded.
    #[must_use]
    pub fn undecodable() -> Self {
        Self::without_hand("Could not decode image.")
    }

    /// The hand detector failed on this image.
    #[must_use]
    pub fn detection_failed() -> Self {
        Self::without_hand("Hand detection failed.")
    }

    fn without_hand(message: &str) -> Self {
        Self {
            label: NO_HAND_LABEL.into(),
            confidence: 0.0,
            message: message.into(),
        }
    }

    /// Returns true for any sentinel response.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.confidence == 0.0
            && (self.label == ERROR_LABEL
                || self.label == NO_HAND_LABEL
                || self.label == super::UNKNOWN_LABEL)
    }
}

/// A prediction tagged with the image it was made for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Path of the image.
    pub path: String,
    #[serde(flatten)]
    pub prediction: SignPrediction,
}
