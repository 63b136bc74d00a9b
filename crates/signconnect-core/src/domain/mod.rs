//! Core domain types for hand-pose sign recognition.

mod error;
mod keypoints;
mod labels;
mod manifest;
mod prediction;

pub use error::{ClassifierError, ExtractError, LabelMapError, TrainingError};
pub use keypoints::{
    pack, DetectedHand, Handedness, KeypointVector, Landmark, Packed, COORDS_PER_LANDMARK,
    HAND_SLOT_LEN, KEYPOINT_VECTOR_LEN, LANDMARKS_PER_HAND,
};
pub use labels::{LabelRegistry, UNKNOWN_LABEL};
pub use manifest::{sha256_file, TrainingManifest, TrainingMetrics, FEATURE_LAYOUT};
pub use prediction::{
    ClassPrediction, PredictionRecord, SignPrediction, ERROR_LABEL, NO_HAND_LABEL,
};
