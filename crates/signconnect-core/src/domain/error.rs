//! Error taxonomy for the recognition and training pipeline.
//!
//! "No hand detected" is not an error: a valid image without hands
//! yields an all-zero [`super::KeypointVector`].

use thiserror::Error;

/// Failure to turn an image into a keypoint vector.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The bytes do not form an image we can decode.
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The hand detector failed internally.
    #[error("hand detection failed: {0:#}")]
    Detection(anyhow::Error),
}

/// Failure in the classifier interface.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// A feature vector of the wrong length reached the classifier.
    #[error("invalid feature size: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The model artifact is missing, corrupt, or does not match the label map.
    #[error("failed to load model: {0:#}")]
    ModelLoad(anyhow::Error),

    /// The forward pass failed.
    #[error("inference failed: {0}")]
    Inference(#[from] candle_core::Error),
}

/// A persisted label map that is not a dense bijection.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LabelMapError {
    #[error("class index {index} is outside 0..{len}")]
    NotContiguous { index: usize, len: usize },

    #[error("class index {index} is used by both '{first}' and '{second}'")]
    DuplicateIndex {
        index: usize,
        first: String,
        second: String,
    },
}

/// Fatal training failures. Per-image problems are logged and skipped.
#[derive(Error, Debug)]
pub enum TrainingError {
    /// No image in the corpus produced a usable (non-empty) keypoint vector.
    #[error("no usable samples: scanned {scanned} images, none contained a detectable hand")]
    EmptyCorpus { scanned: usize },

    /// Invalid hyper-parameters.
    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    /// Model fitting failed.
    #[error("training failed: {0}")]
    Fit(#[from] candle_core::Error),

    /// Writing artifacts failed.
    #[error("failed to persist artifacts: {0:#}")]
    Persist(anyhow::Error),
}
