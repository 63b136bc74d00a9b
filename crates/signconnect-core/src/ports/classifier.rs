//! Classifier port.

use crate::domain::{ClassPrediction, ClassifierError, KeypointVector};

/// A trained model mapping keypoint features to a class distribution.
///
/// Implementations are immutable after construction and shared across
/// concurrent requests.
pub trait SignClassifier: Send + Sync {
    /// Number of classes the model distinguishes.
    fn num_classes(&self) -> usize;

    /// Predicts from raw features.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::ShapeMismatch`] if `features` is not
    /// exactly 126 values long, or an inference error.
    fn predict_features(&self, features: &[f32]) -> Result<ClassPrediction, ClassifierError>;

    /// Predicts the arg-max class and its probability.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn predict(&self, vector: &KeypointVector) -> Result<ClassPrediction, ClassifierError> {
        self.predict_features(vector.as_slice())
    }
}
