//! Sign classifier: a small MLP over keypoint vectors.
//!
//! Architecture: 126 -> Dense(128, relu) -> Dense(64, relu) -> Dense(N).
//! Softmax is applied at prediction time; training works on the logits.

use std::path::Path;

use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{linear, Linear, VarBuilder};
use tracing::debug;

use super::loader::load_safetensors;
use crate::domain::{ClassPrediction, ClassifierError, KEYPOINT_VECTOR_LEN};
use crate::ports::SignClassifier;

/// Width of the first hidden layer.
pub const HIDDEN_1: usize = 128;

/// Width of the second hidden layer.
pub const HIDDEN_2: usize = 64;

/// Feed-forward classifier over packed hand keypoints.
pub struct GestureClassifier {
    fc1: Linear,
    fc2: Linear,
    fc3: Linear,
    num_classes: usize,
    device: Device,
}

impl GestureClassifier {
    /// Creates the network from a `VarBuilder`.
    ///
    /// With a `VarMap`-backed builder this creates fresh trainable variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights are missing or have the wrong shape.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(vb: VarBuilder, num_classes: usize) -> candle_core::Result<Self> {
        let device = vb.device().clone();
        let fc1 = linear(KEYPOINT_VECTOR_LEN, HIDDEN_1, vb.pp("fc1"))?;
        let fc2 = linear(HIDDEN_1, HIDDEN_2, vb.pp("fc2"))?;
        let fc3 = linear(HIDDEN_2, num_classes, vb.pp("fc3"))?;

        Ok(Self {
            fc1,
            fc2,
            fc3,
            num_classes,
            device,
        })
    }

    /// Loads trained weights from a safetensors file.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::ModelLoad`] if the file cannot be read or
    /// does not describe a network with `num_classes` outputs.
    pub fn load(path: &Path, num_classes: usize, device: &Device) -> Result<Self, ClassifierError> {
        debug!("Loading sign classifier from {}", path.display());
        let vb = load_safetensors(path, device).map_err(ClassifierError::ModelLoad)?;
        Self::new(vb, num_classes).map_err(|e| {
            ClassifierError::ModelLoad(
                anyhow::Error::new(e).context(format!("Invalid classifier weights: {}", path.display())),
            )
        })
    }

    /// Returns the softmax probabilities for a batch of shape `(n, 126)`.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    pub fn probabilities(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        candle_nn::ops::softmax_last_dim(&self.forward(xs)?)
    }
}

impl Module for GestureClassifier {
    /// Returns the logits.
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = self.fc1.forward(xs)?.relu()?;
        let xs = self.fc2.forward(&xs)?.relu()?;
        self.fc3.forward(&xs)
    }
}

impl SignClassifier for GestureClassifier {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict_features(&self, features: &[f32]) -> Result<ClassPrediction, ClassifierError> {
        if features.len() != KEYPOINT_VECTOR_LEN {
            return Err(ClassifierError::ShapeMismatch {
                expected: KEYPOINT_VECTOR_LEN,
                actual: features.len(),
            });
        }

        let xs = Tensor::from_slice(features, (1, KEYPOINT_VECTOR_LEN), &self.device)?
            .to_dtype(DType::F32)?;
        let probs = self.probabilities(&xs)?.squeeze(0)?;
        let class_index = probs.argmax(D::Minus1)?.to_scalar::<u32>()? as usize;
        let confidence = probs.to_vec1::<f32>()?[class_index];

        Ok(ClassPrediction {
            class_index,
            confidence,
        })
    }
}
