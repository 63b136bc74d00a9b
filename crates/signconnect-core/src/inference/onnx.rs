//! ONNX Runtime sessions for the hand tracking graphs.
//!
//! Both MediaPipe graphs take a single NHWC float image in `[0, 1]` and
//! return a handful of flat f32 tensors. This wrapper hides the session
//! lock and hands outputs back in the order the graph declares them.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Context, Result};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::debug;

/// One output tensor copied out of a session run.
#[derive(Debug, Clone)]
pub struct OutputTensor {
    pub name: String,
    pub shape: Vec<i64>,
    pub data: Vec<f32>,
}

impl OutputTensor {
    /// Returns true if the tensor has exactly this shape.
    #[must_use]
    pub fn has_shape(&self, shape: &[i64]) -> bool {
        self.shape == shape
    }
}

/// A loaded ONNX graph with one square RGB input.
pub struct OnnxModel {
    session: Mutex<Session>,
    input_name: String,
    output_names: Vec<String>,
    input_size: usize,
}

impl OnnxModel {
    /// Loads a graph whose input is `[1, input_size, input_size, 3]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or ONNX Runtime rejects it.
    pub fn load(path: &Path, input_size: usize) -> Result<Self> {
        if !path.is_file() {
            bail!("Model file not found: {}", path.display());
        }

        debug!("Loading ONNX model from {}", path.display());
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load ONNX model: {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .with_context(|| format!("ONNX model has no input: {}", path.display()))?;
        let output_names: Vec<String> = session
            .outputs
            .iter()
            .map(|output| output.name.clone())
            .collect();

        debug!("Input '{}', outputs {:?}", input_name, output_names);

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_names,
            input_size,
        })
    }

    /// Side length of the square input.
    #[must_use]
    pub const fn input_size(&self) -> usize {
        self.input_size
    }

    /// Runs the graph on NHWC pixels and copies every output out.
    ///
    /// # Errors
    ///
    /// Returns an error if the input has the wrong length or inference fails.
    pub fn run(&self, pixels: Vec<f32>) -> Result<Vec<OutputTensor>> {
        let side = self.input_size;
        if pixels.len() != side * side * 3 {
            bail!(
                "Input holds {} values, expected {}",
                pixels.len(),
                side * side * 3
            );
        }

        let input = Tensor::from_array((vec![1_usize, side, side, 3], pixels))?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .context("ONNX inference failed")?;

        let mut tensors = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let (shape, data) = outputs[name.as_str()]
                .try_extract_tensor::<f32>()
                .with_context(|| format!("Output '{name}' is not an f32 tensor"))?;
            tensors.push(OutputTensor {
                name: name.clone(),
                shape: shape.iter().copied().collect(),
                data: data.to_vec(),
            });
        }
        Ok(tensors)
    }

    /// Runs the graph once on a black image.
    ///
    /// Used at load time to learn the real output shapes.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    pub fn warm_up(&self) -> Result<Vec<OutputTensor>> {
        let side = self.input_size;
        self.run(vec![0.0; side * side * 3])
    }
}
