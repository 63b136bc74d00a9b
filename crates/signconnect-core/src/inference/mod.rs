//! Model inference.
//!
//! - hand tracking: MediaPipe palm detection and hand landmark graphs
//!   through ONNX Runtime
//! - the MLP sign classifier, built and trained with Candle

mod classifier;
mod device;
mod landmark;
mod loader;
mod onnx;
mod palm;
mod tracker;
mod utils;

pub use classifier::{GestureClassifier, HIDDEN_1, HIDDEN_2};
pub use device::get_device;
pub use landmark::{HandLandmarkModel, HandLandmarks, HandRoi};
pub use loader::load_safetensors;
pub use onnx::{OnnxModel, OutputTensor};
pub use palm::{BlazePalm, PalmDetection};
pub use tracker::{palm_roi, HandTracker};
