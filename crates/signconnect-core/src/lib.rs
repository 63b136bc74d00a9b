//! SignConnect Core - hand-pose sign recognition
//!
//! This crate contains the domain types, the landmark extractor and feature
//! packing, the ONNX hand tracker, the candle sign classifier, the training
//! pipeline, and the [`SignService`] serving entry point.

pub mod artifacts;
pub mod domain;
pub mod extractor;
pub mod inference;
pub mod ports;
pub mod service;
pub mod training;

pub use artifacts::ArtifactPaths;
pub use domain::{
    pack, ClassPrediction, ClassifierError, DetectedHand, ExtractError, Handedness,
    KeypointVector, LabelMapError, LabelRegistry, Landmark, PredictionRecord, SignPrediction,
    TrainingError, TrainingManifest, TrainingMetrics,
};
pub use extractor::{ExtractorConfig, LandmarkExtractor};
pub use ports::{
    CorpusSource, DetectionOptions, HandDetector, LabeledImage, NoProgress, ProgressEvent,
    ProgressSink, ResultOutput, SignClassifier,
};
pub use service::{LoadedModel, SignService};
pub use training::{Trainer, TrainingConfig, TrainingReport};
