//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external adapters.

mod classifier;
mod corpus_source;
mod hand_detector;
mod progress;
mod result_output;

pub use classifier::SignClassifier;
pub use corpus_source::{CorpusSource, LabeledImage};
pub use hand_detector::{DetectionOptions, HandDetector};
pub use progress::{NoProgress, ProgressEvent, ProgressSink};
pub use result_output::ResultOutput;
