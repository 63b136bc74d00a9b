//! Progress reporting port for the training pipeline.

use crate::domain::TrainingMetrics;

/// Events emitted while training.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Feature extraction started for an image.
    Started {
        /// Path to the image.
        path: String,
        /// Index in the corpus (0-based).
        index: usize,
        /// Total images in the corpus, if known.
        total: Option<usize>,
    },
    /// Features were extracted from an image.
    Extracted {
        /// Path to the image.
        path: String,
        /// Whether any hand was found (empty vectors are discarded).
        has_hand: bool,
    },
    /// An image was skipped due to an error.
    Skipped {
        /// Path to the image.
        path: String,
        /// Reason for skipping.
        reason: String,
    },
    /// A training epoch finished.
    Epoch {
        /// Epoch number (1-based).
        epoch: usize,
        /// Total epochs.
        epochs: usize,
        /// Metrics after this epoch.
        metrics: TrainingMetrics,
    },
    /// Training finished and artifacts were written.
    Finished {
        /// Samples used for training and validation.
        samples: usize,
        /// Images skipped due to errors.
        skipped: usize,
        /// Images without a detectable hand.
        no_hand: usize,
    },
}

/// Port for receiving progress events.
pub trait ProgressSink: Send + Sync {
    /// Called when a progress event occurs.
    fn on_event(&self, event: ProgressEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_event(&self, _event: ProgressEvent) {}
}
