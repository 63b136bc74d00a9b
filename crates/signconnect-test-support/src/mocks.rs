//! Mock implementations of core port traits.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use image::DynamicImage;
use signconnect_core::domain::{
    ClassPrediction, ClassifierError, DetectedHand, PredictionRecord, KEYPOINT_VECTOR_LEN,
};
use signconnect_core::ports::{
    DetectionOptions, HandDetector, ProgressEvent, ProgressSink, ResultOutput, SignClassifier,
};

use crate::builders::HandBuilder;

type DetectFn = dyn Fn(&DynamicImage) -> anyhow::Result<Vec<DetectedHand>> + Send + Sync;

/// Mock implementation of `HandDetector` for testing.
///
/// Returns canned hands (or a canned failure).
pub struct MockHandDetector {
    detect: Box<DetectFn>,
    checksums: BTreeMap<String, String>,
}

impl MockHandDetector {
    /// Creates a detector from a closure.
    #[must_use]
    pub fn from_fn(
        f: impl Fn(&DynamicImage) -> anyhow::Result<Vec<DetectedHand>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            detect: Box::new(f),
            checksums: BTreeMap::new(),
        }
    }

    /// Returns the same hands for every image.
    #[must_use]
    pub fn fixed(hands: Vec<DetectedHand>) -> Self {
        Self::from_fn(move |_| Ok(hands.clone()))
    }

    /// Never finds a hand.
    #[must_use]
    pub fn no_hands() -> Self {
        Self::fixed(vec![])
    }

    /// Fails on every image.
    #[must_use]
    pub fn failing(message: &'static str) -> Self {
        Self::from_fn(move |_| Err(anyhow::anyhow!(message)))
    }

    /// Derives a right hand from the colour of pixel (0, 0).
    ///
    /// Black images have no hand; otherwise the landmarks are spread around
    /// `(r, g)` scaled to `[0, 1]`, with depth `b`. Images of one colour all
    /// produce the same keypoint vector, which makes labeled corpora easy to
    /// build from solid-colour images.
    #[must_use]
    pub fn color_coded() -> Self {
        Self::from_fn(|image| {
            let [r, g, b] = image.to_rgb8().get_pixel(0, 0).0;
            if [r, g, b] == [0, 0, 0] {
                return Ok(vec![]);
            }
            let scale = |c: u8| f32::from(c) / 255.0;
            Ok(vec![HandBuilder::right()
                .at(scale(r), scale(g))
                .depth(-scale(b))
                .build()])
        })
    }

    /// Sets the weight checksums the detector reports.
    #[must_use]
    pub fn with_checksums(mut self, checksums: BTreeMap<String, String>) -> Self {
        self.checksums = checksums;
        self
    }
}

impl HandDetector for MockHandDetector {
    fn detect(
        &self,
        image: &DynamicImage,
        options: &DetectionOptions,
    ) -> anyhow::Result<Vec<DetectedHand>> {
        let mut hands = (self.detect)(image)?;
        hands.truncate(options.max_hands);
        Ok(hands)
    }

    fn checksums(&self) -> BTreeMap<String, String> {
        self.checksums.clone()
    }
}

/// Mock implementation of `SignClassifier` for testing.
///
/// Returns a canned prediction and captures the features it was given.
pub struct MockSignClassifier {
    num_classes: usize,
    result: Result<ClassPrediction, &'static str>,
    seen: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl MockSignClassifier {
    /// Always predicts `class_index` with `confidence`.
    #[must_use]
    pub fn fixed(num_classes: usize, class_index: usize, confidence: f32) -> Self {
        Self {
            num_classes,
            result: Ok(ClassPrediction {
                class_index,
                confidence,
            }),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fails every prediction with an inference error.
    #[must_use]
    pub fn failing(num_classes: usize, message: &'static str) -> Self {
        Self {
            num_classes,
            result: Err(message),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns every feature vector passed to the classifier.
    #[must_use]
    pub fn seen(&self) -> Vec<Vec<f32>> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SignClassifier for MockSignClassifier {
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
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(features.to_vec());
        self.result
            .map_err(|message| ClassifierError::Inference(candle_core::Error::Msg(message.into())))
    }
}

/// Mock implementation of `ResultOutput` for testing.
///
/// Captures records for later assertions.
pub struct MockResultOutput {
    records: Arc<Mutex<Vec<PredictionRecord>>>,
    flush_count: Arc<Mutex<usize>>,
}

impl MockResultOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            flush_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns all captured records.
    #[must_use]
    pub fn records(&self) -> Vec<PredictionRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *self
            .flush_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockResultOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, record: &PredictionRecord) -> anyhow::Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        if let Ok(mut c) = self.flush_count.lock() {
            *c += 1;
        }
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
pub struct MockProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn count(&self, pred: impl Fn(&ProgressEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    /// Returns the number of `Started` events.
    #[must_use]
    pub fn started_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Started { .. }))
    }

    /// Returns the number of `Extracted` events.
    #[must_use]
    pub fn extracted_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Extracted { .. }))
    }

    /// Returns the number of `Skipped` events.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Skipped { .. }))
    }

    /// Returns the number of `Epoch` events.
    #[must_use]
    pub fn epoch_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Epoch { .. }))
    }

    /// Returns whether a `Finished` event was received.
    #[must_use]
    pub fn has_finished(&self) -> bool {
        self.count(|e| matches!(e, ProgressEvent::Finished { .. })) > 0
    }

    /// Returns `(samples, skipped, no_hand)` from the `Finished` event, if any.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished {
                samples,
                skipped,
                no_hand,
            } => Some((*samples, *skipped, *no_hand)),
            _ => None,
        })
    }
}

impl Default for MockProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
