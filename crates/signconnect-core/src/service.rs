//! Serving entry point: image bytes in, [`SignPrediction`] out.
//!
//! The service loads its models once and never fails afterwards. Missing or
//! broken artifacts leave it running in a degraded mode where every request
//! gets a sentinel response.

use std::path::Path;

use candle_core::Device;
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactPaths;
use crate::domain::{ExtractError, LabelRegistry, SignPrediction, TrainingManifest};
use crate::extractor::{ExtractorConfig, LandmarkExtractor};
use crate::inference::{GestureClassifier, HandTracker};
use crate::ports::{HandDetector, SignClassifier};

/// A classifier together with the labels of its output classes.
pub struct LoadedModel {
    pub classifier: Box<dyn SignClassifier>,
    pub registry: LabelRegistry,
}

/// Sign recognition service.
///
/// Immutable after construction; share it across threads by reference or
/// `Arc`.
pub struct SignService {
    extractor: Option<LandmarkExtractor>,
    model: Option<LoadedModel>,
    symmetry_mismatches: Vec<String>,
}

impl SignService {
    /// Loads the hand tracker and the trained classifier from a models directory.
    ///
    /// Failures are logged and leave the corresponding part unloaded.
    #[must_use]
    pub fn load(models_dir: &Path, config: ExtractorConfig, device: &Device) -> Self {
        let paths = ArtifactPaths::in_dir(models_dir);
        info!("Loading models from {}", models_dir.display());

        let extractor = match HandTracker::load(&paths.palm_detection, &paths.hand_landmark) {
            Ok(tracker) => Some(LandmarkExtractor::new(Box::new(tracker), config)),
            Err(e) => {
                warn!("Hand tracker not loaded: {e:#}");
                None
            }
        };

        let model = match load_model(&paths, device) {
            Ok(model) => Some(model),
            Err(e) => {
                warn!("Sign classifier not loaded: {e:#}");
                None
            }
        };

        let symmetry_mismatches = extractor
            .as_ref()
            .map(|extractor| check_symmetry(&paths, extractor))
            .unwrap_or_default();

        Self {
            symmetry_mismatches,
            ..Self::from_parts(extractor, model)
        }
    }

    /// Assembles a service from already constructed parts.
    #[must_use]
    pub const fn from_parts(extractor: Option<LandmarkExtractor>, model: Option<LoadedModel>) -> Self {
        Self {
            extractor,
            model,
            symmetry_mismatches: Vec::new(),
        }
    }

    /// Builds a fully loaded service around any detector and classifier.
    #[must_use]
    pub fn new(
        detector: Box<dyn HandDetector>,
        config: ExtractorConfig,
        classifier: Box<dyn SignClassifier>,
        registry: LabelRegistry,
    ) -> Self {
        Self::from_parts(
            Some(LandmarkExtractor::new(detector, config)),
            Some(LoadedModel {
                classifier,
                registry,
            }),
        )
    }

    #[must_use]
    pub const fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    #[must_use]
    pub const fn is_tracker_loaded(&self) -> bool {
        self.extractor.is_some()
    }

    /// Differences between this service's feature extraction and the one
    /// recorded in the training manifest at load time.
    #[must_use]
    pub fn symmetry_mismatches(&self) -> &[String] {
        &self.symmetry_mismatches
    }

    /// Returns the label registry of the loaded model.
    #[must_use]
    pub fn registry(&self) -> Option<&LabelRegistry> {
        self.model.as_ref().map(|m| &m.registry)
    }

    /// Recognizes the sign shown in an encoded image.
    ///
    /// Always returns a well formed response; failures map to sentinel
    /// labels with zero confidence.
    #[must_use]
    pub fn predict_sign(&self, image_bytes: &[u8]) -> SignPrediction {
        let Some(model) = &self.model else {
            return SignPrediction::model_not_loaded();
        };
        let Some(extractor) = &self.extractor else {
            return SignPrediction::tracker_not_loaded();
        };

        let vector = match extractor.extract(image_bytes) {
            Ok(vector) => vector,
            Err(ExtractError::Decode(e)) => {
                debug!("Undecodable image: {e}");
                return SignPrediction::undecodable();
            }
            Err(ExtractError::Detection(e)) => {
                warn!("Hand detection failed: {e:#}");
                return SignPrediction::detection_failed();
            }
        };

        if vector.is_empty() {
            return SignPrediction::no_hand();
        }

        match model.classifier.predict(&vector) {
            Ok(prediction) if prediction.class_index >= model.registry.len() => {
                warn!(
                    "Class {} is outside the {} known labels",
                    prediction.class_index,
                    model.registry.len()
                );
                SignPrediction::unknown()
            }
            Ok(prediction) => {
                let label = model.registry.resolve(prediction.class_index);
                debug!(
                    "Predicted '{}' (class {}) with confidence {:.3}",
                    label, prediction.class_index, prediction.confidence
                );
                SignPrediction::recognized(label, prediction.confidence)
            }
            Err(e) => {
                warn!("Classification failed: {e}");
                SignPrediction::error(e.to_string())
            }
        }
    }
}

fn load_model(paths: &ArtifactPaths, device: &Device) -> anyhow::Result<LoadedModel> {
    let registry = LabelRegistry::load(&paths.label_map)?;
    if registry.is_empty() {
        anyhow::bail!("Label map is empty: {}", paths.label_map.display());
    }
    let classifier = GestureClassifier::load(&paths.sign_classifier, registry.len(), device)?;
    info!("Loaded sign classifier with {} labels", registry.len());
    Ok(LoadedModel {
        classifier: Box::new(classifier),
        registry,
    })
}

/// Compares `extractor` with the training manifest in `paths`.
///
/// Returns every difference, each also logged as a warning. A missing or
/// unreadable manifest yields none.
#[must_use]
pub fn check_symmetry(paths: &ArtifactPaths, extractor: &LandmarkExtractor) -> Vec<String> {
    if !paths.manifest.exists() {
        debug!("No training manifest at {}", paths.manifest.display());
        return Vec::new();
    }
    match TrainingManifest::load(&paths.manifest) {
        Ok(manifest) => {
            let mismatches =
                manifest.symmetry_mismatches(extractor.config(), &extractor.detector().checksums());
            for mismatch in &mismatches {
                warn!("Serving differs from training: {mismatch}");
            }
            mismatches
        }
        Err(e) => {
            warn!("Ignoring training manifest: {e:#}");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_service_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SignService>();
    }

    #[test]
    fn test_empty_dir_is_degraded() {
        let dir = tempfile::tempdir().unwrap();
        let service = SignService::load(dir.path(), ExtractorConfig::default(), &Device::Cpu);

        assert!(!service.is_model_loaded());
        assert!(!service.is_tracker_loaded());
        assert_eq!(service.predict_sign(b"anything"), SignPrediction::model_not_loaded());
    }

    #[test]
    fn test_corrupt_label_map_is_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("label_map.json"), "not json").unwrap();
        std::fs::write(dir.path().join("sign_classifier.safetensors"), "junk").unwrap();

        let service = SignService::load(dir.path(), ExtractorConfig::default(), &Device::Cpu);
        assert!(!service.is_model_loaded());
    }
}
