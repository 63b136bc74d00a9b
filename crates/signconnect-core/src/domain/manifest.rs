//! Training manifest recorded next to the classifier artifacts.
//!
//! Serving compares its own feature extraction against the manifest so that
//! a model trained with one extractor configuration is not silently served
//! with another.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::extractor::ExtractorConfig;

/// Identifier of the keypoint vector layout (21 landmarks x 3 axes, left then right).
pub const FEATURE_LAYOUT: &str = "hands-21x3-left-right-v1";

/// Metrics of the final training epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub train_loss: f32,
    pub train_accuracy: f32,
    /// `None` when the validation split was empty.
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
}

/// Metadata describing how a classifier was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingManifest {
    /// Keypoint vector layout the model expects.
    pub feature_layout: String,
    /// Extractor settings used to produce the training features.
    pub extractor: ExtractorConfig,
    /// SHA-256 of each hand-tracking weight file, keyed by file name.
    #[serde(default)]
    pub detector_checksums: BTreeMap<String, String>,
    /// Number of classes.
    pub num_classes: usize,
    pub train_samples: usize,
    pub val_samples: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
    pub metrics: TrainingMetrics,
    /// Completion time (RFC 3339).
    pub trained_at: String,
}

impl TrainingManifest {
    /// Loads a manifest from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))
    }

    /// Returns human-readable differences between the training-time feature
    /// extraction and the given serving-time setup. Empty when they match.
    #[must_use]
    pub fn symmetry_mismatches(
        &self,
        extractor: &ExtractorConfig,
        detector_checksums: &BTreeMap<String, String>,
    ) -> Vec<String> {
        let mut out = Vec::new();

        if self.feature_layout != FEATURE_LAYOUT {
            out.push(format!(
                "feature layout '{}' (serving '{FEATURE_LAYOUT}')",
                self.feature_layout
            ));
        }
        if self.extractor.mirror != extractor.mirror {
            out.push(format!(
                "mirror={} (serving mirror={})",
                self.extractor.mirror, extractor.mirror
            ));
        }
        if self.extractor.max_hands != extractor.max_hands {
            out.push(format!(
                "max_hands={} (serving max_hands={})",
                self.extractor.max_hands, extractor.max_hands
            ));
        }
        if (self.extractor.min_detection_confidence - extractor.min_detection_confidence).abs()
            > f32::EPSILON
        {
            out.push(format!(
                "min_detection_confidence={} (serving {})",
                self.extractor.min_detection_confidence, extractor.min_detection_confidence
            ));
        }
        for (name, trained) in &self.detector_checksums {
            match detector_checksums.get(name) {
                Some(serving) if serving == trained => {}
                Some(_) => out.push(format!("{name} checksum differs")),
                None => out.push(format!("{name} not available for comparison")),
            }
        }

        out
    }
}

/// Computes the hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn sha256_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    debug!("Hashing {}", path.display());

    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn manifest() -> TrainingManifest {
        TrainingManifest {
            feature_layout: FEATURE_LAYOUT.into(),
            extractor: ExtractorConfig::default(),
            detector_checksums: BTreeMap::from([("palm_detection.onnx".into(), "ab".into())]),
            num_classes: 3,
            train_samples: 12,
            val_samples: 3,
            epochs: 15,
            batch_size: 32,
            learning_rate: 1e-3,
            seed: 42,
            metrics: TrainingMetrics::default(),
            trained_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_symmetry_matches() {
        let m = manifest();
        let checksums = m.detector_checksums.clone();
        assert!(m
            .symmetry_mismatches(&ExtractorConfig::default(), &checksums)
            .is_empty());
    }

    #[test]
    fn test_symmetry_reports_mirror_and_checksum() {
        let m = manifest();
        let serving = ExtractorConfig {
            mirror: false,
            ..ExtractorConfig::default()
        };
        let checksums = BTreeMap::from([("palm_detection.onnx".into(), "cd".into())]);

        let mismatches = m.symmetry_mismatches(&serving, &checksums);
        assert_eq!(mismatches.len(), 2);
        assert!(mismatches[0].contains("mirror"));
        assert!(mismatches[1].contains("checksum"));
    }

    #[test]
    fn test_manifest_json_round_trip() {
        let m = manifest();
        let json = serde_json::to_string(&m).unwrap();
        let back: TrainingManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_sha256_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.bin");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
