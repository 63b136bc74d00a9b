//! Offline training pipeline.
//!
//! `scan -> extract -> filter -> split -> fit -> persist`, single threaded.
//! Features go through the same [`LandmarkExtractor`] as serving.

mod fit;
mod split;

use std::path::Path;

use candle_core::Device;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

pub use fit::{fit, glorot_init, Dataset};
pub use split::{stratified_split, Split};

use crate::artifacts::{ArtifactPaths, StagedArtifacts};
use crate::domain::{
    KeypointVector, LabelRegistry, TrainingError, TrainingManifest, TrainingMetrics,
    FEATURE_LAYOUT,
};
use crate::extractor::LandmarkExtractor;
use crate::ports::{CorpusSource, ProgressEvent, ProgressSink};

/// Hyper-parameters of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of each class held out for validation, in `[0, 1)`.
    pub validation_split: f32,
    pub learning_rate: f64,
    /// Seed for the split, weight initialisation and batch shuffling.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 15,
            batch_size: 32,
            validation_split: 0.15,
            learning_rate: 1e-3,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    /// Checks the hyper-parameters.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.epochs == 0 {
            return Err(TrainingError::InvalidConfig("epochs must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::InvalidConfig("batch_size must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(TrainingError::InvalidConfig(format!(
                "validation_split {} is not in 0.0..1.0",
                self.validation_split
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainingError::InvalidConfig(format!(
                "learning_rate {} must be a positive number",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Outcome of a successful training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub artifacts: ArtifactPaths,
    pub registry: LabelRegistry,
    /// Candidate images seen in the corpus.
    pub scanned: usize,
    /// Images that failed to load or extract.
    pub skipped: usize,
    /// Images without a detectable hand.
    pub no_hand: usize,
    pub train_samples: usize,
    pub val_samples: usize,
    pub metrics: TrainingMetrics,
}

impl TrainingReport {
    /// Samples that made it into training or validation.
    #[must_use]
    pub const fn samples(&self) -> usize {
        self.train_samples + self.val_samples
    }
}

/// Labeled keypoint vectors gathered from a corpus.
#[derive(Debug, Default)]
struct Extracted {
    labels: Vec<String>,
    vectors: Vec<KeypointVector>,
    scanned: usize,
    skipped: usize,
    no_hand: usize,
}

/// Runs the training pipeline with a fixed extractor and configuration.
pub struct Trainer<'a> {
    extractor: &'a LandmarkExtractor,
    config: TrainingConfig,
    device: Device,
}

impl<'a> Trainer<'a> {
    #[must_use]
    pub const fn new(extractor: &'a LandmarkExtractor, config: TrainingConfig, device: Device) -> Self {
        Self {
            extractor,
            config,
            device,
        }
    }

    /// Trains a classifier on `corpus` and writes its artifacts to `output_dir`.
    ///
    /// Images that fail to load or extract are logged and skipped; images
    /// without a hand are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::EmptyCorpus`] if no image yields a hand,
    /// [`TrainingError::InvalidConfig`] for bad hyper-parameters, and
    /// [`TrainingError::Persist`] if artifacts cannot be written.
    pub fn run(
        &self,
        corpus: &dyn CorpusSource,
        output_dir: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<TrainingReport, TrainingError> {
        self.config.validate()?;

        let extracted = self.extract(corpus, progress);
        info!(
            "Extracted {} samples from {} images ({} without hand, {} skipped)",
            extracted.vectors.len(),
            extracted.scanned,
            extracted.no_hand,
            extracted.skipped
        );
        if extracted.vectors.is_empty() {
            return Err(TrainingError::EmptyCorpus {
                scanned: extracted.scanned,
            });
        }

        let registry = LabelRegistry::build(extracted.labels.iter().map(String::as_str));
        let targets: Vec<u32> = extracted
            .labels
            .iter()
            .map(|label| {
                registry
                    .index_of(label)
                    .and_then(|i| u32::try_from(i).ok())
                    .ok_or_else(|| TrainingError::InvalidConfig(format!("unindexed label '{label}'")))
            })
            .collect::<Result<_, _>>()?;
        info!("Labels: {:?}", registry.labels());

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let split = stratified_split(&targets, self.config.validation_split, &mut rng);
        debug!(
            "Split {} samples into {} train / {} validation",
            targets.len(),
            split.train.len(),
            split.val.len()
        );

        let train = Dataset::select(&extracted.vectors, &targets, &split.train);
        let val = Dataset::select(&extracted.vectors, &targets, &split.val);
        let (varmap, metrics) = fit(
            &train,
            &val,
            registry.len(),
            &self.config,
            &self.device,
            &mut rng,
            progress,
        )?;

        let report = TrainingReport {
            artifacts: ArtifactPaths::in_dir(output_dir),
            registry,
            scanned: extracted.scanned,
            skipped: extracted.skipped,
            no_hand: extracted.no_hand,
            train_samples: train.len(),
            val_samples: val.len(),
            metrics,
        };
        self.persist(&varmap, &report)
            .map_err(TrainingError::Persist)?;

        progress.on_event(ProgressEvent::Finished {
            samples: report.samples(),
            skipped: report.skipped,
            no_hand: report.no_hand,
        });
        info!("Wrote model artifacts to {}", output_dir.display());

        Ok(report)
    }

    fn extract(&self, corpus: &dyn CorpusSource, progress: &dyn ProgressSink) -> Extracted {
        let total = corpus.count_hint();
        let mut out = Extracted::default();

        for (index, item) in corpus.samples().enumerate() {
            out.scanned += 1;
            let sample = match item {
                Ok(sample) => sample,
                Err(e) => {
                    // The error message carries the path via anyhow context
                    warn!("Skipping image: {e:#}");
                    progress.on_event(ProgressEvent::Skipped {
                        path: format!("image {index}"),
                        reason: format!("{e:#}"),
                    });
                    out.skipped += 1;
                    continue;
                }
            };

            progress.on_event(ProgressEvent::Started {
                path: sample.path.clone(),
                index,
                total,
            });

            match self.extractor.extract_image(&sample.image) {
                Ok(vector) => {
                    let has_hand = !vector.is_empty();
                    progress.on_event(ProgressEvent::Extracted {
                        path: sample.path.clone(),
                        has_hand,
                    });
                    if has_hand {
                        out.labels.push(sample.label);
                        out.vectors.push(vector);
                    } else {
                        debug!("No hand in {}", sample.path);
                        out.no_hand += 1;
                    }
                }
                Err(e) => {
                    warn!("Skipping {}: {e}", sample.path);
                    progress.on_event(ProgressEvent::Skipped {
                        path: sample.path,
                        reason: e.to_string(),
                    });
                    out.skipped += 1;
                }
            }
        }

        out
    }

    fn persist(&self, varmap: &candle_nn::VarMap, report: &TrainingReport) -> anyhow::Result<()> {
        use anyhow::Context;

        let paths = &report.artifacts;
        std::fs::create_dir_all(&paths.dir)
            .with_context(|| format!("Failed to create {}", paths.dir.display()))?;

        let mut staged = StagedArtifacts::new();
        staged.write_with(&paths.sign_classifier, |tmp| {
            varmap
                .save(tmp)
                .with_context(|| format!("Failed to write {}", tmp.display()))
        })?;
        staged.write(&paths.label_map, report.registry.to_json()?.as_bytes())?;

        let manifest = TrainingManifest {
            feature_layout: FEATURE_LAYOUT.to_string(),
            extractor: *self.extractor.config(),
            detector_checksums: self.extractor.detector().checksums(),
            num_classes: report.registry.len(),
            train_samples: report.train_samples,
            val_samples: report.val_samples,
            epochs: self.config.epochs,
            batch_size: self.config.batch_size,
            learning_rate: self.config.learning_rate,
            seed: self.config.seed,
            metrics: report.metrics,
            trained_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .context("Failed to format timestamp")?,
        };
        let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
        staged.write(&paths.manifest, json.as_bytes())?;

        debug!("Moving artifacts into {}", paths.dir.display());
        staged.commit()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::DynamicImage;

    use super::*;
    use crate::domain::{DetectedHand, Handedness, Landmark, LANDMARKS_PER_HAND};
    use crate::extractor::ExtractorConfig;
    use crate::ports::{DetectionOptions, HandDetector, LabeledImage, NoProgress};

    /// Reports a right hand whose landmark x is the red channel of pixel (0, 0),
    /// or no hand for black images.
    struct RedDetector;

    impl HandDetector for RedDetector {
        fn detect(
            &self,
            image: &DynamicImage,
            _options: &DetectionOptions,
        ) -> anyhow::Result<Vec<DetectedHand>> {
            let red = image.to_rgb8().get_pixel(0, 0).0[0];
            if red == 0 {
                return Ok(vec![]);
            }
            let x = f32::from(red) / 255.0;
            Ok(vec![DetectedHand::new(
                [Landmark::new(x, 0.5, 0.0); LANDMARKS_PER_HAND],
                Handedness::Right,
            )])
        }
    }

    struct VecCorpus(Vec<(&'static str, u8)>);

    impl CorpusSource for VecCorpus {
        fn samples(&self) -> Box<dyn Iterator<Item = anyhow::Result<LabeledImage>> + Send + '_> {
            Box::new(self.0.iter().enumerate().map(|(i, &(label, red))| {
                let image = image::RgbImage::from_pixel(4, 4, image::Rgb([red, 0, 0]));
                Ok(LabeledImage {
                    label: label.to_string(),
                    path: format!("{label}/{i}.png"),
                    image: DynamicImage::ImageRgb8(image),
                })
            }))
        }

        fn count_hint(&self) -> Option<usize> {
            Some(self.0.len())
        }
    }

    fn extractor() -> LandmarkExtractor {
        LandmarkExtractor::new(Box::new(RedDetector), ExtractorConfig::default())
    }

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 15);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            TrainingConfig { epochs: 0, ..TrainingConfig::default() },
            TrainingConfig { batch_size: 0, ..TrainingConfig::default() },
            TrainingConfig { validation_split: 1.0, ..TrainingConfig::default() },
            TrainingConfig { learning_rate: 0.0, ..TrainingConfig::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(TrainingError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_corpus_without_hands_is_empty_corpus() {
        let extractor = extractor();
        let trainer = Trainer::new(&extractor, TrainingConfig::default(), Device::Cpu);
        let corpus = VecCorpus(vec![("A", 0), ("B", 0)]);
        let dir = tempfile::tempdir().unwrap();

        let err = trainer.run(&corpus, dir.path(), &NoProgress).unwrap_err();
        assert!(matches!(err, TrainingError::EmptyCorpus { scanned: 2 }));
        assert!(!dir.path().join("sign_classifier.safetensors").exists());
    }

    #[test]
    fn test_run_writes_artifacts_and_drops_empty_vectors() {
        let extractor = extractor();
        let config = TrainingConfig {
            epochs: 2,
            ..TrainingConfig::default()
        };
        let trainer = Trainer::new(&extractor, config, Device::Cpu);
        let mut samples = vec![("B", 200); 6];
        samples.extend(vec![("A", 40); 6]);
        samples.push(("A", 0));
        let corpus = VecCorpus(samples);
        let dir = tempfile::tempdir().unwrap();

        let report = trainer.run(&corpus, dir.path(), &NoProgress).unwrap();

        assert_eq!(report.scanned, 13);
        assert_eq!(report.no_hand, 1);
        assert_eq!(report.samples(), 12);
        assert_eq!(report.val_samples, 2);
        assert_eq!(report.registry.labels(), &["A", "B"]);

        let manifest = TrainingManifest::load(&report.artifacts.manifest).unwrap();
        assert_eq!(manifest.num_classes, 2);
        assert_eq!(manifest.extractor, ExtractorConfig::default());
        assert!(report.artifacts.sign_classifier.exists());
        assert!(!crate::artifacts::temp_path(&report.artifacts.sign_classifier).exists());
    }

    #[test]
    fn test_failed_persist_keeps_previous_artifacts() {
        let extractor = extractor();
        let config = TrainingConfig {
            epochs: 1,
            ..TrainingConfig::default()
        };
        let trainer = Trainer::new(&extractor, config, Device::Cpu);
        let mut samples = vec![("B", 200); 4];
        samples.extend(vec![("A", 40); 4]);
        let corpus = VecCorpus(samples);

        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        std::fs::write(&paths.sign_classifier, "OLD").unwrap();
        // Nothing can be moved onto a directory
        std::fs::create_dir(&paths.label_map).unwrap();

        let err = trainer.run(&corpus, dir.path(), &NoProgress).unwrap_err();
        assert!(matches!(err, TrainingError::Persist(_)));

        assert_eq!(std::fs::read_to_string(&paths.sign_classifier).unwrap(), "OLD");
        assert!(!paths.manifest.exists());
        let stray: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp") || name.ends_with(".bak"))
            .collect();
        assert!(stray.is_empty(), "left behind: {stray:?}");
    }
}
