//! End-to-end training over an on-disk corpus.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;

use candle_core::Device;
use signconnect_adapters::FsCorpus;
use signconnect_core::inference::GestureClassifier;
use signconnect_core::{
    ExtractorConfig, LabelRegistry, LandmarkExtractor, SignService, Trainer, TrainingConfig,
    TrainingError, TrainingManifest,
};
use signconnect_test_support::{MockHandDetector, MockProgressSink, SyntheticImageBuilder};

const RED: [u8; 3] = [220, 30, 30];
const GREEN: [u8; 3] = [30, 220, 30];
const BLUE: [u8; 3] = [30, 30, 220];

fn extractor() -> LandmarkExtractor {
    LandmarkExtractor::new(
        Box::new(MockHandDetector::color_coded()),
        ExtractorConfig::default(),
    )
}

fn config() -> TrainingConfig {
    TrainingConfig {
        epochs: 40,
        batch_size: 4,
        learning_rate: 0.01,
        ..TrainingConfig::default()
    }
}

#[test]
fn test_three_label_corpus() {
    let corpus_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    SyntheticImageBuilder::write_corpus(
        corpus_dir.path(),
        &[("HELLO", 6, BLUE), ("A", 6, RED), ("B", 6, GREEN)],
    )
    .unwrap();

    let extractor = extractor();
    let trainer = Trainer::new(&extractor, config(), Device::Cpu);
    let corpus = FsCorpus::new(vec![corpus_dir.path().to_path_buf()]);
    let progress = MockProgressSink::new();

    let report = trainer.run(&corpus, out_dir.path(), &progress).unwrap();

    // Label map is the sorted label set
    let label_map: BTreeMap<String, usize> = serde_json::from_str(
        &std::fs::read_to_string(out_dir.path().join("label_map.json")).unwrap(),
    )
    .unwrap();
    let expected: BTreeMap<String, usize> =
        [("A".to_string(), 0), ("B".to_string(), 1), ("HELLO".to_string(), 2)].into();
    assert_eq!(label_map, expected);

    // Model loads for three classes
    let model = GestureClassifier::load(&report.artifacts.sign_classifier, 3, &Device::Cpu);
    assert!(model.is_ok());

    assert_eq!(report.samples(), 18);
    assert_eq!(report.val_samples, 3);
    assert_eq!(progress.epoch_count(), 40);
    assert_eq!(progress.finished_counts(), Some((18, 0, 0)));

    let manifest = TrainingManifest::load(out_dir.path().join("training_manifest.json")).unwrap();
    assert_eq!(manifest.num_classes, 3);
    assert_eq!(manifest.seed, 42);
}

#[test]
fn test_trained_model_serves_its_labels() {
    let corpus_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    SyntheticImageBuilder::write_corpus(
        corpus_dir.path(),
        &[("A", 8, RED), ("B", 8, GREEN), ("HELLO", 8, BLUE)],
    )
    .unwrap();

    let extractor = extractor();
    let trainer = Trainer::new(&extractor, config(), Device::Cpu);
    let corpus = FsCorpus::new(vec![corpus_dir.path().to_path_buf()]);
    let report = trainer
        .run(&corpus, out_dir.path(), &MockProgressSink::new())
        .unwrap();
    assert!(report.metrics.train_accuracy > 0.9, "{:?}", report.metrics);

    let registry = LabelRegistry::load(&report.artifacts.label_map).unwrap();
    let classifier =
        GestureClassifier::load(&report.artifacts.sign_classifier, registry.len(), &Device::Cpu)
            .unwrap();
    let service = SignService::new(
        Box::new(MockHandDetector::color_coded()),
        ExtractorConfig::default(),
        Box::new(classifier),
        registry,
    );

    for (color, label) in [(RED, "A"), (GREEN, "B"), (BLUE, "HELLO")] {
        let frame = SyntheticImageBuilder::png_bytes(&SyntheticImageBuilder::solid(32, 32, color));
        let p = service.predict_sign(&frame);
        assert_eq!(p.label, label);
        assert!(p.confidence > 0.0 && p.confidence <= 1.0);
    }

    let blank = SyntheticImageBuilder::png_bytes(&SyntheticImageBuilder::blank(32, 32));
    assert_eq!(service.predict_sign(&blank).label, "No Hand");
}

#[test]
fn test_blank_and_broken_images_are_skipped() {
    let corpus_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    SyntheticImageBuilder::write_corpus(
        corpus_dir.path(),
        &[("A", 5, RED), ("B", 5, GREEN), ("BLANK", 3, [0, 0, 0])],
    )
    .unwrap();
    std::fs::write(corpus_dir.path().join("A/zz_broken.jpg"), b"garbage").unwrap();

    let extractor = extractor();
    let trainer = Trainer::new(
        &extractor,
        TrainingConfig {
            epochs: 1,
            ..TrainingConfig::default()
        },
        Device::Cpu,
    );
    let corpus = FsCorpus::new(vec![corpus_dir.path().to_path_buf()]);
    let progress = MockProgressSink::new();

    let report = trainer.run(&corpus, out_dir.path(), &progress).unwrap();

    // Blank images yield no hand, so their label never enters the registry
    assert_eq!(report.registry.labels(), &["A", "B"]);
    assert_eq!(report.no_hand, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(progress.skipped_count(), 1);
}

#[test]
fn test_corpus_without_hands_fails() {
    let corpus_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    SyntheticImageBuilder::write_corpus(corpus_dir.path(), &[("A", 3, [0, 0, 0])]).unwrap();

    let extractor = extractor();
    let trainer = Trainer::new(&extractor, TrainingConfig::default(), Device::Cpu);
    let corpus = FsCorpus::new(vec![corpus_dir.path().to_path_buf()]);

    let err = trainer
        .run(&corpus, out_dir.path(), &MockProgressSink::new())
        .unwrap_err();
    assert!(matches!(err, TrainingError::EmptyCorpus { scanned: 3 }));
    assert!(!out_dir.path().join("label_map.json").exists());
}
