//! Integration tests for filesystem corpus scanning.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use signconnect_adapters::FsCorpus;
use signconnect_core::CorpusSource;
use signconnect_test_support::SyntheticImageBuilder;

#[test]
fn test_labels_come_from_subdirectories() {
    let dir = tempfile::tempdir().unwrap();
    SyntheticImageBuilder::write_corpus(dir.path(), &[("B", 2, [0, 255, 0]), ("A", 1, [255, 0, 0])])
        .unwrap();

    let corpus = FsCorpus::new(vec![dir.path().to_path_buf()]);
    let labels: Vec<String> = corpus.entries().iter().map(|e| e.label.clone()).collect();

    // Sorted by path: A/A_0, B/B_0, B/B_1
    assert_eq!(labels, vec!["A", "B", "B"]);
    assert_eq!(corpus.count_hint(), Some(3));
}

#[test]
fn test_samples_decode_images() {
    let dir = tempfile::tempdir().unwrap();
    SyntheticImageBuilder::write_corpus(dir.path(), &[("HELLO", 1, [10, 20, 30])]).unwrap();

    let corpus = FsCorpus::new(vec![dir.path().to_path_buf()]);
    let samples: Vec<_> = corpus.samples().collect::<Result<_, _>>().unwrap();

    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].label, "HELLO");
    assert!(samples[0].path.ends_with("HELLO_0.png"));
    assert_eq!(samples[0].image.to_rgb8().get_pixel(0, 0).0, [10, 20, 30]);
}

#[test]
fn test_unsupported_and_nested_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    SyntheticImageBuilder::write_corpus(dir.path(), &[("A", 1, [1, 1, 1])]).unwrap();
    std::fs::write(dir.path().join("A/notes.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("stray.png"), "not in a label dir").unwrap();
    std::fs::create_dir_all(dir.path().join("A/nested")).unwrap();
    SyntheticImageBuilder::solid(4, 4, [1, 1, 1])
        .save(dir.path().join("A/nested/deep.png"))
        .unwrap();

    let corpus = FsCorpus::new(vec![dir.path().to_path_buf()]);
    assert_eq!(corpus.entries().len(), 1);
}

#[test]
fn test_uppercase_extensions_are_found() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("A")).unwrap();
    let png = SyntheticImageBuilder::png_bytes(&SyntheticImageBuilder::solid(4, 4, [9, 9, 9]));
    std::fs::write(dir.path().join("A/frame.PNG"), &png).unwrap();

    let corpus = FsCorpus::new(vec![dir.path().to_path_buf()]);
    assert_eq!(corpus.entries().len(), 1);
}

#[test]
fn test_multiple_roots_merge_and_missing_roots_are_skipped() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    SyntheticImageBuilder::write_corpus(a.path(), &[("A", 1, [1, 0, 0])]).unwrap();
    SyntheticImageBuilder::write_corpus(b.path(), &[("A", 2, [1, 0, 0])]).unwrap();

    let corpus = FsCorpus::new(vec![
        a.path().to_path_buf(),
        "/nonexistent/corpus".into(),
        b.path().to_path_buf(),
    ]);
    assert_eq!(corpus.entries().len(), 3);
}

#[test]
fn test_corrupt_image_is_an_item_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("A")).unwrap();
    std::fs::write(dir.path().join("A/broken.jpg"), b"garbage").unwrap();

    let corpus = FsCorpus::new(vec![dir.path().to_path_buf()]);
    let err = corpus.samples().next().unwrap().unwrap_err();
    assert!(format!("{err:#}").contains("broken.jpg"));
}

#[test]
fn test_corpus_is_scanned_once() {
    let dir = tempfile::tempdir().unwrap();
    SyntheticImageBuilder::write_corpus(dir.path(), &[("A", 2, [5, 5, 5])]).unwrap();

    let corpus = FsCorpus::new(vec![dir.path().to_path_buf()]);
    assert_eq!(corpus.count_hint(), Some(2));

    // Images added after the first scan are not picked up
    SyntheticImageBuilder::write_corpus(dir.path(), &[("B", 1, [6, 6, 6])]).unwrap();
    let samples: Vec<_> = corpus.samples().collect::<Result<_, _>>().unwrap();
    assert_eq!(samples.len(), 2);
    assert!(samples.iter().all(|s| s.label == "A"));
}
