//! Filesystem adapter for labeled training corpora.
//!
//! Layout: `<root>/<label>/<image>`. Only the immediate subdirectories of a
//! root are labels and only files directly inside them are images.

use anyhow::{Context, Result};
use signconnect_core::{CorpusSource, LabeledImage};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Supported image extensions (compared case-insensitively).
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// A candidate image and the label it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub label: String,
    pub path: PathBuf,
}

/// Filesystem corpus adapter.
///
/// The roots are walked once, on first use; later calls reuse that listing.
pub struct FsCorpus {
    roots: Vec<PathBuf>,
    entries: OnceLock<Vec<CorpusEntry>>,
}

impl FsCorpus {
    /// Creates a corpus over one or more root directories.
    #[must_use]
    pub const fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            entries: OnceLock::new(),
        }
    }

    /// Returns all candidate images, sorted by path.
    ///
    /// Missing roots and unreadable directories are logged and skipped.
    #[must_use]
    pub fn entries(&self) -> &[CorpusEntry] {
        self.entries.get_or_init(|| self.scan())
    }

    fn scan(&self) -> Vec<CorpusEntry> {
        let mut entries = Vec::new();

        for root in &self.roots {
            if !root.is_dir() {
                warn!("Corpus root does not exist: {}", root.display());
                continue;
            }
            for label_dir in read_dir_sorted(root) {
                if !label_dir.is_dir() {
                    continue;
                }
                let Some(label) = label_dir.file_name().and_then(|n| n.to_str()) else {
                    warn!("Skipping non UTF-8 label directory: {}", label_dir.display());
                    continue;
                };
                let label = label.to_string();
                for path in read_dir_sorted(&label_dir) {
                    if path.is_file() && is_supported_image(&path) {
                        entries.push(CorpusEntry {
                            label: label.clone(),
                            path,
                        });
                    }
                }
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Found {} corpus images", entries.len());
        entries
    }
}

fn read_dir_sorted(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Failed to read directory {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
    paths.sort();
    paths
}

impl CorpusSource for FsCorpus {
    fn samples(&self) -> Box<dyn Iterator<Item = Result<LabeledImage>> + Send + '_> {
        Box::new(self.entries().iter().cloned().map(load_sample))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.entries().len())
    }
}

/// Checks if a path has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Loads one corpus image from the filesystem.
fn load_sample(entry: CorpusEntry) -> Result<LabeledImage> {
    let image = image::open(&entry.path)
        .with_context(|| format!("Failed to open image: {}", entry.path.display()))?;

    Ok(LabeledImage {
        label: entry.label,
        path: entry.path.to_string_lossy().into_owned(),
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("test.jpg")));
        assert!(is_supported_image(Path::new("test.JPEG")));
        assert!(is_supported_image(Path::new("test.Png")));
        assert!(!is_supported_image(Path::new("test.webp")));
        assert!(!is_supported_image(Path::new("test.txt")));
        assert!(!is_supported_image(Path::new("test")));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let corpus = FsCorpus::new(vec![PathBuf::from("/nonexistent/corpus")]);
        assert!(corpus.entries().is_empty());
        assert_eq!(corpus.count_hint(), Some(0));
    }
}
