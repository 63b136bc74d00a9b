//! Artifact file layout of a models directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// MediaPipe palm detection graph (ONNX).
pub const PALM_DETECTION_FILE: &str = "palm_detection.onnx";

/// MediaPipe hand landmark graph (ONNX).
pub const HAND_LANDMARK_FILE: &str = "hand_landmark.onnx";

/// Trained sign classifier weights.
pub const SIGN_CLASSIFIER_FILE: &str = "sign_classifier.safetensors";

/// Label map (`{"label": index}`).
pub const LABEL_MAP_FILE: &str = "label_map.json";

/// Training manifest.
pub const TRAINING_MANIFEST_FILE: &str = "training_manifest.json";

/// Paths of every artifact in one models directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub palm_detection: PathBuf,
    pub hand_landmark: PathBuf,
    pub sign_classifier: PathBuf,
    pub label_map: PathBuf,
    pub manifest: PathBuf,
}

impl ArtifactPaths {
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            dir: dir.to_path_buf(),
            palm_detection: dir.join(PALM_DETECTION_FILE),
            hand_landmark: dir.join(HAND_LANDMARK_FILE),
            sign_classifier: dir.join(SIGN_CLASSIFIER_FILE),
            label_map: dir.join(LABEL_MAP_FILE),
            manifest: dir.join(TRAINING_MANIFEST_FILE),
        }
    }

    /// All artifacts as `(file name, path)`, hand tracking models first.
    #[must_use]
    pub fn all(&self) -> [(&'static str, &Path); 5] {
        [
            (PALM_DETECTION_FILE, &self.palm_detection),
            (HAND_LANDMARK_FILE, &self.hand_landmark),
            (SIGN_CLASSIFIER_FILE, &self.sign_classifier),
            (LABEL_MAP_FILE, &self.label_map),
            (TRAINING_MANIFEST_FILE, &self.manifest),
        ]
    }
}

/// Returns the sibling temp path used while writing `path`.
#[must_use]
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Returns the sibling path an existing artifact is moved to while a new
/// set is swapped in.
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

/// Writes `contents` to `path` and fsyncs it.
fn write_synced(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync {}", path.display()))
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    std::fs::rename(from, to)
        .with_context(|| format!("Failed to move {} to {}", from.display(), to.display()))
}

/// Artifacts written to temp files and moved into place as one set.
///
/// The directory ends up holding either every new file or every old one.
/// Dropping a set without committing it removes its temp files.
#[derive(Debug, Default)]
pub struct StagedArtifacts {
    /// `(temp path, final path)` pairs in write order.
    staged: Vec<(PathBuf, PathBuf)>,
}

impl StagedArtifacts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `contents` to the temp file for `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be written.
    pub fn write(&mut self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_with(path, |tmp| write_synced(tmp, contents))
    }

    /// Lets `write` produce the temp file for `path`.
    ///
    /// # Errors
    ///
    /// Returns the error of `write`.
    pub fn write_with(
        &mut self,
        path: &Path,
        write: impl FnOnce(&Path) -> Result<()>,
    ) -> Result<()> {
        let tmp = temp_path(path);
        self.staged.push((tmp.clone(), path.to_path_buf()));
        write(&tmp)
    }

    /// Moves every staged file into place.
    ///
    /// Existing files are set aside first. If any move fails, the new files
    /// are removed and the old ones restored.
    ///
    /// # Errors
    ///
    /// Returns the first failed move.
    pub fn commit(mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        let mut backups: Vec<(PathBuf, PathBuf)> = Vec::new();
        let mut moved: Vec<&Path> = Vec::new();

        let result = swap_in(&staged, &mut backups, &mut moved);

        match result {
            Ok(()) => {
                for (backup, _) in &backups {
                    if let Err(e) = std::fs::remove_file(backup) {
                        warn!("Failed to remove {}: {e}", backup.display());
                    }
                }
                Ok(())
            }
            Err(err) => {
                for path in moved {
                    let _ = std::fs::remove_file(path);
                }
                for (backup, path) in &backups {
                    if let Err(e) = std::fs::rename(backup, path) {
                        warn!("Failed to restore {}: {e}", path.display());
                    }
                }
                remove_temps(&staged);
                Err(err)
            }
        }
    }
}

/// Sets existing files aside, then moves every temp file into place.
fn swap_in<'a>(
    staged: &'a [(PathBuf, PathBuf)],
    backups: &mut Vec<(PathBuf, PathBuf)>,
    moved: &mut Vec<&'a Path>,
) -> Result<()> {
    for (_, path) in staged {
        if path.is_file() {
            let backup = backup_path(path);
            rename(path, &backup)?;
            backups.push((backup, path.clone()));
        }
    }
    for (tmp, path) in staged {
        rename(tmp, path)?;
        moved.push(path);
    }
    Ok(())
}

impl Drop for StagedArtifacts {
    fn drop(&mut self) {
        remove_temps(&self.staged);
    }
}

fn remove_temps(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        if tmp.exists() {
            debug!("Removing {}", tmp.display());
            let _ = std::fs::remove_file(tmp);
        }
    }
}

/// Writes `contents` to a temp file next to `path` and renames it into place,
/// so readers never observe a half-written artifact.
///
/// # Errors
///
/// Returns an error if the temp file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut staged = StagedArtifacts::new();
    staged.write(path, contents)?;
    staged.commit()
}
