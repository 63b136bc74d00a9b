//! Model artifact directory adapter.
//!
//! Resolves the default models directory and reports on the artifacts in it.

use std::path::{Path, PathBuf};

use anyhow::Result;
use signconnect_core::artifacts::{HAND_LANDMARK_FILE, PALM_DETECTION_FILE};
use signconnect_core::domain::sha256_file;
use signconnect_core::{ArtifactPaths, TrainingManifest};
use tracing::{debug, warn};

/// Returns the default models directory path.
///
/// Uses `XDG_DATA_HOME/signconnect/models` or `~/.local/share/signconnect/models`.
#[must_use]
pub fn models_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("signconnect")
        .join("models")
}

/// Presence of one artifact file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStatus {
    pub name: &'static str,
    pub path: PathBuf,
    /// File size in bytes, `None` when the file is missing.
    pub size: Option<u64>,
}

impl ArtifactStatus {
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.size.is_some()
    }
}

/// Lists every artifact of a models directory with its status.
#[must_use]
pub fn list_artifacts(dir: &Path) -> Vec<ArtifactStatus> {
    let paths = ArtifactPaths::in_dir(dir);
    paths
        .all()
        .into_iter()
        .map(|(name, path)| ArtifactStatus {
            name,
            path: path.to_path_buf(),
            size: std::fs::metadata(path).ok().filter(|m| m.is_file()).map(|m| m.len()),
        })
        .collect()
}

/// Returns true when both hand tracking weight files exist.
#[must_use]
pub fn tracker_installed(dir: &Path) -> bool {
    let paths = ArtifactPaths::in_dir(dir);
    paths.palm_detection.is_file() && paths.hand_landmark.is_file()
}

/// Outcome of checking one hand tracking weight file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumStatus {
    /// Matches the checksum recorded at training time.
    Match,
    /// Differs from the checksum recorded at training time.
    Mismatch { expected: String },
    /// No manifest, or the manifest does not record this file.
    Unrecorded,
    /// The weight file does not exist.
    Missing,
}

/// Checksum of one hand tracking weight file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub name: &'static str,
    /// SHA-256 of the file on disk.
    pub sha256: Option<String>,
    pub status: ChecksumStatus,
}

impl Verification {
    /// True unless the file is present with a different checksum.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        !matches!(self.status, ChecksumStatus::Mismatch { .. })
    }
}

/// Hashes the hand tracking models and compares them against the training manifest.
///
/// A missing or unreadable manifest is not an error; every file is then
/// reported as [`ChecksumStatus::Unrecorded`].
///
/// # Errors
///
/// Returns an error if a present weight file cannot be read.
pub fn verify_artifacts(dir: &Path) -> Result<Vec<Verification>> {
    let paths = ArtifactPaths::in_dir(dir);
    let manifest = if paths.manifest.is_file() {
        match TrainingManifest::load(&paths.manifest) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("Ignoring training manifest: {e:#}");
                None
            }
        }
    } else {
        debug!("No training manifest in {}", dir.display());
        None
    };

    let mut out = Vec::new();
    for (name, path) in [
        (PALM_DETECTION_FILE, &paths.palm_detection),
        (HAND_LANDMARK_FILE, &paths.hand_landmark),
    ] {
        if !path.is_file() {
            out.push(Verification {
                name,
                sha256: None,
                status: ChecksumStatus::Missing,
            });
            continue;
        }

        let sha256 = sha256_file(path)?;
        let expected = manifest
            .as_ref()
            .and_then(|m| m.detector_checksums.get(name));
        let status = match expected {
            Some(e) if *e == sha256 => ChecksumStatus::Match,
            Some(e) => ChecksumStatus::Mismatch {
                expected: e.clone(),
            },
            None => ChecksumStatus::Unrecorded,
        };
        out.push(Verification {
            name,
            sha256: Some(sha256),
            status,
        });
    }

    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_models_dir() {
        let dir = models_dir();
        assert!(dir.ends_with("signconnect/models"));
    }

    #[test]
    fn test_list_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let statuses = list_artifacts(dir.path());
        assert_eq!(statuses.len(), 5);
        assert!(statuses.iter().all(|s| !s.is_present()));
        assert!(!tracker_installed(dir.path()));
    }

    #[test]
    fn test_list_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("label_map.json"), r#"{"A": 0}"#).unwrap();

        let statuses = list_artifacts(dir.path());
        let label_map = statuses.iter().find(|s| s.name == "label_map.json").unwrap();
        assert_eq!(label_map.size, Some(8));
    }

    #[test]
    fn test_verify_without_weights() {
        let dir = tempfile::tempdir().unwrap();
        let results = verify_artifacts(dir.path()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|v| v.status == ChecksumStatus::Missing));
        assert!(results.iter().all(Verification::is_ok));
    }

    #[test]
    fn test_verify_without_manifest_is_unrecorded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PALM_DETECTION_FILE), b"abc").unwrap();

        let results = verify_artifacts(dir.path()).unwrap();
        assert_eq!(results[0].status, ChecksumStatus::Unrecorded);
        assert_eq!(
            results[0].sha256.as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }
}
