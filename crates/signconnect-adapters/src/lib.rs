//! SignConnect Adapters - External adapters for signconnect.
//!
//! This crate provides adapters for:
//! - Filesystem training corpus
//! - Model artifact directory listing and verification

pub mod fs;
pub mod models;

pub use fs::{CorpusEntry, FsCorpus};
pub use models::{
    list_artifacts, models_dir, tracker_installed, verify_artifacts, ArtifactStatus,
    ChecksumStatus, Verification,
};
