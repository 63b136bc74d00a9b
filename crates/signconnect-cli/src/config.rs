//! Configuration file support for signconnect.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/signconnect/config.toml` (lowest priority)
//! - Project-local: `.signconnect.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

/// Name of the project-local config file.
const PROJECT_CONFIG: &str = ".signconnect.toml";

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Hand detection settings, shared by training and prediction.
    pub detection: DetectionConfig,
    /// Training hyper-parameters.
    pub training: TrainingConfig,
    /// Model settings.
    pub models: ModelsConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// Hand detection configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Flip frames horizontally before detection.
    pub mirror: Option<bool>,
    /// Maximum number of hands (1 or 2).
    pub max_hands: Option<usize>,
    /// Minimum detection confidence (0.0-1.0).
    pub min_detection_confidence: Option<f32>,
}

/// Training configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Corpus root directories.
    pub corpus: Option<Vec<PathBuf>>,
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    /// Fraction of each class held out for validation.
    pub validation_split: Option<f32>,
    pub seed: Option<u64>,
    pub learning_rate: Option<f64>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Custom models directory path.
    pub dir: Option<PathBuf>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/signconnect/config.toml`
    /// 2. Project-local: `.signconnect.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<(), String> {
        if let Some(t) = self.detection.min_detection_confidence {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!(
                    "detection.min_detection_confidence must be 0.0-1.0, got {t}"
                ));
            }
        }
        if let Some(n) = self.detection.max_hands {
            if !(1..=2).contains(&n) {
                return Err(format!("detection.max_hands must be 1 or 2, got {n}"));
            }
        }

        if let Some(s) = self.training.validation_split {
            if !(0.0..1.0).contains(&s) {
                return Err(format!(
                    "training.validation_split must be in 0.0..1.0, got {s}"
                ));
            }
        }
        if self.training.epochs == Some(0) {
            return Err("training.epochs must be greater than 0".to_string());
        }
        if self.training.batch_size == Some(0) {
            return Err("training.batch_size must be greater than 0".to_string());
        }
        if let Some(lr) = self.training.learning_rate {
            if !(lr.is_finite() && lr > 0.0) {
                return Err(format!("training.learning_rate must be positive, got {lr}"));
            }
        }

        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                return Err(format!(
                    "output.format must be 'json' or 'jsonl', got '{f}'"
                ));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        // Detection
        self.detection.mirror = other.detection.mirror.or(self.detection.mirror);
        self.detection.max_hands = other.detection.max_hands.or(self.detection.max_hands);
        self.detection.min_detection_confidence = other
            .detection
            .min_detection_confidence
            .or(self.detection.min_detection_confidence);

        // Training
        self.training.corpus = other
            .training
            .corpus
            .or_else(|| self.training.corpus.take());
        self.training.epochs = other.training.epochs.or(self.training.epochs);
        self.training.batch_size = other.training.batch_size.or(self.training.batch_size);
        self.training.validation_split = other
            .training
            .validation_split
            .or(self.training.validation_split);
        self.training.seed = other.training.seed.or(self.training.seed);
        self.training.learning_rate = other
            .training
            .learning_rate
            .or(self.training.learning_rate);

        // Models
        self.models.dir = other.models.dir.or_else(|| self.models.dir.take());

        // Output
        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("signconnect").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.signconnect.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG))
        .find(|path| path.exists())
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
