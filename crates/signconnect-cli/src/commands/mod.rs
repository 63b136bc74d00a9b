//! CLI command definitions and handlers.

pub mod models;
pub mod predict;
pub mod train;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use signconnect_core::ExtractorConfig;

use crate::config::AppConfig;

/// SignConnect - Sign language gesture recognition
#[derive(Parser)]
#[command(name = "signconnect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Train a sign classifier from a labeled image corpus
    Train(train::TrainArgs),
    /// Recognize the sign shown in each image
    Predict(predict::PredictArgs),
    /// Inspect model artifacts
    Models(models::ModelsArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every request succeeded.
    Success = 0,
    /// The command ran but some results are sentinels or checks failed.
    Degraded = 1,
    /// The command could not run.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}

/// Parse and validate a threshold value (0.0-1.0).
fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Hand detection arguments shared by `train` and `predict`.
///
/// Both commands must extract features the same way, so they read the same
/// `[detection]` config section.
#[derive(Args, Clone, Default)]
pub struct DetectionArgs {
    /// Minimum hand detection confidence (0.0-1.0)
    #[arg(long, value_parser = parse_threshold)]
    pub min_detection_confidence: Option<f32>,

    /// Do not flip frames horizontally before detection
    #[arg(long)]
    pub no_mirror: bool,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Maximum hands, from config only.
    #[arg(skip)]
    max_hands: Option<usize>,
}

impl DetectionArgs {
    /// Apply configuration file values, respecting CLI precedence.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        // CLI --no-mirror always wins; config can only disable mirroring otherwise
        if !self.no_mirror {
            self.no_mirror = config.detection.mirror == Some(false);
        }
        self.min_detection_confidence = self
            .min_detection_confidence
            .or(config.detection.min_detection_confidence);
        self.max_hands = config.detection.max_hands;
        if self.models_dir.is_none() {
            self.models_dir.clone_from(&config.models.dir);
        }
        self
    }

    /// Builds the extractor settings, falling back to the built-in defaults.
    pub fn extractor_config(&self) -> ExtractorConfig {
        let defaults = ExtractorConfig::default();
        ExtractorConfig {
            mirror: !self.no_mirror,
            max_hands: self.max_hands.unwrap_or(defaults.max_hands),
            min_detection_confidence: self
                .min_detection_confidence
                .unwrap_or(defaults.min_detection_confidence),
        }
    }

    /// Models directory with fallback to the platform data directory.
    pub fn models_dir(&self) -> PathBuf {
        self.models_dir
            .clone()
            .unwrap_or_else(signconnect_adapters::models_dir)
    }
}
