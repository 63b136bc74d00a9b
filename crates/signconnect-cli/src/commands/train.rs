//! Train command - fit a sign classifier on a labeled image corpus.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use signconnect_adapters::FsCorpus;
use signconnect_core::inference::{get_device, HandTracker};
use signconnect_core::{ArtifactPaths, CorpusSource, LandmarkExtractor, Trainer, TrainingConfig};
use tracing::{debug, info};

use super::{DetectionArgs, ExitCode};
use crate::config::AppConfig;
use crate::output::ProgressBar;

/// Arguments for the train command.
#[derive(Args, Clone)]
pub struct TrainArgs {
    /// Corpus root directories, each holding one folder per label
    pub roots: Vec<PathBuf>,

    /// Directory to write the trained artifacts to (defaults to the models directory)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Number of training epochs
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Mini-batch size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Seed for the split, initialisation and shuffling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of each label held out for validation (0.0-1.0)
    #[arg(long)]
    pub validation_split: Option<f32>,

    /// Adam learning rate
    #[arg(long)]
    pub learning_rate: Option<f64>,

    #[command(flatten)]
    pub detection: DetectionArgs,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl TrainArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in [`TrainingConfig::default`])
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if args.roots.is_empty() {
            args.roots = config.training.corpus.clone().unwrap_or_default();
        }

        args.epochs = args.epochs.or(config.training.epochs);
        args.batch_size = args.batch_size.or(config.training.batch_size);
        args.seed = args.seed.or(config.training.seed);
        args.validation_split = args.validation_split.or(config.training.validation_split);
        args.learning_rate = args.learning_rate.or(config.training.learning_rate);

        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }

        args.detection = args.detection.with_config(config);
        args
    }

    /// Hyper-parameters with fallback to the built-in defaults.
    fn training_config(&self) -> TrainingConfig {
        let defaults = TrainingConfig::default();
        TrainingConfig {
            epochs: self.epochs.unwrap_or(defaults.epochs),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            validation_split: self.validation_split.unwrap_or(defaults.validation_split),
            learning_rate: self.learning_rate.unwrap_or(defaults.learning_rate),
            seed: self.seed.unwrap_or(defaults.seed),
        }
    }

    /// Output directory with fallback to the models directory.
    fn output_dir(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.detection.models_dir())
    }
}

/// Run the train command.
///
/// Expects `args` to have been processed through `with_config()` first.
pub fn run(args: &TrainArgs) -> Result<ExitCode> {
    if args.roots.is_empty() {
        anyhow::bail!("No corpus roots specified (pass them as arguments or set training.corpus)");
    }

    let config = args.training_config();
    config.validate()?;

    let models_dir = args.detection.models_dir();
    let output_dir = args.output_dir();
    info!(
        "Training on {} root(s), writing to {}",
        args.roots.len(),
        output_dir.display()
    );

    let device = get_device();
    let paths = ArtifactPaths::in_dir(&models_dir);
    let tracker = HandTracker::load(&paths.palm_detection, &paths.hand_landmark)
        .with_context(|| {
            format!(
                "Hand tracking models not available in {}",
                models_dir.display()
            )
        })?;
    let extractor = LandmarkExtractor::new(Box::new(tracker), args.detection.extractor_config());
    debug!("Extractor settings: {:?}", extractor.config());

    let corpus = FsCorpus::new(args.roots.clone());
    let total = corpus.count_hint();

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress = ProgressBar::new(total.map(|t| t as u64), args.quiet, show_progress);

    let report = Trainer::new(&extractor, config, device).run(&corpus, &output_dir, &progress)?;

    let summary = serde_json::json!({
        "output": output_dir,
        "labels": report.registry.to_label_map(),
        "scanned": report.scanned,
        "skipped": report.skipped,
        "no_hand": report.no_hand,
        "train_samples": report.train_samples,
        "val_samples": report.val_samples,
        "metrics": report.metrics,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(ExitCode::Success)
}
