//! Predict command - recognize the sign in each image.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use clap::{Args, ValueEnum};
use signconnect_core::inference::get_device;
use signconnect_core::{PredictionRecord, ResultOutput, SignPrediction, SignService};
use tracing::{debug, info, warn};

use super::{DetectionArgs, ExitCode};
use crate::config::AppConfig;
use crate::output::JsonOutput;

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON array
    Json,
}

/// Arguments for the predict command.
#[derive(Args, Clone)]
pub struct PredictArgs {
    /// Image files to classify
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    #[command(flatten)]
    pub detection: DetectionArgs,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,
}

impl PredictArgs {
    /// Apply configuration file values, respecting CLI precedence.
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }
        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }

        args.detection = args.detection.with_config(config);
        args
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

/// Run the predict command.
///
/// Models that fail to load do not abort the command: every image then gets
/// the corresponding sentinel record and the exit code reports degradation.
pub fn run(args: &PredictArgs) -> Result<ExitCode> {
    let models_dir = args.detection.models_dir();
    let service = SignService::load(&models_dir, args.detection.extractor_config(), &get_device());
    if !service.is_model_loaded() || !service.is_tracker_loaded() {
        warn!(
            "Running degraded: model loaded = {}, tracker loaded = {}",
            service.is_model_loaded(),
            service.is_tracker_loaded()
        );
    }

    let output = JsonOutput::stdout();
    let exit_code = match args.format() {
        OutputFormat::Jsonl => process_images(&service, &args.images, &output)?,
        OutputFormat::Json => {
            let collected = Collected::default();
            let code = process_images(&service, &args.images, &collected)?;
            output.write_array(&collected.take(), args.pretty)?;
            code
        }
    };
    output.flush()?;
    Ok(exit_code)
}

/// Buffers records so they can be written as one JSON array.
#[derive(Default)]
struct Collected(Mutex<Vec<PredictionRecord>>);

impl Collected {
    fn take(&self) -> Vec<PredictionRecord> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ResultOutput for Collected {
    fn write(&self, record: &PredictionRecord) -> Result<()> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Classifies every image and writes one record per image.
fn process_images(
    service: &SignService,
    images: &[PathBuf],
    output: &dyn ResultOutput,
) -> Result<ExitCode> {
    info!("Predicting {} image(s)", images.len());

    let mut degraded = 0usize;
    for path in images {
        let prediction = match std::fs::read(path) {
            Ok(bytes) => service.predict_sign(&bytes),
            Err(e) => {
                warn!("Failed to read {}: {e}", path.display());
                SignPrediction::error(format!("Could not read file: {e}"))
            }
        };
        debug!("{}: {} ({:.3})", path.display(), prediction.label, prediction.confidence);

        if prediction.is_degraded() {
            degraded += 1;
        }

        output.write(&PredictionRecord {
            path: path.to_string_lossy().into_owned(),
            prediction,
        })?;
    }

    info!("{} of {} predictions degraded", degraded, images.len());
    Ok(if degraded > 0 {
        ExitCode::Degraded
    } else {
        ExitCode::Success
    })
}
