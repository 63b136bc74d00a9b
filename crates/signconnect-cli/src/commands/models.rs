//! Models command - inspect model artifacts.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand};
use signconnect_adapters::models::{
    list_artifacts, models_dir, tracker_installed, verify_artifacts, ChecksumStatus, Verification,
};

use super::ExitCode;
use crate::config::AppConfig;

/// Arguments for the models command
#[derive(Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR", global = true)]
    pub models_dir: Option<PathBuf>,
}

/// Models subcommands
#[derive(Subcommand)]
pub enum ModelsCommand {
    /// List model artifacts and whether they are installed
    List,
    /// Print model directory path
    Path,
    /// Check hand tracking models against the training manifest
    Verify,
}

impl ModelsArgs {
    /// Apply configuration file values, respecting CLI precedence.
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if args.models_dir.is_none() {
            args.models_dir.clone_from(&config.models.dir);
        }
        args
    }

    fn dir(&self) -> PathBuf {
        self.models_dir.clone().unwrap_or_else(models_dir)
    }
}

/// Run the models command.
pub fn run(args: &ModelsArgs) -> Result<ExitCode> {
    let dir = args.dir();
    match args.command {
        ModelsCommand::List => {
            list_models(&dir);
            Ok(ExitCode::Success)
        }
        ModelsCommand::Path => {
            println!("{}", dir.display());
            Ok(ExitCode::Success)
        }
        ModelsCommand::Verify => verify_models(&dir),
    }
}

fn list_models(dir: &Path) {
    let artifacts = list_artifacts(dir);

    println!("Models directory: {}", dir.display());
    println!();

    for artifact in &artifacts {
        let status = if artifact.is_present() { "✓" } else { "✗" };
        match artifact.size {
            Some(size) => println!("  {status} {} ({size} bytes)", artifact.name),
            None => println!("  {status} {}", artifact.name),
        }
    }

    println!();
    let installed = artifacts.iter().filter(|a| a.is_present()).count();
    println!("{installed}/{} artifacts installed", artifacts.len());
    if !tracker_installed(dir) {
        println!("Hand tracking models missing: training and prediction will not find hands.");
    }
}

fn verify_models(dir: &Path) -> Result<ExitCode> {
    let results = verify_artifacts(dir)?;

    for v in &results {
        let sha = v.sha256.as_deref().unwrap_or("-");
        let status = match &v.status {
            ChecksumStatus::Match => "ok".to_string(),
            ChecksumStatus::Mismatch { expected } => format!("MISMATCH (trained with {expected})"),
            ChecksumStatus::Unrecorded => "unrecorded".to_string(),
            ChecksumStatus::Missing => "missing".to_string(),
        };
        println!("{} {sha} {status}", v.name);
    }

    Ok(if results.iter().all(Verification::is_ok) {
        ExitCode::Success
    } else {
        ExitCode::Error
    })
}
