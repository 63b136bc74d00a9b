//! Progress bar adapter using indicatif.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use signconnect_core::{ProgressEvent, ProgressSink};

/// Progress bar adapter for the training pipeline.
///
/// Tracks feature extraction over the corpus, then switches to epochs once
/// fitting starts.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
}

impl ProgressBar {
    /// Creates a new progress bar.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of corpus images, if known
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show progress bar; otherwise print per-epoch status
    #[must_use]
    pub fn new(total: Option<u64>, quiet: bool, show_bar: bool) -> Self {
        if quiet {
            return Self {
                bar: None,
                quiet: true,
            };
        }

        let bar = if show_bar {
            let bar = total.map_or_else(IndicatifBar::new_spinner, IndicatifBar::new);

            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }

            Some(bar)
        } else {
            None
        };

        Self { bar, quiet }
    }
}

impl ProgressSink for ProgressBar {
    fn on_event(&self, event: ProgressEvent) {
        if self.quiet {
            return;
        }

        match event {
            ProgressEvent::Started { path, index, total } => {
                if let Some(bar) = &self.bar {
                    if let Some(t) = total {
                        bar.set_length(t as u64);
                    }
                    bar.set_position(index as u64);
                    bar.set_message(path);
                }
            }
            ProgressEvent::Extracted { path, has_hand } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                } else if !has_hand {
                    eprintln!("{path}: no hand");
                }
            }
            ProgressEvent::Skipped { path, reason } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
                eprintln!("WARN: Skipping {path}: {reason}");
            }
            ProgressEvent::Epoch {
                epoch,
                epochs,
                metrics,
            } => {
                let val = metrics
                    .val_accuracy
                    .map_or_else(String::new, |acc| format!(", val acc {acc:.3}"));
                let line = format!(
                    "epoch {epoch}/{epochs}: loss {:.4}, acc {:.3}{val}",
                    metrics.train_loss, metrics.train_accuracy
                );
                if let Some(bar) = &self.bar {
                    if epoch == 1 {
                        bar.set_length(epochs as u64);
                    }
                    bar.set_position(epoch as u64);
                    bar.set_message(line);
                } else {
                    eprintln!("{line}");
                }
            }
            ProgressEvent::Finished {
                samples,
                skipped,
                no_hand,
            } => {
                if let Some(bar) = &self.bar {
                    bar.finish_with_message(format!(
                        "Done: {samples} samples, {no_hand} without hand, {skipped} skipped"
                    ));
                }
            }
        }
    }
}
