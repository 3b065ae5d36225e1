//! `dex`: train the Pokédex CNN or classify an image with it.
//!
//! # Modes
//!
//! - `dex -t` - Train from scratch, save to `Serial/dex-model.bin`
//! - `dex --train2` - Restore the checkpoint and keep training
//! - `dex -c <image>` - Print `<species> (<confidence>%)`
//!
//! Settings come from `--config <file.json>` (or the defaults) with any
//! override flags applied on top. `RUST_LOG` controls log verbosity.

mod cli;

use anyhow::{Context, Result};
use burn::prelude::Backend;
use burn_autodiff::Autodiff;
use burn_ndarray::NdArray;
use clap::Parser;
use dex_models::BackendType;
use dex_training::{
    DexConfig, TrainingOutcome, classify_file, continue_training, train_from_scratch,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Mode};

const NO_MODE: &str =
    "[PLEASE PROVIDE A FLAG TO SPECIFY WHICH MODE TO RUN THE SCRIPT. SEE --help FOR MORE INFO.]";

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let Some(mode) = cli.mode() else {
        println!("{NO_MODE}");
        return Ok(());
    };

    let config = cli.load_config()?;
    config.validate().context("invalid configuration")?;
    debug!(?config, "Resolved configuration");

    match config.backend {
        BackendType::NdArray => run::<NdArray<f32>>(&mode, &config, &Default::default()),
        BackendType::Wgpu => run_wgpu(&mode, &config),
    }
}

#[cfg(feature = "wgpu")]
fn run_wgpu(mode: &Mode, config: &DexConfig) -> Result<()> {
    run::<burn_wgpu::Wgpu>(mode, config, &burn_wgpu::WgpuDevice::default())
}

#[cfg(not(feature = "wgpu"))]
fn run_wgpu(_mode: &Mode, _config: &DexConfig) -> Result<()> {
    anyhow::bail!(dex_models::ModelError::backend_unavailable(
        "dex was built without the `wgpu` feature"
    ))
}

fn run<B: Backend>(mode: &Mode, config: &DexConfig, device: &B::Device) -> Result<()> {
    info!(backend = %config.backend, "Using backend");
    match mode {
        Mode::Train => {
            let outcome = train_from_scratch::<Autodiff<B>>(config, device)
                .context("training from scratch failed")?;
            println!("{}", report(&outcome));
        }
        Mode::Continue => {
            let outcome = continue_training::<Autodiff<B>>(config, device).with_context(|| {
                format!(
                    "continuing training from {} failed",
                    config.checkpoint.display()
                )
            })?;
            println!("{}", report(&outcome));
        }
        Mode::Classify(image) => {
            let prediction = classify_file::<B>(config, image, device)
                .with_context(|| format!("classifying {} failed", image.display()))?;
            for (species, p) in prediction.ranked() {
                debug!("{species:<12} {:>6.2}%", p * 100.0);
            }
            println!("{prediction}");
        }
    }
    Ok(())
}

/// End-of-run text for stdout. The checkpoint path is already logged by the
/// pipeline, so only the dataset table and final accuracy are printed.
fn report(outcome: &TrainingOutcome) -> String {
    let mut text = outcome.dataset.to_string();
    if let Some(acc) = outcome.metrics.final_test_accuracy {
        text.push_str(&format!(
            "\nTest Accuracy: {acc:.5} (majority baseline {:.5})",
            outcome.dataset.majority_baseline()
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_dataset::DatasetSummary;
    use dex_training::TrainingMetrics;
    use std::path::PathBuf;

    fn outcome(final_test_accuracy: Option<f32>) -> TrainingOutcome {
        let mut metrics = TrainingMetrics::new();
        metrics.final_test_accuracy = final_test_accuracy;
        TrainingOutcome {
            checkpoint: PathBuf::from("Serial/dex-model.bin"),
            model_config: PathBuf::from("Serial/dex-model.config.json"),
            metrics_file: PathBuf::from("Serial/training-metrics.json"),
            metrics,
            dataset: DatasetSummary {
                total_samples: 10,
                train_samples: 8,
                test_samples: 2,
                skipped_files: 1,
                train_distribution: [4, 1, 1, 1, 1],
                test_distribution: [1, 0, 0, 1, 0],
            },
        }
    }

    #[test]
    fn report_shows_dataset_and_accuracy_once() {
        let text = report(&outcome(Some(0.5)));
        assert!(text.contains("skipped 1"));
        assert!(text.contains("Test Accuracy: 0.50000 (majority baseline 0.50000)"));
        assert!(!text.contains("Model saved in file"));
    }

    #[test]
    fn report_without_test_split() {
        let text = report(&outcome(None));
        assert!(!text.contains("Test Accuracy"));
    }
}
