//! The three run modes: train from scratch, continue training, classify.

use std::path::{Path, PathBuf};

use burn::prelude::Backend;
use burn::tensor::backend::AutodiffBackend;
use dex_dataset::{DatasetSummary, PokemonDataset, load_image};
use dex_models::{
    DexCnn, DexCnnConfig, checkpoint_path, find_checkpoint, load_checkpoint, load_model_config,
    save_checkpoint, save_model_config,
};
use dex_types::Prediction;
use tracing::{info, warn};

use crate::error::{Result, TrainingError};
use crate::metrics::TrainingMetrics;
use crate::run_config::DexConfig;
use crate::trainer::Trainer;

/// What a training mode produced.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Saved weight file.
    pub checkpoint: PathBuf,

    /// Saved model config sidecar.
    pub model_config: PathBuf,

    /// Saved metrics file.
    pub metrics_file: PathBuf,

    /// Per-epoch metrics.
    pub metrics: TrainingMetrics,

    /// Dataset composition used for the run.
    pub dataset: DatasetSummary,
}

/// Trains a freshly initialised network and saves it.
///
/// # Errors
///
/// Returns an error if the config is invalid, the dataset cannot be
/// loaded, training diverges or the checkpoint cannot be written.
pub fn train_from_scratch<B: AutodiffBackend>(
    config: &DexConfig,
    device: &B::Device,
) -> Result<TrainingOutcome> {
    config.validate()?;
    B::seed(config.training.seed);

    let model = DexCnn::<B>::new(&config.model, device)?;
    info!(dims = %config.model.dims, "Initialised new model");
    run_training(config, config.model, model, device)
}

/// Restores the saved network and keeps training it.
///
/// The topology comes from the checkpoint's config sidecar when present,
/// so the loader is switched to the image size the checkpoint was trained on.
///
/// # Errors
///
/// Returns [`TrainingError::Checkpoint`] if no checkpoint exists at the
/// configured stem, plus everything [`train_from_scratch`] can return.
pub fn continue_training<B: AutodiffBackend>(
    config: &DexConfig,
    device: &B::Device,
) -> Result<TrainingOutcome> {
    config.validate()?;
    B::seed(config.training.seed);

    let (model, model_config) = restore_model::<B>(config, device)?;
    let mut config = config.clone();
    config.loader.dims = model_config.dims;
    config.model = model_config;
    run_training(&config, model_config, model, device)
}

/// Restores the saved network and classifies one image file.
///
/// # Errors
///
/// Returns [`TrainingError::Checkpoint`] if no checkpoint exists,
/// [`TrainingError::Dataset`] if the image cannot be decoded, or a model
/// error if inference fails.
pub fn classify_file<B: Backend>(
    config: &DexConfig,
    image: &Path,
    device: &B::Device,
) -> Result<Prediction> {
    let (model, model_config) = restore_model::<B>(config, device)?;
    let pixels = load_image(image, model_config.dims)?;
    let prediction = model.classify(pixels, model_config.dims, device)?;
    info!(
        image = %image.display(),
        species = %prediction.species,
        confidence = prediction.confidence,
        "Classified image"
    );
    Ok(prediction)
}

/// Loads the model config sidecar (falling back to `config.model`) and the
/// weights saved under `config.checkpoint`.
///
/// The configured format is tried first, then any other.
///
/// # Errors
///
/// Returns [`TrainingError::Checkpoint`] if no weight file exists, or a
/// model error if it does not fit the topology.
pub fn restore_model<B: Backend>(
    config: &DexConfig,
    device: &B::Device,
) -> Result<(DexCnn<B>, DexCnnConfig)> {
    let stem = config.checkpoint.as_path();
    let model_config = match load_model_config(stem) {
        Ok(saved) => {
            if saved != config.model {
                warn!("Checkpoint config differs from run config; using the checkpoint's");
            }
            saved
        }
        Err(dex_models::ModelError::CheckpointNotFound(_)) => {
            warn!(stem = %stem.display(), "No model config sidecar; assuming run config");
            config.model
        }
        Err(e) => return Err(e.into()),
    };

    let preferred = checkpoint_path(stem, config.format);
    let path = if preferred.is_file() {
        preferred
    } else {
        find_checkpoint(stem).map(|(path, _)| path).ok_or_else(|| {
            TrainingError::checkpoint(format!("no checkpoint found at {}", stem.display()))
        })?
    };

    let model = load_checkpoint(DexCnn::<B>::new(&model_config, device)?, &path, device)?;
    info!("Model restored from file: {}", path.display());
    Ok((model, model_config))
}

fn run_training<B: AutodiffBackend>(
    config: &DexConfig,
    model_config: DexCnnConfig,
    model: DexCnn<B>,
    device: &B::Device,
) -> Result<TrainingOutcome> {
    let mut dataset = PokemonDataset::load(&config.loader)?;
    info!("[LOADED {} IMAGES]", dataset.size());

    let stem = config.checkpoint.as_path();
    let trainer = Trainer::new(config.training.clone());
    let (model, metrics) = trainer.fit_with(model, &mut dataset, device, |model, epoch| {
        let path = save_checkpoint(model, stem, config.format)?;
        info!(epoch, path = %path.display(), "Intermediate checkpoint");
        Ok(())
    })?;

    let checkpoint = save_checkpoint(&model, stem, config.format)?;
    let model_config_path = save_model_config(&model_config, stem)?;
    let metrics_file = config.metrics_path();
    metrics.save(&metrics_file)?;

    info!("Model saved in file: {}", checkpoint.display());
    info!("\n{}", metrics.summary());

    Ok(TrainingOutcome {
        checkpoint,
        model_config: model_config_path,
        metrics_file,
        metrics,
        dataset: dataset.summary().clone(),
    })
}
