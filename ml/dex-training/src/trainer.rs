//! Training loop implementation.

use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::Backend;
use burn::tensor::ElementConversion;
use burn::tensor::backend::AutodiffBackend;
use dex_dataset::{ImageBatch, PokemonDataset};
use dex_models::{DexCnn, images_to_tensor};
use tracing::{debug, info, warn};

use crate::config::TrainingConfig;
use crate::error::{Result, TrainingError};
use crate::loss::{correct_count, cross_entropy, labels_to_tensor};
use crate::metrics::{EpochMetrics, TrainingMetrics};

/// Runs the training loop over an in-memory [`PokemonDataset`].
///
/// # Example
///
/// ```
/// use dex_training::{Trainer, TrainingConfig};
///
/// let trainer = Trainer::new(TrainingConfig::new(10).with_batch_size(8));
/// assert_eq!(trainer.config().epochs, 10);
/// assert_eq!(trainer.num_batches(100), 12);
/// assert!(trainer.should_validate(0));
/// assert!(!trainer.should_validate(1));
/// ```
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(TrainingConfig::default())
    }
}

impl Trainer {
    /// Creates a new trainer with the given config.
    #[must_use]
    pub const fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Returns the training configuration.
    #[must_use]
    pub const fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Learning rate for a 0-indexed epoch.
    #[must_use]
    pub fn compute_lr(&self, epoch: usize) -> f32 {
        self.config.lr_schedule.compute_lr(
            self.config.optimizer.learning_rate,
            epoch,
            self.config.epochs,
        )
    }

    /// Whether test accuracy is measured after this 0-indexed epoch.
    #[must_use]
    pub const fn should_validate(&self, epoch: usize) -> bool {
        self.config.val_frequency > 0 && epoch % self.config.val_frequency == 0
    }

    /// Whether an intermediate checkpoint is due after this 0-indexed epoch.
    #[must_use]
    pub const fn should_checkpoint(&self, epoch: usize) -> bool {
        self.config.checkpoint_frequency > 0
            && (epoch + 1) % self.config.checkpoint_frequency == 0
            && epoch + 1 < self.config.epochs
    }

    /// Batches per epoch: the whole dataset size over the batch size, at least one.
    #[must_use]
    pub const fn num_batches(&self, dataset_size: usize) -> usize {
        if self.config.batch_size == 0 {
            return 0;
        }
        let n = dataset_size / self.config.batch_size;
        if n == 0 { 1 } else { n }
    }

    fn adam(&self) -> AdamConfig {
        let opt = &self.config.optimizer;
        let adam = AdamConfig::new()
            .with_beta_1(opt.beta1)
            .with_beta_2(opt.beta2)
            .with_epsilon(opt.epsilon);
        if opt.weight_decay > 0.0 {
            adam.with_weight_decay(Some(WeightDecayConfig::new(opt.weight_decay)))
        } else {
            adam
        }
    }

    /// Trains `model` for the configured number of epochs.
    ///
    /// # Errors
    ///
    /// See [`Self::fit_with`].
    pub fn fit<B: AutodiffBackend>(
        &self,
        model: DexCnn<B>,
        dataset: &mut PokemonDataset,
        device: &B::Device,
    ) -> Result<(DexCnn<B>, TrainingMetrics)> {
        self.fit_with(model, dataset, device, |_, _| Ok(()))
    }

    /// Trains `model`, calling `on_checkpoint(model, epoch)` whenever an
    /// intermediate checkpoint is due (`epoch` is 1-indexed).
    ///
    /// Each epoch draws [`Self::num_batches`] circular batches from the
    /// training split. Test accuracy is logged on epochs selected by
    /// [`Self::should_validate`] and, when the split is non-empty, measured
    /// once more over the entire test split at the end.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] for a bad config,
    /// [`TrainingError::Dataset`] if the training split is empty,
    /// [`TrainingError::NumericalInstability`] if the cost stops being
    /// finite, or any error raised by `on_checkpoint`.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn fit_with<B, F>(
        &self,
        mut model: DexCnn<B>,
        dataset: &mut PokemonDataset,
        device: &B::Device,
        mut on_checkpoint: F,
    ) -> Result<(DexCnn<B>, TrainingMetrics)>
    where
        B: AutodiffBackend,
        F: FnMut(&DexCnn<B>, usize) -> Result<()>,
    {
        self.config.validate()?;
        if dataset.train_len() == 0 {
            return Err(TrainingError::dataset("training split is empty"));
        }

        let batch_size = self.config.batch_size.min(dataset.train_len());
        if batch_size < self.config.batch_size {
            warn!(
                requested = self.config.batch_size,
                used = batch_size,
                "Training split smaller than batch size"
            );
        }
        let num_batches = self.num_batches(dataset.size());
        let mut optim = self.adam().init::<B, DexCnn<B>>();
        let mut metrics = TrainingMetrics::new();

        info!(
            epochs = self.config.epochs,
            batch_size,
            num_batches,
            train = dataset.train_len(),
            test = dataset.test_len(),
            "Starting training"
        );

        for epoch in 0..self.config.epochs {
            let start = Instant::now();
            let lr = self.compute_lr(epoch);
            let mut cost = 0.0_f64;

            for step in 0..num_batches {
                let ImageBatch {
                    images,
                    labels,
                    dims,
                    ..
                } = dataset.next_batch_train(batch_size)?;
                let input = images_to_tensor::<B>(images, dims, device)?;
                let targets = labels_to_tensor::<B>(&labels, device);

                let loss = cross_entropy(model.forward(input), targets);
                let value: f64 = loss.clone().into_scalar().elem();
                if !value.is_finite() {
                    return Err(TrainingError::numerical_instability(format!(
                        "cost is {value} at epoch {} batch {}",
                        epoch + 1,
                        step + 1
                    )));
                }

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(f64::from(lr), model, grads);
                cost += value;
            }

            let avg_cost = (cost / num_batches as f64) as f32;
            info!("Epoch: {} cost = {:.5}", epoch + 1, avg_cost);

            let test_accuracy = if self.should_validate(epoch) && dataset.test_len() > 0 {
                let acc = self.sample_accuracy(&model.valid(), dataset, device)?;
                info!("Test Accuracy: {acc:.5}");
                Some(acc)
            } else {
                None
            };

            metrics.add_epoch(
                EpochMetrics::new(epoch + 1, avg_cost, test_accuracy)
                    .with_learning_rate(lr)
                    .with_train_time(start.elapsed().as_secs_f32())
                    .with_samples(num_batches * batch_size),
            );

            if self.should_checkpoint(epoch) {
                on_checkpoint(&model, epoch + 1)?;
            }
        }

        info!("Training complete!");

        if dataset.test_len() > 0 {
            let acc = evaluate(&model.valid(), dataset, self.config.batch_size, device)?;
            info!(accuracy = acc, "Final test accuracy");
            metrics.final_test_accuracy = Some(acc);
        }

        Ok((model, metrics))
    }

    /// Accuracy on `val_batches` circular test batches.
    #[allow(clippy::cast_precision_loss)]
    fn sample_accuracy<B: Backend>(
        &self,
        model: &DexCnn<B>,
        dataset: &mut PokemonDataset,
        device: &B::Device,
    ) -> Result<f32> {
        let batch_size = self.config.batch_size.min(dataset.test_len());
        let mut correct = 0;
        let mut total = 0;

        for _ in 0..self.config.val_batches {
            let ImageBatch {
                images,
                labels,
                dims,
                ..
            } = dataset.next_batch_test(batch_size)?;
            let input = images_to_tensor::<B>(images, dims, device)?;
            total += labels.len();
            correct += correct_count(model.forward(input), labels_to_tensor::<B>(&labels, device));
        }

        debug!(correct, total, "Sampled test accuracy");
        Ok(if total == 0 {
            0.0
        } else {
            correct as f32 / total as f32
        })
    }
}

/// Accuracy over the whole test split, in order.
///
/// # Errors
///
/// Returns [`TrainingError::Dataset`] if the test split is empty or the
/// batch size is zero.
#[allow(clippy::cast_precision_loss)]
pub fn evaluate<B: Backend>(
    model: &DexCnn<B>,
    dataset: &PokemonDataset,
    batch_size: usize,
    device: &B::Device,
) -> Result<f32> {
    if dataset.test_len() == 0 {
        return Err(TrainingError::dataset("test split is empty"));
    }

    let mut correct = 0;
    let mut total = 0;
    for batch in dataset.test_batches(batch_size)? {
        let ImageBatch {
            images,
            labels,
            dims,
            ..
        } = batch?;
        let input = images_to_tensor::<B>(images, dims, device)?;
        total += labels.len();
        correct += correct_count(model.forward(input), labels_to_tensor::<B>(&labels, device));
    }

    Ok(correct as f32 / total as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;
    use dex_dataset::{ImageSample, SplitRatio};
    use dex_models::DexCnnConfig;
    use dex_types::{ImageDims, Species};

    type TestBackend = NdArray<f32>;
    type TrainBackend = Autodiff<TestBackend>;

    const DIMS: ImageDims = ImageDims::square_rgb(48);

    /// Each species gets its own flat colour so a few steps can separate them.
    #[allow(clippy::cast_precision_loss)]
    fn toy_dataset(per_species: usize) -> PokemonDataset {
        let mut samples = Vec::new();
        for (i, species) in Species::ALL.into_iter().enumerate() {
            let value = 0.1 + 0.2 * i as f32;
            for j in 0..per_species {
                let id = (i * per_species + j) as u64;
                samples.push(ImageSample::new(id, species, vec![value; DIMS.pixel_len()]));
            }
        }
        PokemonDataset::from_samples(samples, DIMS, SplitRatio::EIGHTY_TWENTY, Some(42), true)
            .unwrap()
    }

    fn toy_model() -> DexCnn<TrainBackend> {
        let config = DexCnnConfig::new(DIMS).with_fc_hidden(16);
        DexCnn::new(&config, &Default::default()).unwrap()
    }

    fn toy_model_without_dropout() -> DexCnn<TrainBackend> {
        let config = DexCnnConfig::new(DIMS)
            .with_fc_hidden(16)
            .with_dropout(0.0, 0.0);
        DexCnn::new(&config, &Default::default()).unwrap()
    }

    #[test]
    fn num_batches_matches_epoch_length() {
        let trainer = Trainer::new(TrainingConfig::new(1).with_batch_size(32));
        assert_eq!(trainer.num_batches(1161), 36);
        assert_eq!(trainer.num_batches(64), 2);
        assert_eq!(trainer.num_batches(10), 1);
    }

    #[test]
    fn validation_cadence() {
        let trainer = Trainer::default();
        let validated: Vec<usize> = (0..12).filter(|&e| trainer.should_validate(e)).collect();
        assert_eq!(validated, vec![0, 5, 10]);
    }

    #[test]
    fn checkpoint_cadence() {
        let trainer = Trainer::new(TrainingConfig::new(10).with_checkpoint_frequency(4));
        let due: Vec<usize> = (0..10).filter(|&e| trainer.should_checkpoint(e)).collect();
        assert_eq!(due, vec![3, 7]);

        assert!(!Trainer::default().should_checkpoint(9));
    }

    #[test]
    fn compute_lr_follows_schedule() {
        let config = TrainingConfig::new(10)
            .with_lr_schedule(crate::config::LearningRateSchedule::step(0.5, 5));
        let trainer = Trainer::new(config);
        assert!((trainer.compute_lr(0) - 1e-3).abs() < 1e-9);
        assert!((trainer.compute_lr(5) - 5e-4).abs() < 1e-9);
    }

    #[test]
    fn fit_records_every_epoch() {
        let mut dataset = toy_dataset(4);
        let trainer = Trainer::new(TrainingConfig::new(2).with_batch_size(4).with_val_frequency(1));

        let (_, metrics) = trainer.fit(toy_model(), &mut dataset, &Default::default()).unwrap();

        assert_eq!(metrics.epochs_completed(), 2);
        assert!(metrics.final_loss().is_finite());
        assert_eq!(metrics.accuracies().len(), 2);
        for (_, acc) in metrics.accuracies() {
            assert!((0.0..=1.0).contains(&acc));
        }
        assert!(metrics.final_test_accuracy.is_some());
    }

    #[test]
    fn fit_reduces_cost_on_separable_data() {
        let mut dataset = toy_dataset(4);
        let trainer = Trainer::new(TrainingConfig::new(8).with_batch_size(4));

        let (_, metrics) = trainer
            .fit(toy_model_without_dropout(), &mut dataset, &Default::default())
            .unwrap();
        assert!(metrics.final_loss() < metrics.initial_loss());
    }

    #[test]
    fn fit_calls_checkpoint_hook() {
        let mut dataset = toy_dataset(2);
        let trainer = Trainer::new(
            TrainingConfig::new(3)
                .with_batch_size(4)
                .with_checkpoint_frequency(1),
        );

        let mut seen = Vec::new();
        trainer
            .fit_with(toy_model(), &mut dataset, &Default::default(), |_, epoch| {
                seen.push(epoch);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn fit_shrinks_oversized_batch() {
        let mut dataset = toy_dataset(1);
        let trainer = Trainer::new(TrainingConfig::new(1));
        let (_, metrics) = trainer.fit(toy_model(), &mut dataset, &Default::default()).unwrap();
        assert_eq!(metrics.epoch_metrics[0].train_samples, dataset.train_len());
    }

    #[test]
    fn fit_stops_on_non_finite_cost() {
        let mut dataset = toy_dataset(2);
        let mut config = DexCnnConfig::new(DIMS)
            .with_fc_hidden(16)
            .with_dropout(0.0, 0.0);
        // Activations overflow f32 by the third conv layer.
        config.init_std = 1e12;
        let model = DexCnn::<TrainBackend>::new(&config, &Default::default()).unwrap();

        let err = Trainer::new(TrainingConfig::new(1).with_batch_size(4))
            .fit(model, &mut dataset, &Default::default())
            .unwrap_err();
        assert!(matches!(err, TrainingError::NumericalInstability(_)), "{err}");
        assert!(err.to_string().contains("epoch 1 batch 1"));
    }

    #[test]
    fn fit_rejects_invalid_config() {
        let mut dataset = toy_dataset(1);
        let trainer = Trainer::new(TrainingConfig::new(0));
        let err = trainer
            .fit(toy_model(), &mut dataset, &Default::default())
            .unwrap_err();
        assert!(matches!(err, TrainingError::InvalidConfig(_)));
    }

    #[test]
    fn evaluate_covers_whole_test_split() {
        let dataset = toy_dataset(5);
        let device = Default::default();
        let model = toy_model().valid();

        let acc = evaluate(&model, &dataset, 3, &device).unwrap();
        assert!((0.0..=1.0).contains(&acc));

        // Accuracy is a multiple of 1 / test_len.
        let scaled = acc * dataset.test_len() as f32;
        assert!((scaled - scaled.round()).abs() < 1e-4);
    }

    #[test]
    fn evaluate_empty_test_split() {
        let dims = DIMS;
        let dataset = PokemonDataset::from_samples(
            vec![ImageSample::new(0, Species::Mewtwo, vec![0.5; dims.pixel_len()])],
            dims,
            SplitRatio::EIGHTY_TWENTY,
            Some(1),
            false,
        )
        .unwrap();
        let model = toy_model().valid();
        assert!(evaluate(&model, &dataset, 4, &Default::default()).is_err());
    }
}
