//! Training configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};

/// Configuration for a training run.
///
/// # Example
///
/// ```
/// use dex_training::TrainingConfig;
///
/// let config = TrainingConfig::default();
/// assert_eq!(config.epochs, 100);
/// assert_eq!(config.batch_size, 32);
/// assert_eq!(config.val_frequency, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Passes over `dataset.size() / batch_size` batches.
    pub epochs: usize,

    /// Images per optimizer step.
    pub batch_size: usize,

    /// Adam settings.
    pub optimizer: OptimizerConfig,

    /// How the rate moves from epoch to epoch.
    pub lr_schedule: LearningRateSchedule,

    /// Test accuracy is measured when `epoch % val_frequency == 0` (0-indexed).
    pub val_frequency: usize,

    /// Test batches drawn per accuracy check.
    pub val_batches: usize,

    /// Epochs between intermediate checkpoints (0 = only at the end).
    pub checkpoint_frequency: usize,

    /// Seed for weight initialisation and dropout.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new(100)
    }
}

impl TrainingConfig {
    /// Defaults for everything but the epoch count.
    #[must_use]
    pub const fn new(epochs: usize) -> Self {
        Self {
            epochs,
            batch_size: 32,
            optimizer: OptimizerConfig::adam(1e-3),
            lr_schedule: LearningRateSchedule::Constant,
            val_frequency: 5,
            val_batches: 1,
            checkpoint_frequency: 0,
            seed: 42,
        }
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the base learning rate, keeping betas and epsilon.
    #[must_use]
    pub const fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.optimizer.learning_rate = learning_rate;
        self
    }

    /// Sets the learning rate schedule.
    #[must_use]
    pub const fn with_lr_schedule(mut self, schedule: LearningRateSchedule) -> Self {
        self.lr_schedule = schedule;
        self
    }

    /// Measures test accuracy every `val_frequency` epochs.
    #[must_use]
    pub const fn with_val_frequency(mut self, val_frequency: usize) -> Self {
        self.val_frequency = val_frequency;
        self
    }

    /// Saves an intermediate checkpoint every `checkpoint_frequency` epochs.
    #[must_use]
    pub const fn with_checkpoint_frequency(mut self, checkpoint_frequency: usize) -> Self {
        self.checkpoint_frequency = checkpoint_frequency;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Shorthand for `validate().is_ok()`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Checks every field.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
            ("val_frequency", self.val_frequency),
            ("val_batches", self.val_batches),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(TrainingError::invalid_config(format!("{name} must be > 0")));
        }
        self.optimizer
            .check()
            .and_then(|()| self.lr_schedule.check())
            .map_err(TrainingError::invalid_config)
    }
}

/// Adam settings, mirrored onto `burn::optim::AdamConfig`.
///
/// ```
/// use dex_training::OptimizerConfig;
///
/// let adam = OptimizerConfig::adam(1e-3);
/// assert!((adam.beta2 - 0.999).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Step size before scheduling.
    pub learning_rate: f32,
    /// L2 penalty; 0 leaves it off.
    pub weight_decay: f32,
    /// First moment decay.
    pub beta1: f32,
    /// Second moment decay.
    pub beta2: f32,
    /// Added to the denominator.
    pub epsilon: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::adam(1e-3)
    }
}

impl OptimizerConfig {
    /// Adam with the usual betas and no weight decay.
    #[must_use]
    pub const fn adam(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            weight_decay: 0.0,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }

    /// Turns on L2 weight decay.
    #[must_use]
    pub const fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// `true` when every setting is in range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(format!(
                "learning_rate must be > 0, got {}",
                self.learning_rate
            ));
        }
        if self.weight_decay < 0.0 {
            return Err(format!(
                "weight_decay must be >= 0, got {}",
                self.weight_decay
            ));
        }
        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(format!("{name} must be in [0, 1), got {beta}"));
            }
        }
        if self.epsilon.is_nan() || self.epsilon <= 0.0 {
            return Err(format!("epsilon must be > 0, got {}", self.epsilon));
        }
        Ok(())
    }
}

/// Per-epoch learning rate.
///
/// Serialized as `{"step": {"gamma": 0.5, "every": 10}}` and so on; the
/// unit variant is just `"constant"`.
///
/// ```
/// use dex_training::LearningRateSchedule;
///
/// let schedule = LearningRateSchedule::step(0.1, 30);
/// assert!((schedule.compute_lr(1.0, 30, 100) - 0.1).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LearningRateSchedule {
    /// The base rate throughout.
    #[default]
    Constant,

    /// Multiply by `gamma` once every `every` epochs.
    Step {
        /// Multiplier per step.
        gamma: f32,
        /// Epochs per step.
        every: usize,
    },

    /// Multiply by `gamma` after every epoch.
    Exponential {
        /// Multiplier per epoch.
        gamma: f32,
    },

    /// Half a cosine from the base rate down to `floor` over the run.
    Cosine {
        /// Rate reached on the final epoch boundary.
        floor: f32,
    },
}

impl LearningRateSchedule {
    /// Step decay by `gamma` every `every` epochs.
    #[must_use]
    pub const fn step(gamma: f32, every: usize) -> Self {
        Self::Step { gamma, every }
    }

    /// Exponential decay by `gamma` per epoch.
    #[must_use]
    pub const fn exponential(gamma: f32) -> Self {
        Self::Exponential { gamma }
    }

    /// Cosine annealing down to `floor`.
    #[must_use]
    pub const fn cosine(floor: f32) -> Self {
        Self::Cosine { floor }
    }

    /// `true` when every setting is in range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    fn check(&self) -> std::result::Result<(), String> {
        match *self {
            Self::Constant => Ok(()),
            Self::Step { every: 0, .. } => Err("step schedule needs every > 0".into()),
            Self::Step { gamma, .. } | Self::Exponential { gamma }
                if gamma.is_nan() || gamma <= 0.0 =>
            {
                Err(format!("schedule gamma must be > 0, got {gamma}"))
            }
            Self::Cosine { floor } if floor < 0.0 => {
                Err(format!("cosine floor must be >= 0, got {floor}"))
            }
            _ => Ok(()),
        }
    }

    /// Rate for 0-indexed `epoch` of a `total_epochs` run.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap
    )]
    pub fn compute_lr(&self, base_lr: f32, epoch: usize, total_epochs: usize) -> f32 {
        let decays = |gamma: f32, n: usize| base_lr * gamma.powi(n as i32);
        match *self {
            Self::Constant => base_lr,
            Self::Step { gamma, every } => decays(gamma, epoch / every.max(1)),
            Self::Exponential { gamma } => decays(gamma, epoch),
            Self::Cosine { floor } => {
                let t = (epoch as f32 / total_epochs.max(1) as f32).min(1.0);
                floor + 0.5 * (base_lr - floor) * (1.0 + (std::f32::consts::PI * t).cos())
            }
        }
    }
}
