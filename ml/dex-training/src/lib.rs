//! Training, evaluation and run modes for the Pokédex classifier.
//!
//! # Training Components
//!
//! - [`TrainingConfig`] - Epochs, batch size, optimizer, schedule, cadence
//! - [`Trainer`] - Adam + softmax cross-entropy loop over circular batches
//! - [`TrainingMetrics`] - Per-epoch cost and test accuracy
//!
//! # Run Modes
//!
//! - [`train_from_scratch`] - Fresh weights, train, save
//! - [`continue_training`] - Restore the checkpoint, train further, save
//! - [`classify_file`] - Restore the checkpoint, classify one image
//!
//! All three take a [`DexConfig`], which can be read from a JSON file.
//!
//! # Example
//!
//! ```ignore
//! use burn_autodiff::Autodiff;
//! use burn_ndarray::NdArray;
//! use dex_training::{DexConfig, train_from_scratch};
//!
//! let config = DexConfig::default();
//! let outcome = train_from_scratch::<Autodiff<NdArray>>(&config, &Default::default())?;
//! println!("{}", outcome.metrics.summary());
//! ```
//!
//! # Quality Standards
//!
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod error;
mod loss;
mod metrics;
mod pipeline;
mod run_config;
mod trainer;

pub use config::{LearningRateSchedule, OptimizerConfig, TrainingConfig};

pub use loss::{correct_count, cross_entropy, labels_to_tensor};

pub use metrics::{EpochMetrics, TrainingMetrics};

pub use trainer::{Trainer, evaluate};

pub use pipeline::{
    TrainingOutcome, classify_file, continue_training, restore_model, train_from_scratch,
};

pub use run_config::{DexConfig, METRICS_FILE};

pub use error::{Result, TrainingError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        DexConfig, EpochMetrics, LearningRateSchedule, OptimizerConfig, Trainer, TrainingConfig,
        TrainingError, TrainingMetrics, TrainingOutcome, classify_file, continue_training,
        evaluate, train_from_scratch,
    };
}
