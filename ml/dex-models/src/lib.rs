//! Burn model architecture and checkpoint persistence for the Pokédex classifier.
//!
//! # Model Architecture
//!
//! - [`DexCnn`] - Five-layer convolutional network with a two-layer dense head
//! - [`DexCnnConfig`] - Its hyperparameters (input size, dropout, init)
//!
//! # Checkpoint Persistence
//!
//! Weights are stored with Burn's file recorders:
//! - Binary format (compact, fast)
//! - JSON format (human-readable, debuggable)
//!
//! Next to the weights a `<stem>.config.json` sidecar records the
//! [`DexCnnConfig`] so the exact topology can be rebuilt before loading.
//!
//! # Backend Support
//!
//! Models are generic over Burn backends:
//! - `burn-ndarray` - CPU (default)
//! - `burn-wgpu` - GPU (optional, enabled in the CLI)
//!
//! # Example
//!
//! ```ignore
//! use dex_models::{DexCnn, DexCnnConfig};
//!
//! let device = Default::default();
//! let model = DexCnn::<MyBackend>::new(&DexCnnConfig::default(), &device)?;
//!
//! let images = Tensor::zeros([1, 3, 96, 96], &device);
//! let logits = model.forward(images);
//! assert_eq!(logits.dims(), [1, 5]);
//! ```
//!
//! # Quality Standards
//!
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod backend;
mod checkpoint;
mod cnn;
mod error;

pub use cnn::{DexCnn, DexCnnConfig, images_to_tensor};

pub use checkpoint::{
    CheckpointFormat, checkpoint_path, config_path, find_checkpoint, load_checkpoint,
    load_model_config, save_checkpoint, save_model_config,
};

pub use backend::BackendType;

pub use error::{ModelError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        BackendType, CheckpointFormat, DexCnn, DexCnnConfig, ModelError, find_checkpoint,
        load_checkpoint, load_model_config, save_checkpoint, save_model_config,
    };
}
