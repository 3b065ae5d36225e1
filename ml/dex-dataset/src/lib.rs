//! Dataset loading and batching for the Pokédex classifier.
//!
//! # Loading
//!
//! - [`discover_images`] - Recursively find `.png`/`.jpg` files under a root
//! - [`label_for_path`] - Species label from the parent directory name
//! - [`load_image`] - Decode, resize and scale one image to CHW `f32`
//! - [`PokemonDataset`] - The whole dataset in memory, split into train/test
//!
//! # Splitting
//!
//! - [`SplitRatio`] - Train fraction
//! - [`split_dataset`] - Seeded random split
//! - [`split_stratified`] - Seeded split that preserves species proportions
//!
//! # Batching
//!
//! - [`CircularCursor`] - Circular index into an in-memory array
//! - [`ImageBatch`] - NCHW images plus labels for one step
//!
//! # Example
//!
//! ```
//! use dex_dataset::{ImageSample, PokemonDataset, SplitRatio};
//! use dex_types::{ImageDims, Species};
//!
//! let dims = ImageDims::square_rgb(4);
//! let samples: Vec<ImageSample> = (0..10)
//!     .map(|i| ImageSample::new(i, Species::ALL[i as usize % 5], vec![0.5; dims.pixel_len()]))
//!     .collect();
//!
//! let mut dataset = PokemonDataset::from_samples(samples, dims, SplitRatio::EIGHTY_TWENTY, Some(42), false).unwrap();
//! assert_eq!(dataset.train_len(), 8);
//!
//! let batch = dataset.next_batch_train(4).unwrap();
//! assert_eq!(batch.len(), 4);
//! assert_eq!(batch.images.len(), 4 * dims.pixel_len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod batch;
mod dataset;
mod discover;
mod error;
mod sample;
mod splits;
mod summary;

pub use batch::{CircularCursor, ImageBatch};
pub use dataset::{LoaderConfig, PokemonDataset};
pub use discover::{
    IMAGE_EXTENSIONS, decode_image, discover_images, is_image_file, label_for_path, load_image,
};
pub use sample::ImageSample;
pub use splits::{SplitRatio, split_dataset, split_stratified};
pub use summary::DatasetSummary;

pub use error::{DatasetError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        CircularCursor, DatasetError, DatasetSummary, ImageBatch, ImageSample, LoaderConfig,
        PokemonDataset, SplitRatio, discover_images, load_image, split_dataset, split_stratified,
    };
}
