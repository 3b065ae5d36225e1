//! Domain types for the Pokédex classifier.
//!
//! This crate provides the small vocabulary shared by every other crate
//! in the workspace:
//!
//! - [`Species`] - The five Pokémon the network distinguishes
//! - [`ImageDims`] - Input image geometry (height, width, channels)
//! - [`Prediction`] - Classifier output with confidence
//!
//! # Example
//!
//! ```
//! use dex_types::{Prediction, Species};
//!
//! let species = Species::from_name("Pikachu").unwrap();
//! assert_eq!(species.index(), 3);
//!
//! let prediction = Prediction::from_probabilities(&[0.05, 0.05, 0.1, 0.7, 0.1]).unwrap();
//! assert_eq!(prediction.species, Species::Pikachu);
//! assert_eq!(prediction.to_string(), "pikachu (70.00%)");
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

mod dims;
mod error;
mod prediction;
mod species;

pub use dims::ImageDims;
pub use prediction::Prediction;
pub use species::Species;

pub use error::{Result, TypesError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{ImageDims, Prediction, Species, TypesError};
}
