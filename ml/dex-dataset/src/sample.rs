//! Dataset sample type.

use std::path::PathBuf;

use dex_types::{ImageDims, Species};
use serde::{Deserialize, Serialize};

/// A single labelled image held in memory.
///
/// # Image Format
///
/// The image is a flat `Vec<f32>` in CHW (Channel-Height-Width) layout,
/// scaled to `[0, 1]`.
///
/// # Example
///
/// ```
/// use dex_dataset::ImageSample;
/// use dex_types::{ImageDims, Species};
///
/// let dims = ImageDims::square_rgb(8);
/// let sample = ImageSample::new(7, Species::Charmander, vec![0.25; dims.pixel_len()]);
///
/// assert!(sample.is_valid(dims));
/// assert_eq!(sample.one_hot(), [0.0, 1.0, 0.0, 0.0, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSample {
    /// Sample ID (position in the shuffled file list).
    pub id: u64,

    /// Source file, when loaded from disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Ground-truth species.
    pub species: Species,

    /// Image data in CHW layout, scaled to `[0, 1]`.
    pub image_chw: Vec<f32>,
}

impl ImageSample {
    /// Creates an in-memory sample.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(id: u64, species: Species, image_chw: Vec<f32>) -> Self {
        Self {
            id,
            path: None,
            species,
            image_chw,
        }
    }

    /// Records the file the sample was decoded from.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Class index of the label.
    #[must_use]
    pub const fn label(&self) -> usize {
        self.species.index()
    }

    /// One-hot label vector.
    #[must_use]
    pub fn one_hot(&self) -> [f32; Species::COUNT] {
        self.species.one_hot()
    }

    /// Returns `true` if the image has the expected length and every
    /// value lies in `[0, 1]`.
    #[must_use]
    pub fn is_valid(&self, dims: ImageDims) -> bool {
        self.image_chw.len() == dims.pixel_len()
            && self.image_chw.iter().all(|v| (0.0..=1.0).contains(v))
    }
}
