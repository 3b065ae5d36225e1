//! Circular batching over in-memory samples.

use std::ops::Range;

use dex_types::{ImageDims, Species};
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};
use crate::sample::ImageSample;

/// Circular index into an in-memory array.
///
/// Each call hands out the next `batch_size` consecutive indices. When the
/// next window would reach or run past the end of the array the cursor
/// restarts at zero, so every window is full and contiguous; the tail of
/// the array that does not fill a whole window is skipped on that lap.
///
/// # Example
///
/// ```
/// use dex_dataset::CircularCursor;
///
/// let mut cursor = CircularCursor::new();
/// assert_eq!(cursor.next_range(4, 10).unwrap(), 0..4);
/// assert_eq!(cursor.next_range(4, 10).unwrap(), 4..8);
/// // 8 + 4 >= 10, so the window restarts at the front.
/// assert_eq!(cursor.next_range(4, 10).unwrap(), 0..4);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularCursor {
    position: usize,
}

impl CircularCursor {
    /// Creates a cursor at the start of the array.
    #[must_use]
    pub const fn new() -> Self {
        Self { position: 0 }
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Returns the next window of `batch_size` indices into an array of `len`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidBatchSize`] for a zero batch size and
    /// [`DatasetError::BatchTooLarge`] when `batch_size > len`.
    pub fn next_range(&mut self, batch_size: usize, len: usize) -> Result<Range<usize>> {
        if batch_size == 0 {
            return Err(DatasetError::InvalidBatchSize);
        }
        if batch_size > len {
            return Err(DatasetError::batch_too_large(batch_size, len, "requested"));
        }

        if self.position + batch_size >= len {
            self.position = 0;
        }

        let start = self.position;
        self.position = (start + batch_size) % len;
        Ok(start..start + batch_size)
    }
}

/// One batch of network input.
///
/// Images are laid out NCHW and flattened; `labels[i]` and the `i`-th row
/// of `one_hot` describe `images[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBatch {
    /// Flattened NCHW image data.
    pub images: Vec<f32>,

    /// Class index per image.
    pub labels: Vec<usize>,

    /// Flattened `[N, Species::COUNT]` one-hot labels.
    pub one_hot: Vec<f32>,

    /// Geometry of each image.
    pub dims: ImageDims,
}

impl ImageBatch {
    /// Packs samples into a batch.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Validation`] if any sample's image length
    /// disagrees with `dims`.
    pub fn from_samples(samples: &[ImageSample], dims: ImageDims) -> Result<Self> {
        let mut images = Vec::with_capacity(samples.len() * dims.pixel_len());
        let mut labels = Vec::with_capacity(samples.len());
        let mut one_hot = Vec::with_capacity(samples.len() * Species::COUNT);

        for sample in samples {
            if sample.image_chw.len() != dims.pixel_len() {
                return Err(DatasetError::validation(format!(
                    "sample {} has {} values, expected {} for {dims}",
                    sample.id,
                    sample.image_chw.len(),
                    dims.pixel_len()
                )));
            }
            images.extend_from_slice(&sample.image_chw);
            labels.push(sample.label());
            one_hot.extend_from_slice(&sample.one_hot());
        }

        Ok(Self {
            images,
            labels,
            one_hot,
            dims,
        })
    }

    /// Number of images in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` if the batch holds no images.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// NCHW shape of `images`.
    #[must_use]
    pub fn shape(&self) -> [usize; 4] {
        [
            self.len(),
            self.dims.channels,
            self.dims.height,
            self.dims.width,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_wraps_before_overrun() {
        let mut cursor = CircularCursor::new();
        let ranges: Vec<_> = (0..5)
            .map(|_| cursor.next_range(3, 7).unwrap())
            .collect();
        assert_eq!(ranges, vec![0..3, 3..6, 0..3, 3..6, 0..3]);
    }

    #[test]
    fn cursor_exact_fit_restarts_every_call() {
        let mut cursor = CircularCursor::new();
        assert_eq!(cursor.next_range(5, 5).unwrap(), 0..5);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.next_range(5, 5).unwrap(), 0..5);
    }

    #[test]
    fn cursor_even_division_drops_last_window() {
        let mut cursor = CircularCursor::new();
        assert_eq!(cursor.next_range(2, 6).unwrap(), 0..2);
        assert_eq!(cursor.next_range(2, 6).unwrap(), 2..4);
        // 4 + 2 >= 6 restarts; the window 4..6 is never served.
        assert_eq!(cursor.next_range(2, 6).unwrap(), 0..2);
    }

    #[test]
    fn cursor_rejects_bad_sizes() {
        let mut cursor = CircularCursor::new();
        assert!(matches!(
            cursor.next_range(0, 10),
            Err(DatasetError::InvalidBatchSize)
        ));
        assert!(matches!(
            cursor.next_range(11, 10),
            Err(DatasetError::BatchTooLarge { .. })
        ));
    }

    #[test]
    fn cursor_position_tracks_next_start() {
        let mut cursor = CircularCursor::new();
        let _ = cursor.next_range(2, 10);
        assert_eq!(cursor.position(), 2);
        let _ = cursor.next_range(8, 10);
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn batch_fills_every_slot() {
        let dims = ImageDims::new(1, 2, 1);
        let samples = vec![
            ImageSample::new(0, Species::Bulbasaur, vec![0.1, 0.2]),
            ImageSample::new(1, Species::Mewtwo, vec![0.3, 0.4]),
        ];
        let batch = ImageBatch::from_samples(&samples, dims).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.shape(), [2, 1, 1, 2]);
        assert_eq!(batch.images, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(batch.labels, vec![0, 4]);
        assert_eq!(
            batch.one_hot,
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn batch_rejects_mismatched_sample() {
        let dims = ImageDims::new(2, 2, 3);
        let samples = vec![ImageSample::new(9, Species::Pikachu, vec![0.0; 5])];
        assert!(ImageBatch::from_samples(&samples, dims).is_err());
    }
}
