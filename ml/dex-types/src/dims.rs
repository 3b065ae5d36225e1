//! Input image geometry.

use serde::{Deserialize, Serialize};

/// Height, width and channel count of a network input image.
///
/// # Example
///
/// ```
/// use dex_types::ImageDims;
///
/// let dims = ImageDims::default();
/// assert_eq!((dims.height, dims.width, dims.channels), (96, 96, 3));
/// assert_eq!(dims.pixel_len(), 96 * 96 * 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageDims {
    /// Height in pixels.
    pub height: usize,

    /// Width in pixels.
    pub width: usize,

    /// Number of colour channels (1 or 3).
    pub channels: usize,
}

impl Default for ImageDims {
    fn default() -> Self {
        Self::new(96, 96, 3)
    }
}

impl ImageDims {
    /// Creates new image dimensions.
    #[must_use]
    pub const fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Creates square RGB dimensions.
    #[must_use]
    pub const fn square_rgb(side: usize) -> Self {
        Self::new(side, side, 3)
    }

    /// Number of `f32` values in one CHW image.
    #[must_use]
    pub const fn pixel_len(&self) -> usize {
        self.channels * self.height * self.width
    }

    /// Returns `[channels, height, width]`.
    #[must_use]
    pub const fn chw(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    /// Returns `true` if all sizes are positive and the channel count is 1 or 3.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.height > 0 && self.width > 0 && (self.channels == 1 || self.channels == 3)
    }
}

impl std::fmt::Display for ImageDims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dims_default_and_len() {
        let dims = ImageDims::default();
        assert!(dims.is_valid());
        assert_eq!(dims.chw(), [3, 96, 96]);
        assert_eq!(dims.to_string(), "96x96x3");
    }

    #[test]
    fn dims_validation() {
        assert!(ImageDims::new(10, 10, 1).is_valid());
        assert!(!ImageDims::new(0, 10, 3).is_valid());
        assert!(!ImageDims::new(10, 10, 4).is_valid());
    }

    #[test]
    fn dims_square() {
        assert_eq!(ImageDims::square_rgb(48).pixel_len(), 48 * 48 * 3);
    }
}
