//! Error types for dex-dataset crate.

use std::path::Path;

use thiserror::Error;

/// Errors that can occur while loading or batching the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Dataset root directory does not exist.
    #[error("dataset root not found: {0}")]
    RootNotFound(String),

    /// Image could not be opened or decoded.
    #[error("failed to decode image {path}: {reason}")]
    ImageDecode {
        /// Path to the image.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Parent directory name is not a known species.
    #[error("cannot label {path}: {reason}")]
    UnknownLabel {
        /// Path to the image.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Image dimensions cannot be used.
    #[error("invalid image dimensions: {0}")]
    InvalidDimensions(String),

    /// Invalid split ratio.
    #[error("invalid split ratio: {0} (must be in (0, 1))")]
    InvalidSplitRatio(f32),

    /// No usable images.
    #[error("dataset is empty")]
    EmptyDataset,

    /// Batch size of zero.
    #[error("batch size must be > 0")]
    InvalidBatchSize,

    /// Batch size larger than the subset it draws from.
    #[error("batch size {batch_size} exceeds {split} split of {len} samples")]
    BatchTooLarge {
        /// Requested batch size.
        batch_size: usize,
        /// Number of samples available.
        len: usize,
        /// Which split was asked (`train` or `test`).
        split: &'static str,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),
}

impl DatasetError {
    /// Creates a root not found error.
    #[must_use]
    pub fn root_not_found(path: &Path) -> Self {
        Self::RootNotFound(path.display().to_string())
    }

    /// Creates an image decode error.
    #[must_use]
    pub fn image_decode(path: &Path, reason: impl Into<String>) -> Self {
        Self::ImageDecode {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an unknown label error.
    #[must_use]
    pub fn unknown_label(path: &Path, reason: impl Into<String>) -> Self {
        Self::UnknownLabel {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid dimensions error.
    #[must_use]
    pub fn invalid_dimensions(reason: impl Into<String>) -> Self {
        Self::InvalidDimensions(reason.into())
    }

    /// Creates an invalid split ratio error.
    #[must_use]
    pub const fn invalid_split_ratio(ratio: f32) -> Self {
        Self::InvalidSplitRatio(ratio)
    }

    /// Creates a batch too large error.
    #[must_use]
    pub const fn batch_too_large(batch_size: usize, len: usize, split: &'static str) -> Self {
        Self::BatchTooLarge {
            batch_size,
            len,
            split,
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for dex-dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
