//! Error types for dex-types crate.

use thiserror::Error;

/// Errors that can occur when building domain types.
#[derive(Debug, Error, PartialEq)]
pub enum TypesError {
    /// Name does not match any known species.
    #[error("unknown species: {0:?}")]
    UnknownSpecies(String),

    /// Class index outside the label set.
    #[error("invalid class index {index}: expected < {max}")]
    InvalidClassIndex {
        /// The invalid index.
        index: usize,
        /// Number of classes.
        max: usize,
    },

    /// Probability vector has the wrong length.
    #[error("probability vector has {actual} entries, expected {expected}")]
    ProbabilityCount {
        /// Expected number of entries.
        expected: usize,
        /// Actual number of entries.
        actual: usize,
    },

    /// Probability vector contains NaN or negative values.
    #[error("invalid probabilities: {0}")]
    InvalidProbabilities(String),
}

impl TypesError {
    /// Creates an unknown species error.
    #[must_use]
    pub fn unknown_species(name: impl Into<String>) -> Self {
        Self::UnknownSpecies(name.into())
    }

    /// Creates an invalid class index error.
    #[must_use]
    pub const fn invalid_class_index(index: usize, max: usize) -> Self {
        Self::InvalidClassIndex { index, max }
    }

    /// Creates a probability count error.
    #[must_use]
    pub const fn probability_count(expected: usize, actual: usize) -> Self {
        Self::ProbabilityCount { expected, actual }
    }

    /// Creates an invalid probabilities error.
    #[must_use]
    pub fn invalid_probabilities(reason: impl Into<String>) -> Self {
        Self::InvalidProbabilities(reason.into())
    }
}

/// Result type for dex-types operations.
pub type Result<T> = std::result::Result<T, TypesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_unknown_species() {
        let err = TypesError::unknown_species("missingno");
        assert!(err.to_string().contains("missingno"));
    }

    #[test]
    fn error_invalid_class_index() {
        let err = TypesError::invalid_class_index(7, 5);
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains("< 5"));
    }

    #[test]
    fn error_probability_count() {
        let err = TypesError::probability_count(5, 3);
        assert!(err.to_string().contains("3 entries"));
    }
}
