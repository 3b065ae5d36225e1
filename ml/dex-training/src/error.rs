//! Error types for dex-training crate.

use thiserror::Error;

/// Errors that can occur during training, evaluation or classification.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// Invalid training configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Dataset error.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Model error.
    #[error("model error: {0}")]
    Model(String),

    /// Checkpoint missing or unusable.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Loss became NaN or infinite.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TrainingError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a dataset error.
    #[must_use]
    pub fn dataset(reason: impl Into<String>) -> Self {
        Self::Dataset(reason.into())
    }

    /// Creates a checkpoint error.
    #[must_use]
    pub fn checkpoint(reason: impl Into<String>) -> Self {
        Self::Checkpoint(reason.into())
    }

    /// Creates a numerical instability error.
    #[must_use]
    pub fn numerical_instability(reason: impl Into<String>) -> Self {
        Self::NumericalInstability(reason.into())
    }
}

impl From<std::io::Error> for TrainingError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TrainingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<dex_dataset::DatasetError> for TrainingError {
    fn from(err: dex_dataset::DatasetError) -> Self {
        Self::Dataset(err.to_string())
    }
}

impl From<dex_models::ModelError> for TrainingError {
    fn from(err: dex_models::ModelError) -> Self {
        match err {
            dex_models::ModelError::CheckpointNotFound(path) => {
                Self::Checkpoint(format!("not found: {path}"))
            }
            other => Self::Model(other.to_string()),
        }
    }
}

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_config() {
        let err = TrainingError::invalid_config("batch size must be > 0");
        assert!(err.to_string().contains("invalid configuration"));
        assert!(err.to_string().contains("batch size"));
    }

    #[test]
    fn error_numerical_instability() {
        let err = TrainingError::numerical_instability("cost is NaN at epoch 3");
        assert!(err.to_string().contains("numerical instability"));
        assert!(err.to_string().contains("epoch 3"));
    }

    #[test]
    fn error_from_dataset_error() {
        let err: TrainingError = dex_dataset::DatasetError::EmptyDataset.into();
        assert!(matches!(err, TrainingError::Dataset(_)));
    }

    #[test]
    fn error_from_missing_checkpoint() {
        let err: TrainingError =
            dex_models::ModelError::checkpoint_not_found("Serial/dex-model.bin").into();
        assert!(matches!(err, TrainingError::Checkpoint(_)));
        assert!(err.to_string().contains("Serial/dex-model.bin"));
    }

    #[test]
    fn error_from_model_error() {
        let err: TrainingError = dex_models::ModelError::invalid_config("fc_hidden").into();
        assert!(matches!(err, TrainingError::Model(_)));
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: TrainingError = io_err.into();
        assert!(matches!(err, TrainingError::Io(_)));
    }
}
