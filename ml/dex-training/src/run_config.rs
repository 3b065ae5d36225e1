//! Top-level run configuration.

use std::fs;
use std::path::{Path, PathBuf};

use dex_dataset::LoaderConfig;
use dex_models::{BackendType, CheckpointFormat, DexCnnConfig};
use dex_types::ImageDims;
use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;
use crate::error::{Result, TrainingError};

/// File name of the metrics dump written next to the checkpoint.
pub const METRICS_FILE: &str = "training-metrics.json";

/// Everything a run needs: where the data is, what to build, how to train
/// it and where to keep it.
///
/// Missing keys in a JSON file fall back to the defaults.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use dex_training::DexConfig;
///
/// let config = DexConfig::default();
/// assert_eq!(config.checkpoint, Path::new("Serial/dex-model"));
/// assert_eq!(config.metrics_path(), Path::new("Serial/training-metrics.json"));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DexConfig {
    /// Dataset discovery and splitting.
    pub loader: LoaderConfig,

    /// Network hyperparameters.
    pub model: DexCnnConfig,

    /// Training loop settings.
    pub training: TrainingConfig,

    /// Checkpoint stem; the format extension is appended.
    pub checkpoint: PathBuf,

    /// Format used when saving.
    pub format: CheckpointFormat,

    /// Burn backend to run on.
    pub backend: BackendType,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            loader: LoaderConfig::default(),
            model: DexCnnConfig::default(),
            training: TrainingConfig::default(),
            checkpoint: PathBuf::from("Serial/dex-model"),
            format: CheckpointFormat::Binary,
            backend: BackendType::NdArray,
        }
    }
}

impl DexConfig {
    /// Reads a config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an IO or serialization error if the file cannot be read or
    /// parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| TrainingError::Io(format!("{}: {e}", path.display())))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the config as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Sets the input size on both the loader and the model.
    #[must_use]
    pub fn with_dims(mut self, dims: ImageDims) -> Self {
        self.loader.dims = dims;
        self.model.dims = dims;
        self
    }

    /// Sets the checkpoint stem.
    #[must_use]
    pub fn with_checkpoint(mut self, stem: impl Into<PathBuf>) -> Self {
        self.checkpoint = stem.into();
        self
    }

    /// Where the metrics JSON goes: beside the checkpoint.
    #[must_use]
    pub fn metrics_path(&self) -> PathBuf {
        self.checkpoint
            .parent()
            .map_or_else(|| PathBuf::from(METRICS_FILE), |dir| dir.join(METRICS_FILE))
    }

    /// Validates every section and their agreement on image size.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] for the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.loader.validate()?;
        self.model
            .validate()
            .map_err(|e| TrainingError::invalid_config(e.to_string()))?;
        self.training.validate()?;
        if self.loader.dims != self.model.dims {
            return Err(TrainingError::invalid_config(format!(
                "loader resizes to {} but the model expects {}",
                self.loader.dims, self.model.dims
            )));
        }
        if self.checkpoint.as_os_str().is_empty() {
            return Err(TrainingError::invalid_config("checkpoint stem is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_validates() {
        let config = DexConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.loader.dims, ImageDims::default());
        assert_eq!(config.format, CheckpointFormat::Binary);
    }

    #[test]
    fn mismatched_dims_rejected() {
        let mut config = DexConfig::default();
        config.loader.dims = ImageDims::square_rgb(64);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("64x64x3"));

        let config = DexConfig::default().with_dims(ImageDims::square_rgb(64));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_checkpoint_rejected() {
        let config = DexConfig::default().with_checkpoint("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn metrics_path_without_parent() {
        let config = DexConfig::default().with_checkpoint("dex-model");
        assert_eq!(config.metrics_path(), PathBuf::from(METRICS_FILE));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dex.json");
        let config = DexConfig::default()
            .with_dims(ImageDims::square_rgb(48))
            .with_checkpoint(dir.path().join("ckpt").join("dex-model"));

        config.to_file(&path).unwrap();
        assert_eq!(DexConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dex.json");
        fs::write(
            &path,
            r#"{ "training": { "epochs": 3 }, "loader": { "root": "pics" }, "format": "json" }"#,
        )
        .unwrap();

        let config = DexConfig::from_file(&path).unwrap();
        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.loader.root, PathBuf::from("pics"));
        assert_eq!(config.format, CheckpointFormat::Json);
        assert_eq!(config.checkpoint, PathBuf::from("Serial/dex-model"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = DexConfig::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, TrainingError::Io(_)));
    }
}
