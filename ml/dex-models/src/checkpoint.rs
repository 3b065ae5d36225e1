//! Weight checkpoints and the model config sidecar.
//!
//! A checkpoint is addressed by its *stem*, e.g. `Serial/dex-model`. The
//! weights live at `<stem>.<ext>` and the topology at `<stem>.config.json`.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::Backend;
use burn::record::{BinFileRecorder, FullPrecisionSettings, PrettyJsonFileRecorder, Recorder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cnn::{DexCnn, DexCnnConfig};
use crate::error::{ModelError, Result};

/// Supported checkpoint file formats.
///
/// # Example
///
/// ```
/// use dex_models::CheckpointFormat;
///
/// assert_eq!(CheckpointFormat::from_extension("BIN"), Some(CheckpointFormat::Binary));
/// assert_eq!("json".parse::<CheckpointFormat>().ok(), Some(CheckpointFormat::Json));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointFormat {
    /// Burn's `BinFileRecorder` at full precision.
    #[default]
    Binary,

    /// Burn's `PrettyJsonFileRecorder`. Large, but diffable.
    Json,
}

impl CheckpointFormat {
    /// Every format, in lookup order.
    pub const ALL: [Self; 2] = [Self::Binary, Self::Json];

    /// Determines format from file extension.
    ///
    /// - `.bin` -> Binary
    /// - `.json` -> Json
    ///
    /// Burn's recorders force their own extension on load, so other
    /// spellings are not accepted.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "bin" => Some(Self::Binary),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Determines format from file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Default file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Json => "json",
        }
    }

    /// Format name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for CheckpointFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for CheckpointFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "binary" => Ok(Self::Binary),
            other => Self::from_extension(other).ok_or_else(|| ModelError::unsupported_format(s)),
        }
    }
}

/// Appends `suffix` to the stem without touching any dots already in it.
fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Weight file path for a stem.
///
/// ```
/// use std::path::{Path, PathBuf};
/// use dex_models::{CheckpointFormat, checkpoint_path};
///
/// assert_eq!(
///     checkpoint_path(Path::new("Serial/dex-model"), CheckpointFormat::Binary),
///     PathBuf::from("Serial/dex-model.bin"),
/// );
/// ```
#[must_use]
pub fn checkpoint_path(stem: &Path, format: CheckpointFormat) -> PathBuf {
    with_suffix(stem, format.extension())
}

/// Config sidecar path for a stem.
#[must_use]
pub fn config_path(stem: &Path) -> PathBuf {
    with_suffix(stem, "config.json")
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| ModelError::save_checkpoint(path.display().to_string(), e.to_string())),
        _ => Ok(()),
    }
}

/// Saves model weights under `stem`, creating parent directories.
///
/// # Returns
///
/// The full path written (stem plus format extension).
///
/// # Errors
///
/// Returns [`ModelError::SaveCheckpoint`] if the directory or file cannot
/// be written.
pub fn save_checkpoint<B: Backend>(
    model: &DexCnn<B>,
    stem: &Path,
    format: CheckpointFormat,
) -> Result<PathBuf> {
    let full_path = checkpoint_path(stem, format);
    ensure_parent(&full_path)?;
    let record = model.clone().into_record();
    let display = full_path.display().to_string();

    match format {
        CheckpointFormat::Binary => BinFileRecorder::<FullPrecisionSettings>::new()
            .record(record, full_path.clone())
            .map_err(|e| ModelError::save_checkpoint(&display, e.to_string()))?,
        CheckpointFormat::Json => PrettyJsonFileRecorder::<FullPrecisionSettings>::new()
            .record(record, full_path.clone())
            .map_err(|e| ModelError::save_checkpoint(&display, e.to_string()))?,
    }

    info!(path = %full_path.display(), format = %format, "Saved checkpoint");
    Ok(full_path)
}

/// Loads weights from `path` (with extension) into `model`.
///
/// The model must have been built from the same [`DexCnnConfig`] that
/// produced the checkpoint.
///
/// # Errors
///
/// Returns [`ModelError::CheckpointNotFound`] if the file does not exist,
/// [`ModelError::UnsupportedFormat`] for an unknown extension, or
/// [`ModelError::LoadCheckpoint`] if the record does not fit the model.
pub fn load_checkpoint<B: Backend>(
    model: DexCnn<B>,
    path: &Path,
    device: &B::Device,
) -> Result<DexCnn<B>> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(ModelError::checkpoint_not_found(display));
    }
    let format =
        CheckpointFormat::from_path(path).ok_or_else(|| ModelError::unsupported_format(&display))?;

    let loaded = match format {
        CheckpointFormat::Binary => model
            .load_file(path, &BinFileRecorder::<FullPrecisionSettings>::new(), device)
            .map_err(|e| ModelError::load_checkpoint(&display, e.to_string()))?,
        CheckpointFormat::Json => model
            .load_file(
                path,
                &PrettyJsonFileRecorder::<FullPrecisionSettings>::new(),
                device,
            )
            .map_err(|e| ModelError::load_checkpoint(&display, e.to_string()))?,
    };

    info!(path = %path.display(), format = %format, "Loaded checkpoint");
    Ok(loaded)
}

/// Writes the model config sidecar for `stem`.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn save_model_config(config: &DexCnnConfig, stem: &Path) -> Result<PathBuf> {
    let path = config_path(stem);
    ensure_parent(&path)?;
    fs::write(&path, serde_json::to_string_pretty(config)?)?;
    debug!(path = %path.display(), "Saved model config");
    Ok(path)
}

/// Reads the model config sidecar for `stem`.
///
/// # Errors
///
/// Returns [`ModelError::CheckpointNotFound`] if the sidecar is missing,
/// or a serialization error if it does not parse.
pub fn load_model_config(stem: &Path) -> Result<DexCnnConfig> {
    let path = config_path(stem);
    if !path.exists() {
        return Err(ModelError::checkpoint_not_found(path.display().to_string()));
    }
    let config: DexCnnConfig = serde_json::from_str(&fs::read_to_string(&path)?)?;
    config.validate()?;
    Ok(config)
}

/// Finds the weight file for `stem`, trying each format in turn.
#[must_use]
pub fn find_checkpoint(stem: &Path) -> Option<(PathBuf, CheckpointFormat)> {
    CheckpointFormat::ALL
        .into_iter()
        .map(|format| (checkpoint_path(stem, format), format))
        .find(|(path, _)| path.is_file())
}
