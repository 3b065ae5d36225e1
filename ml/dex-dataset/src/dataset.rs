//! The in-memory dataset.

use std::path::{Path, PathBuf};

use dex_types::ImageDims;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use crate::batch::{CircularCursor, ImageBatch};
use crate::discover::{discover_images, label_for_path, load_image};
use crate::error::{DatasetError, Result};
use crate::sample::ImageSample;
use crate::splits::{SplitRatio, split_dataset, split_stratified};
use crate::summary::DatasetSummary;

/// Where and how to load the dataset.
///
/// # Example
///
/// ```
/// use dex_dataset::LoaderConfig;
///
/// let config = LoaderConfig::default();
/// assert_eq!(config.root.to_str(), Some("dataset"));
/// assert_eq!(config.seed, Some(42));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Root directory; images live in one sub-directory per species.
    pub root: PathBuf,

    /// Size every image is resized to.
    pub dims: ImageDims,

    /// Seed for the file shuffle and the train/test split (`None` = entropy).
    pub seed: Option<u64>,

    /// Train/test ratio.
    pub split: SplitRatio,

    /// Load at most this many files after shuffling.
    pub max_images: Option<usize>,

    /// Split each species separately.
    pub stratified: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dataset"),
            dims: ImageDims::default(),
            seed: Some(42),
            split: SplitRatio::EIGHTY_TWENTY,
            max_images: None,
            stratified: false,
        }
    }
}

impl LoaderConfig {
    /// Creates a config for the given root with default settings.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Sets the image dimensions.
    #[must_use]
    pub const fn with_dims(mut self, dims: ImageDims) -> Self {
        self.dims = dims;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the split ratio.
    #[must_use]
    pub const fn with_split(mut self, split: SplitRatio) -> Self {
        self.split = split;
        self
    }

    /// Caps the number of files loaded.
    #[must_use]
    pub const fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = Some(max_images);
        self
    }

    /// Enables per-species splitting.
    #[must_use]
    pub const fn stratified(mut self) -> Self {
        self.stratified = true;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidDimensions`] for bad dims and
    /// [`DatasetError::Validation`] for a zero image cap.
    pub fn validate(&self) -> Result<()> {
        if !self.dims.is_valid() {
            return Err(DatasetError::invalid_dimensions(self.dims.to_string()));
        }
        if self.max_images == Some(0) {
            return Err(DatasetError::validation("max_images must be > 0"));
        }
        Ok(())
    }
}

/// Labelled images held in memory, split once into train and test sets.
///
/// Train and test each have their own [`CircularCursor`], so drawing test
/// batches never disturbs the order of training batches.
#[derive(Debug, Clone)]
pub struct PokemonDataset {
    dims: ImageDims,
    train: Vec<ImageSample>,
    test: Vec<ImageSample>,
    train_cursor: CircularCursor,
    test_cursor: CircularCursor,
    summary: DatasetSummary,
}

impl PokemonDataset {
    /// Loads every image under `config.root`.
    ///
    /// Files are discovered, shuffled with the configured seed, optionally
    /// capped at `max_images`, decoded and labelled from their directory.
    /// Files that cannot be decoded or labelled are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::RootNotFound`] for a missing root,
    /// [`DatasetError::EmptyDataset`] when nothing usable was found, or
    /// any configuration error from [`LoaderConfig::validate`].
    pub fn load(config: &LoaderConfig) -> Result<Self> {
        config.validate()?;

        let mut paths = discover_images(&config.root)?;
        info!(
            root = %config.root.display(),
            images = paths.len(),
            "loaded image list"
        );

        let mut rng = config
            .seed
            .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        paths.shuffle(&mut rng);
        if let Some(max) = config.max_images {
            paths.truncate(max);
        }

        let mut samples = Vec::with_capacity(paths.len());
        let mut skipped = 0;
        for (id, path) in (0u64..).zip(paths) {
            match load_sample(id, &path, config.dims) {
                Ok(sample) => samples.push(sample),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping image");
                    skipped += 1;
                }
            }
        }

        let mut dataset = Self::from_samples(
            samples,
            config.dims,
            config.split,
            config.seed,
            config.stratified,
        )?;
        dataset.summary.skipped_files = skipped;

        info!(
            train = dataset.train_len(),
            test = dataset.test_len(),
            skipped,
            "dataset ready"
        );
        for species in dataset.summary.missing_species() {
            warn!(%species, "no images found for species");
        }

        Ok(dataset)
    }

    /// Builds a dataset from samples already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::EmptyDataset`] if `samples` is empty, or
    /// [`DatasetError::Validation`] if a sample does not match `dims`.
    pub fn from_samples(
        samples: Vec<ImageSample>,
        dims: ImageDims,
        ratio: SplitRatio,
        seed: Option<u64>,
        stratified: bool,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(DatasetError::EmptyDataset);
        }
        if let Some(bad) = samples.iter().find(|s| !s.is_valid(dims)) {
            return Err(DatasetError::validation(format!(
                "sample {} is not a {dims} image in [0, 1]",
                bad.id
            )));
        }

        let (train, test) = if stratified {
            split_stratified(&samples, ratio, seed)
        } else {
            split_dataset(&samples, ratio, seed)
        };
        let summary = DatasetSummary::from_splits(&train, &test, 0);

        Ok(Self {
            dims,
            train,
            test,
            train_cursor: CircularCursor::new(),
            test_cursor: CircularCursor::new(),
            summary,
        })
    }

    /// Total number of usable images (train + test).
    #[must_use]
    pub fn size(&self) -> usize {
        self.train.len() + self.test.len()
    }

    /// Number of training images.
    #[must_use]
    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    /// Number of test images.
    #[must_use]
    pub fn test_len(&self) -> usize {
        self.test.len()
    }

    /// Image geometry.
    #[must_use]
    pub const fn dims(&self) -> ImageDims {
        self.dims
    }

    /// Composition of the dataset.
    #[must_use]
    pub const fn summary(&self) -> &DatasetSummary {
        &self.summary
    }

    /// Training samples.
    #[must_use]
    pub fn train_samples(&self) -> &[ImageSample] {
        &self.train
    }

    /// Test samples.
    #[must_use]
    pub fn test_samples(&self) -> &[ImageSample] {
        &self.test
    }

    /// Next circular batch from the training split.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::BatchTooLarge`] if the training split holds
    /// fewer than `batch_size` samples, or [`DatasetError::InvalidBatchSize`]
    /// for zero.
    pub fn next_batch_train(&mut self, batch_size: usize) -> Result<ImageBatch> {
        next_batch(&self.train, &mut self.train_cursor, batch_size, self.dims, "train")
    }

    /// Next circular batch from the test split.
    ///
    /// # Errors
    ///
    /// As [`Self::next_batch_train`], for the test split.
    pub fn next_batch_test(&mut self, batch_size: usize) -> Result<ImageBatch> {
        next_batch(&self.test, &mut self.test_cursor, batch_size, self.dims, "test")
    }

    /// Iterates the whole test split in order, in batches of at most `batch_size`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidBatchSize`] for zero.
    pub fn test_batches(
        &self,
        batch_size: usize,
    ) -> Result<impl Iterator<Item = Result<ImageBatch>> + '_> {
        if batch_size == 0 {
            return Err(DatasetError::InvalidBatchSize);
        }
        let dims = self.dims;
        Ok(self
            .test
            .chunks(batch_size)
            .map(move |chunk| ImageBatch::from_samples(chunk, dims)))
    }
}

fn next_batch(
    samples: &[ImageSample],
    cursor: &mut CircularCursor,
    batch_size: usize,
    dims: ImageDims,
    split: &'static str,
) -> Result<ImageBatch> {
    if batch_size > samples.len() {
        return Err(DatasetError::batch_too_large(batch_size, samples.len(), split));
    }
    let range = cursor.next_range(batch_size, samples.len())?;
    trace!(
        split,
        first = range.start + 1,
        last = range.end,
        next = cursor.position(),
        "Fetching batch"
    );
    ImageBatch::from_samples(&samples[range], dims)
}

fn load_sample(id: u64, path: &Path, dims: ImageDims) -> Result<ImageSample> {
    let species = label_for_path(path)?;
    let image = load_image(path, dims)?;
    Ok(ImageSample::new(id, species, image).with_path(path))
}
