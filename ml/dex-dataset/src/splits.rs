//! Train/test splitting.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};
use crate::sample::ImageSample;

/// Ratio for splitting the dataset into train/test sets.
///
/// The ratio is the proportion of data used for training; the remainder
/// is held out for testing.
///
/// # Example
///
/// ```
/// use dex_dataset::SplitRatio;
///
/// let ratio = SplitRatio::new(0.8);
/// assert!((ratio.train_ratio() - 0.8).abs() < 1e-6);
/// assert!((ratio.test_ratio() - 0.2).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct SplitRatio {
    train: f32,
}

impl SplitRatio {
    /// Creates a new split ratio.
    ///
    /// # Panics
    ///
    /// Panics if ratio is not in `(0, 1)`.
    #[must_use]
    pub fn new(train: f32) -> Self {
        assert!(
            train > 0.0 && train < 1.0,
            "Split ratio must be in (0, 1), got {train}"
        );
        Self { train }
    }

    /// Creates a split ratio, returning `None` if invalid.
    #[must_use]
    pub fn try_new(train: f32) -> Option<Self> {
        if train > 0.0 && train < 1.0 {
            Some(Self { train })
        } else {
            None
        }
    }

    /// Returns the training ratio.
    #[must_use]
    pub const fn train_ratio(&self) -> f32 {
        self.train
    }

    /// Returns the test ratio.
    #[must_use]
    pub fn test_ratio(&self) -> f32 {
        1.0 - self.train
    }

    /// Number of training items when splitting `total`.
    ///
    /// The test share is rounded up, so 1161 images split 928 / 233.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn split_point(&self, total: usize) -> usize {
        // f32 ratios are off in the seventh digit; absorb that before ceil.
        let exact = total as f64 * f64::from(self.test_ratio());
        let test = (exact * (1.0 - 1e-6)).ceil() as usize;
        total - test.min(total)
    }

    /// 80% train, 20% test.
    pub const EIGHTY_TWENTY: Self = Self { train: 0.8 };

    /// 90% train, 10% test.
    pub const NINETY_TEN: Self = Self { train: 0.9 };
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self::EIGHTY_TWENTY
    }
}

impl TryFrom<f32> for SplitRatio {
    type Error = DatasetError;

    fn try_from(value: f32) -> Result<Self> {
        Self::try_new(value).ok_or(DatasetError::invalid_split_ratio(value))
    }
}

impl From<SplitRatio> for f32 {
    fn from(ratio: SplitRatio) -> Self {
        ratio.train
    }
}

fn rng_for(seed: Option<u64>) -> ChaCha8Rng {
    seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64)
}

/// Splits items into train and test sets.
///
/// Indices are shuffled with a seeded `ChaCha8` generator, then cut at the
/// ratio's split point. With two or more items both sides are non-empty;
/// a single item goes to the training side.
///
/// # Example
///
/// ```
/// use dex_dataset::{split_dataset, SplitRatio};
///
/// let items: Vec<u32> = (0..10).collect();
/// let (train, test) = split_dataset(&items, SplitRatio::EIGHTY_TWENTY, Some(42));
/// assert_eq!(train.len(), 8);
/// assert_eq!(test.len(), 2);
/// ```
#[must_use]
pub fn split_dataset<T: Clone>(
    items: &[T],
    ratio: SplitRatio,
    seed: Option<u64>,
) -> (Vec<T>, Vec<T>) {
    if items.len() < 2 {
        return (items.to_vec(), Vec::new());
    }

    let mut indices: Vec<usize> = (0..items.len()).collect();
    indices.shuffle(&mut rng_for(seed));

    let split = ratio.split_point(items.len()).clamp(1, items.len() - 1);

    let train = indices[..split].iter().map(|&i| items[i].clone()).collect();
    let test = indices[split..].iter().map(|&i| items[i].clone()).collect();

    (train, test)
}

/// Splits samples so each species keeps roughly the same train/test proportion.
///
/// Every species group is split independently (each with its own derived
/// seed), then the combined sets are shuffled so batches mix species.
#[must_use]
pub fn split_stratified(
    samples: &[ImageSample],
    ratio: SplitRatio,
    seed: Option<u64>,
) -> (Vec<ImageSample>, Vec<ImageSample>) {
    let mut train = Vec::with_capacity(ratio.split_point(samples.len()));
    let mut test = Vec::new();

    for (offset, species) in (0u64..).zip(dex_types::Species::ALL) {
        let group: Vec<ImageSample> = samples
            .iter()
            .filter(|s| s.species == species)
            .cloned()
            .collect();
        let (g_train, g_test) = split_dataset(&group, ratio, seed.map(|s| s.wrapping_add(offset)));
        train.extend(g_train);
        test.extend(g_test);
    }

    let mut rng = seed.map_or_else(ChaCha8Rng::from_entropy, |s| {
        ChaCha8Rng::seed_from_u64(s.wrapping_add(dex_types::Species::COUNT as u64))
    });
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_types::Species;

    fn samples(n: u64) -> Vec<ImageSample> {
        (0..n)
            .map(|i| ImageSample::new(i, Species::ALL[(i % 5) as usize], Vec::new()))
            .collect()
    }

    #[test]
    fn split_ratio_try_new() {
        assert!(SplitRatio::try_new(0.5).is_some());
        assert!(SplitRatio::try_new(0.0).is_none());
        assert!(SplitRatio::try_new(1.0).is_none());
        assert!(SplitRatio::try_new(-0.5).is_none());
    }

    #[test]
    fn split_ratio_split_point() {
        let ratio = SplitRatio::new(0.8);
        assert_eq!(ratio.split_point(100), 80);
        assert_eq!(ratio.split_point(1161), 928);
        assert_eq!(ratio.split_point(7), 5);
        assert_eq!(SplitRatio::NINETY_TEN.split_point(100), 90);
        assert_eq!(SplitRatio::NINETY_TEN.split_point(1_000_000), 900_000);
    }

    #[test]
    fn split_dataset_rounds_test_side_up() {
        let (train, test) = split_dataset(&samples(1161), SplitRatio::EIGHTY_TWENTY, Some(42));
        assert_eq!((train.len(), test.len()), (928, 233));
    }

    #[test]
    fn split_ratio_default() {
        assert!((SplitRatio::default().train_ratio() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn split_ratio_serde_validates() {
        let json = serde_json::to_string(&SplitRatio::new(0.75)).unwrap_or_default();
        assert_eq!(json, "0.75");

        let bad: std::result::Result<SplitRatio, _> = serde_json::from_str("1.5");
        assert!(bad.is_err());
    }

    #[test]
    fn split_dataset_basic() {
        let items = samples(10);
        let (train, test) = split_dataset(&items, SplitRatio::EIGHTY_TWENTY, Some(42));

        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);

        let mut ids: Vec<u64> = train.iter().chain(test.iter()).map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn split_dataset_small_inputs() {
        let (train, test) = split_dataset::<u8>(&[], SplitRatio::EIGHTY_TWENTY, None);
        assert!(train.is_empty() && test.is_empty());

        let (train, test) = split_dataset(&[7u8], SplitRatio::EIGHTY_TWENTY, None);
        assert_eq!(train, vec![7]);
        assert!(test.is_empty());

        let (train, test) = split_dataset(&[1u8, 2], SplitRatio::NINETY_TEN, Some(1));
        assert_eq!((train.len(), test.len()), (1, 1));
    }

    #[test]
    fn split_dataset_reproducible() {
        let items = samples(100);
        let (train1, test1) = split_dataset(&items, SplitRatio::EIGHTY_TWENTY, Some(42));
        let (train2, test2) = split_dataset(&items, SplitRatio::EIGHTY_TWENTY, Some(42));
        assert_eq!(train1, train2);
        assert_eq!(test1, test2);
    }

    #[test]
    fn split_stratified_keeps_every_species_in_test() {
        let items = samples(100);
        let (train, test) = split_stratified(&items, SplitRatio::EIGHTY_TWENTY, Some(42));

        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
        for species in Species::ALL {
            assert_eq!(test.iter().filter(|s| s.species == species).count(), 4);
        }
    }
}
