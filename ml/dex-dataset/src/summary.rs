//! Dataset summary and statistics.

use dex_types::Species;
use serde::{Deserialize, Serialize};

use crate::sample::ImageSample;

/// Composition of a loaded dataset.
///
/// # Example
///
/// ```
/// use dex_dataset::{DatasetSummary, ImageSample};
/// use dex_types::Species;
///
/// let train = vec![ImageSample::new(0, Species::Pikachu, vec![])];
/// let test = vec![ImageSample::new(1, Species::Mewtwo, vec![])];
///
/// let summary = DatasetSummary::from_splits(&train, &test, 2);
/// assert_eq!(summary.total_samples, 2);
/// assert_eq!(summary.skipped_files, 2);
/// assert_eq!(summary.train_count(Species::Pikachu), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Usable samples (train + test).
    pub total_samples: usize,

    /// Samples in the training split.
    pub train_samples: usize,

    /// Samples in the test split.
    pub test_samples: usize,

    /// Files discovered but not loaded (undecodable or unlabelled).
    pub skipped_files: usize,

    /// Per-species training counts, in class index order.
    pub train_distribution: [usize; Species::COUNT],

    /// Per-species test counts, in class index order.
    pub test_distribution: [usize; Species::COUNT],
}

impl DatasetSummary {
    /// Builds a summary from the two splits.
    #[must_use]
    pub fn from_splits(train: &[ImageSample], test: &[ImageSample], skipped_files: usize) -> Self {
        Self {
            total_samples: train.len() + test.len(),
            train_samples: train.len(),
            test_samples: test.len(),
            skipped_files,
            train_distribution: distribution(train),
            test_distribution: distribution(test),
        }
    }

    /// Training samples of one species.
    #[must_use]
    pub const fn train_count(&self, species: Species) -> usize {
        self.train_distribution[species.index()]
    }

    /// Test samples of one species.
    #[must_use]
    pub const fn test_count(&self, species: Species) -> usize {
        self.test_distribution[species.index()]
    }

    /// Species with no samples at all.
    #[must_use]
    pub fn missing_species(&self) -> Vec<Species> {
        Species::ALL
            .into_iter()
            .filter(|&s| self.train_count(s) + self.test_count(s) == 0)
            .collect()
    }

    /// Test accuracy of always guessing the most common training species.
    ///
    /// The floor any trained model should beat.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn majority_baseline(&self) -> f32 {
        if self.test_samples == 0 {
            return 0.0;
        }
        let majority = Species::ALL
            .into_iter()
            .max_by_key(|&s| (self.train_count(s), std::cmp::Reverse(s.index())))
            .unwrap_or(Species::Bulbasaur);
        self.test_count(majority) as f32 / self.test_samples as f32
    }
}

fn distribution(samples: &[ImageSample]) -> [usize; Species::COUNT] {
    let mut counts = [0; Species::COUNT];
    for sample in samples {
        counts[sample.label()] += 1;
    }
    counts
}

impl std::fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:<12} {:>7} {:>7}", "species", "train", "test")?;
        for species in Species::ALL {
            writeln!(
                f,
                "{:<12} {:>7} {:>7}",
                species.name(),
                self.train_count(species),
                self.test_count(species)
            )?;
        }
        write!(
            f,
            "{:<12} {:>7} {:>7} (skipped {})",
            "total", self.train_samples, self.test_samples, self.skipped_files
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(species: &[Species]) -> Vec<ImageSample> {
        (0u64..)
            .zip(species)
            .map(|(i, &s)| ImageSample::new(i, s, Vec::new()))
            .collect()
    }

    #[test]
    fn summary_counts() {
        let train = make(&[Species::Pikachu, Species::Pikachu, Species::Squirtle]);
        let test = make(&[Species::Pikachu, Species::Bulbasaur]);
        let summary = DatasetSummary::from_splits(&train, &test, 0);

        assert_eq!(summary.total_samples, 5);
        assert_eq!(summary.train_count(Species::Pikachu), 2);
        assert_eq!(summary.test_count(Species::Bulbasaur), 1);
        assert_eq!(
            summary.missing_species(),
            vec![Species::Charmander, Species::Mewtwo]
        );
    }

    #[test]
    fn majority_baseline() {
        let train = make(&[Species::Pikachu, Species::Pikachu, Species::Squirtle]);
        let test = make(&[Species::Pikachu, Species::Bulbasaur, Species::Mewtwo, Species::Pikachu]);
        let summary = DatasetSummary::from_splits(&train, &test, 0);
        assert!((summary.majority_baseline() - 0.5).abs() < 1e-6);

        assert!(DatasetSummary::default().majority_baseline().abs() < f32::EPSILON);
    }

    #[test]
    fn display_lists_every_species() {
        let summary = DatasetSummary::from_splits(&make(&[Species::Mewtwo]), &[], 3);
        let table = summary.to_string();
        for species in Species::ALL {
            assert!(table.contains(species.name()));
        }
        assert!(table.contains("skipped 3"));
    }

    #[test]
    fn summary_serialization() {
        let summary = DatasetSummary::from_splits(&make(&[Species::Mewtwo]), &[], 0);
        let json = serde_json::to_string(&summary).unwrap_or_default();
        let parsed: std::result::Result<DatasetSummary, _> = serde_json::from_str(&json);
        assert_eq!(parsed.ok(), Some(summary));
    }
}
