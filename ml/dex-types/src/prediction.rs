//! Classifier output.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypesError};
use crate::species::Species;

/// A single classification result.
///
/// # Example
///
/// ```
/// use dex_types::{Prediction, Species};
///
/// let p = Prediction::from_probabilities(&[0.9, 0.025, 0.025, 0.025, 0.025]).unwrap();
/// assert_eq!(p.species, Species::Bulbasaur);
/// assert!((p.confidence_percent() - 90.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Most likely species.
    pub species: Species,

    /// Probability of `species`, in `[0, 1]`.
    pub confidence: f32,

    /// Softmax probabilities in class index order.
    pub probabilities: [f32; Species::COUNT],
}

impl Prediction {
    /// Builds a prediction from a softmax probability vector.
    ///
    /// The winning class is the argmax; ties resolve to the lowest index.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::ProbabilityCount`] if the slice does not hold
    /// exactly one entry per species, or [`TypesError::InvalidProbabilities`]
    /// if any entry is NaN or negative.
    pub fn from_probabilities(probabilities: &[f32]) -> Result<Self> {
        let probabilities: [f32; Species::COUNT] = probabilities
            .try_into()
            .map_err(|_| TypesError::probability_count(Species::COUNT, probabilities.len()))?;

        if probabilities.iter().any(|p| p.is_nan() || *p < 0.0) {
            return Err(TypesError::invalid_probabilities(format!(
                "{probabilities:?}"
            )));
        }

        let mut best = 0;
        for (i, p) in probabilities.iter().enumerate().skip(1) {
            if *p > probabilities[best] {
                best = i;
            }
        }

        Ok(Self {
            species: Species::try_from_index(best)?,
            confidence: probabilities[best],
            probabilities,
        })
    }

    /// Confidence as a percentage.
    #[must_use]
    pub fn confidence_percent(&self) -> f32 {
        self.confidence * 100.0
    }

    /// Probability assigned to a given species.
    #[must_use]
    pub const fn probability_of(&self, species: Species) -> f32 {
        self.probabilities[species.index()]
    }

    /// Species ranked by descending probability.
    #[must_use]
    pub fn ranked(&self) -> Vec<(Species, f32)> {
        let mut ranked: Vec<_> = Species::ALL
            .iter()
            .map(|&s| (s, self.probability_of(s)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.2}%)", self.species, self.confidence_percent())
    }
}
