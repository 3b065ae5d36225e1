//! The label set.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypesError};

/// One of the five species the classifier knows about.
///
/// The discriminant order is the class index order used by the network's
/// output layer and by one-hot label vectors. Changing it invalidates
/// every saved checkpoint.
///
/// # Example
///
/// ```
/// use dex_types::Species;
///
/// assert_eq!(Species::Squirtle.index(), 2);
/// assert_eq!(Species::from_index(2), Some(Species::Squirtle));
/// assert_eq!(Species::Squirtle.one_hot(), [0.0, 0.0, 1.0, 0.0, 0.0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    /// Bulbasaur.
    Bulbasaur,
    /// Charmander.
    Charmander,
    /// Squirtle.
    Squirtle,
    /// Pikachu.
    Pikachu,
    /// Mewtwo.
    Mewtwo,
}

impl Species {
    /// Number of classes.
    pub const COUNT: usize = 5;

    /// All species in class index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Bulbasaur,
        Self::Charmander,
        Self::Squirtle,
        Self::Pikachu,
        Self::Mewtwo,
    ];

    /// Returns the class index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Looks up a species by class index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Looks up a species by class index, returning an error when out of range.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::InvalidClassIndex`] if `index >= Species::COUNT`.
    pub fn try_from_index(index: usize) -> Result<Self> {
        Self::from_index(index).ok_or(TypesError::invalid_class_index(index, Self::COUNT))
    }

    /// Parses a species from its name.
    ///
    /// Matching ignores case and surrounding whitespace, so dataset
    /// directories such as `Pikachu/` or `MEWTWO/` resolve correctly.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::UnknownSpecies`] if the name is not recognised.
    pub fn from_name(name: &str) -> Result<Self> {
        let needle = name.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| TypesError::unknown_species(name))
    }

    /// Returns the lowercase species name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bulbasaur => "bulbasaur",
            Self::Charmander => "charmander",
            Self::Squirtle => "squirtle",
            Self::Pikachu => "pikachu",
            Self::Mewtwo => "mewtwo",
        }
    }

    /// Returns the one-hot label vector for this species.
    #[must_use]
    pub fn one_hot(self) -> [f32; Self::COUNT] {
        let mut v = [0.0; Self::COUNT];
        v[self.index()] = 1.0;
        v
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Species {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}
