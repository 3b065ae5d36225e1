//! Backend selection.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Burn backends the classifier can run on.
///
/// # Example
///
/// ```
/// use dex_models::BackendType;
///
/// let backend: BackendType = "ndarray".parse().unwrap();
/// assert!(backend.is_cpu());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// CPU backend using ndarray. Always available.
    #[default]
    NdArray,

    /// GPU backend using WGPU.
    ///
    /// Only usable when the binary was built with the `wgpu` feature.
    Wgpu,
}

impl BackendType {
    /// Returns `true` if this is a CPU backend.
    #[must_use]
    pub const fn is_cpu(&self) -> bool {
        matches!(self, Self::NdArray)
    }

    /// Returns `true` if this is a GPU backend.
    #[must_use]
    pub const fn is_gpu(&self) -> bool {
        matches!(self, Self::Wgpu)
    }

    /// Returns the backend name as a string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NdArray => "ndarray",
            Self::Wgpu => "wgpu",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for BackendType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ndarray" | "cpu" => Ok(Self::NdArray),
            "wgpu" | "gpu" => Ok(Self::Wgpu),
            other => Err(ModelError::backend_unavailable(format!(
                "unknown backend '{other}' (expected ndarray or wgpu)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_type_default() {
        assert_eq!(BackendType::default(), BackendType::NdArray);
    }

    #[test]
    fn backend_type_kind() {
        assert!(BackendType::NdArray.is_cpu());
        assert!(!BackendType::NdArray.is_gpu());
        assert!(BackendType::Wgpu.is_gpu());
        assert!(!BackendType::Wgpu.is_cpu());
    }

    #[test]
    fn backend_type_parse() {
        assert_eq!("NdArray".parse::<BackendType>().ok(), Some(BackendType::NdArray));
        assert_eq!("gpu".parse::<BackendType>().ok(), Some(BackendType::Wgpu));

        let err = "cuda".parse::<BackendType>().unwrap_err();
        assert!(err.to_string().contains("cuda"));
    }

    #[test]
    fn backend_type_display() {
        assert_eq!(BackendType::Wgpu.to_string(), "wgpu");
    }

    #[test]
    fn backend_type_serialization() {
        let json = serde_json::to_string(&BackendType::Wgpu).unwrap_or_default();
        assert_eq!(json, "\"wgpu\"");
        let parsed: Result<BackendType, _> = serde_json::from_str(&json);
        assert_eq!(parsed.ok(), Some(BackendType::Wgpu));
    }
}
