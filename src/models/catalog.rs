//! Allow-list of known model identifiers.

use crate::error::{RelayError, Result};
use std::fmt;

/// A model identifier that is known to be in the catalog.
///
/// Only [`ModelCatalog::resolve`] and [`ModelCatalog::default_model`] hand these
/// out, so holding a `ModelId` means the value passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId(String);

impl ModelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct ModelCatalog {
    available: Vec<String>,
    default: ModelId,
}

impl ModelCatalog {
    /// Build a catalog. The default must be one of `available`.
    pub fn new(available: Vec<String>, default: &str) -> Result<Self> {
        let available: Vec<String> = available
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();

        if available.is_empty() {
            return Err(RelayError::Config("model list is empty".to_string()));
        }

        let default = default.trim();
        if !available.iter().any(|m| m == default) {
            return Err(RelayError::Config(format!(
                "default model '{}' is not in the model list",
                default
            )));
        }

        Ok(Self {
            default: ModelId(default.to_string()),
            available,
        })
    }

    /// Look up a candidate identifier. Surrounding whitespace is ignored.
    pub fn resolve(&self, candidate: &str) -> Option<ModelId> {
        let candidate = candidate.trim();
        self.available
            .iter()
            .find(|m| m.as_str() == candidate)
            .map(|m| ModelId(m.clone()))
    }

    pub fn default_model(&self) -> &ModelId {
        &self.default
    }

    pub fn available(&self) -> &[String] {
        &self.available
    }
}
