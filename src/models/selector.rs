//! Per-user persisted model choice.
//!
//! Each user's selection lives in `<dir>/<user>.txt` as a single line.

use super::catalog::{ModelCatalog, ModelId};
use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::user::UserKey;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ModelSelector {
    dir: PathBuf,
    catalog: ModelCatalog,
}

impl ModelSelector {
    pub fn new(dir: PathBuf, catalog: ModelCatalog) -> Self {
        Self { dir, catalog }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = ModelCatalog::new(config.models.available.clone(), &config.models.default)?;
        Ok(Self::new(config.storage.models_dir(), catalog))
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    fn path_for(&self, user: &UserKey) -> PathBuf {
        self.dir.join(format!("{}.txt", user.as_str()))
    }

    /// Read the user's model. Missing, empty, unreadable or unknown values all
    /// fall back to the catalog default.
    pub fn load(&self, user: &UserKey) -> ModelId {
        let path = self.path_for(user);
        match std::fs::read_to_string(&path) {
            Ok(content) => match self.catalog.resolve(&content) {
                Some(model) => model,
                None => {
                    if !content.trim().is_empty() {
                        tracing::warn!(
                            "Ignoring unknown model '{}' in {}",
                            content.trim(),
                            path.display()
                        );
                    }
                    self.catalog.default_model().clone()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No model selection for {} (using default)", user);
                self.catalog.default_model().clone()
            }
            Err(e) => {
                tracing::warn!("Failed to read model selection {}: {}", path.display(), e);
                self.catalog.default_model().clone()
            }
        }
    }

    /// Validate and persist a model choice. Unknown identifiers are rejected
    /// without touching the stored value.
    pub fn save(&self, user: &UserKey, candidate: &str) -> Result<ModelId> {
        let model = self
            .catalog
            .resolve(candidate)
            .ok_or_else(|| RelayError::UnknownModel(candidate.trim().to_string()))?;

        let path = self.path_for(user);
        write_selection(&path, model.as_str())?;
        tracing::info!("Model for {} set to {}", user, model);
        Ok(model)
    }
}

fn write_selection(path: &Path, value: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RelayError::storage(parent, e))?;
    }
    std::fs::write(path, value).map_err(|e| RelayError::storage(path, e))
}
