//! Model Selection
//!
//! The allow-list of completion models and the per-user persisted choice.

mod catalog;
mod selector;

pub use catalog::{ModelCatalog, ModelId};
pub use selector::ModelSelector;
