//! Completion Providers
//!
//! The remote chat-completion boundary. [`Provider`] is the seam the relay
//! talks to; [`OpenAIProvider`] implements it against any OpenAI-compatible
//! `/chat/completions` endpoint.

mod error;
mod openai;
mod types;

pub use error::ProviderError;
pub use openai::{OpenAIProvider, OPENAI_BASE_URL};
pub use types::{ChatMessage, Completion, CompletionRequest};

use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Run one completion. The returned [`Completion::model`] is the model that
    /// actually answered, which may differ from the one requested.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
