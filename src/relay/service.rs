//! Relay service implementation.

use super::reply::Reply;
use crate::config::Config;
use crate::conversation::{ConversationStore, Turn, VOICE_MARKER};
use crate::error::{ErrorCode, RelayError, Result};
use crate::models::{ModelId, ModelSelector};
use crate::provider::{CompletionRequest, Provider};
use crate::user::UserKey;
use std::path::PathBuf;
use std::sync::Arc;

/// Per-process context shared by every channel. All state is keyed by
/// [`UserKey`]; nothing is global.
pub struct RelayService {
    provider: Arc<dyn Provider>,
    conversations: ConversationStore,
    models: ModelSelector,
}

impl RelayService {
    pub fn new(
        provider: Arc<dyn Provider>,
        conversations: ConversationStore,
        models: ModelSelector,
    ) -> Self {
        Self {
            provider,
            conversations,
            models,
        }
    }

    /// Wire up storage and the model catalog from configuration.
    pub fn from_config(config: &Config, provider: Arc<dyn Provider>) -> Result<Self> {
        Ok(Self::new(
            provider,
            ConversationStore::from_config(config),
            ModelSelector::from_config(config)?,
        ))
    }

    /// Begin a fresh conversation for `user`, abandoning the previous one.
    pub fn start_conversation(&self, user: &UserKey) -> Result<PathBuf> {
        let log = self.conversations.start(user)?;
        Ok(log.path().to_path_buf())
    }

    /// Relay a typed message.
    pub async fn handle_text(&self, user: &UserKey, text: &str) -> Reply {
        self.relay(user, text, false).await
    }

    /// Relay a transcribed voice note. The logged turn carries the voice
    /// marker; the model sees only the transcript.
    pub async fn handle_voice(&self, user: &UserKey, transcript: &str) -> Reply {
        self.relay(user, transcript, true).await
    }

    async fn relay(&self, user: &UserKey, text: &str, voice: bool) -> Reply {
        match self.try_relay(user, text, voice).await {
            Ok(reply) => reply,
            Err(e) => {
                match e.code() {
                    ErrorCode::UserInput => tracing::debug!("Rejected message from {}: {}", user, e),
                    _ => tracing::error!("Relay failed for {}: {}", user, e),
                }
                Reply::Error {
                    code: e.code(),
                    message: e.user_message(),
                }
            }
        }
    }

    async fn try_relay(&self, user: &UserKey, text: &str, voice: bool) -> Result<Reply> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RelayError::EmptyMessage);
        }

        let log = self
            .conversations
            .active(user)
            .ok_or_else(|| RelayError::NoActiveConversation(user.to_string()))?;

        let mut turns = log.reconstruct()?;
        let model = self.models.load(user);
        turns.push(Turn::user(text));

        tracing::debug!(
            "Relaying for {} via {}: model={}, turns={}",
            user,
            self.provider.name(),
            model,
            turns.len()
        );

        let request = CompletionRequest::from_turns(model.as_str(), &turns);
        let completion = self.provider.complete(request).await?;

        if completion.model != model.as_str() {
            tracing::info!(
                "Requested model {} was served by {}",
                model,
                completion.model
            );
        }

        let logged_user = if voice {
            Turn::user(format!("{} {}", VOICE_MARKER, text))
        } else {
            Turn::user(text)
        };
        if let Err(e) = log.append_exchange(&logged_user, &Turn::assistant(&completion.content)) {
            tracing::error!("Failed to record exchange for {}: {}", user, e);
        }

        Ok(Reply::Answer {
            text: completion.content,
            requested_model: model,
            served_model: completion.model,
        })
    }

    pub fn current_model(&self, user: &UserKey) -> ModelId {
        self.models.load(user)
    }

    /// Persist a model choice. Unknown identifiers are rejected.
    pub fn select_model(&self, user: &UserKey, name: &str) -> Result<ModelId> {
        self.models.save(user, name)
    }

    pub fn available_models(&self) -> &[String] {
        self.models.catalog().available()
    }

    pub fn default_model(&self) -> &ModelId {
        self.models.catalog().default_model()
    }

    /// Turns of the user's active conversation.
    pub fn history(&self, user: &UserKey) -> Result<Vec<Turn>> {
        self.conversations
            .active(user)
            .ok_or_else(|| RelayError::NoActiveConversation(user.to_string()))?
            .reconstruct()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}
