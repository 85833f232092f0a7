//! Error Types
//!
//! `RelayError` covers everything the library can fail with. Each variant maps
//! onto an [`ErrorCode`] that decides how the failure is surfaced: fatal at
//! startup, reported to the user, or logged and swallowed.

use crate::provider::ProviderError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Broad classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Missing or invalid configuration. Fatal at startup only.
    Config,
    /// Bad input from the user (empty message, no conversation, unknown model).
    UserInput,
    /// The remote completion call failed.
    Remote,
    /// Local file I/O failed.
    Persistence,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("message is empty")]
    EmptyMessage,

    #[error("no active conversation for {0}")]
    NoActiveConversation(String),

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RelayError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::Config,
            Self::EmptyMessage | Self::NoActiveConversation(_) | Self::UnknownModel(_) => {
                ErrorCode::UserInput
            }
            Self::Provider(_) => ErrorCode::Remote,
            Self::Storage { .. } => ErrorCode::Persistence,
        }
    }

    /// Text safe to show to a chat user. Remote and storage failures are kept
    /// generic; details go to the log instead.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) => "❌ The bot is misconfigured.".to_string(),
            Self::EmptyMessage => "❌ Empty message.".to_string(),
            Self::NoActiveConversation(_) => {
                "❌ No active chat. Send /startnewchat to begin one.".to_string()
            }
            Self::UnknownModel(name) => format!("❌ Unknown model: {}", name),
            Self::Provider(e) if e.is_rate_limit() => {
                "⏳ The model is busy right now. Try again in a minute.".to_string()
            }
            Self::Provider(_) | Self::Storage { .. } => {
                "❌ Failed to process the message.".to_string()
            }
        }
    }
}
