//! Configuration types and defaults.

use crate::conversation::DEFAULT_FILLER_PHRASES;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Telegram bot settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Completion API settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Allowed models and the fallback
    #[serde(default)]
    pub models: ModelsConfig,

    /// Conversation log handling
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Where logs and selections are written
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Voice note transcription
    #[serde(default)]
    pub voice: VoiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    /// Bot token (loaded from TELEGRAM_BOT_TOKEN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Allowlisted Telegram user IDs. Empty means everyone may talk to the bot.
    #[serde(default)]
    pub allowed_users: Vec<i64>,

    /// Chat that receives a notice when the bot starts (TELEGRAM_CHAT_ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_chat_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (loaded from OPENAI_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// API base URL (default: https://api.openai.com/v1)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional system message sent before the conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_base_url() -> String {
    crate::provider::OPENAI_BASE_URL.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Models users may pick from
    #[serde(default = "default_available_models")]
    pub available: Vec<String>,

    /// Model used when a user has not picked one (must be in `available`)
    #[serde(default = "default_model")]
    pub default: String,
}

fn default_available_models() -> Vec<String> {
    ["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-4", "gpt-3.5-turbo"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            available: default_available_models(),
            default: default_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Phrases stripped from turns when a log is read back
    #[serde(default = "default_filler_phrases")]
    pub filler_phrases: Vec<String>,
}

fn default_filler_phrases() -> Vec<String> {
    DEFAULT_FILLER_PHRASES.iter().map(|p| p.to_string()).collect()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            filler_phrases: default_filler_phrases(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for chat logs and model selections
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatrelay")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    pub fn chats_dir(&self) -> PathBuf {
        self.data_dir.join("chats")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files (default: <data_dir>/logs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Enable speech-to-text for voice notes
    #[serde(default = "default_true")]
    pub stt_enabled: bool,

    /// Transcription endpoint (OpenAI-compatible)
    #[serde(default = "default_stt_url")]
    pub stt_url: String,

    /// Transcription model
    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    /// API key for transcription; falls back to the provider key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_stt_url() -> String {
    format!("{}/audio/transcriptions", crate::provider::OPENAI_BASE_URL)
}

fn default_stt_model() -> String {
    "whisper-1".to_string()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_enabled: true,
            stt_url: default_stt_url(),
            stt_model: default_stt_model(),
            api_key: None,
        }
    }
}
