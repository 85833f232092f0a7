//! Telegram Bot Integration
//!
//! Runs the Telegram front-end: commands, the inline model picker, and
//! forwarding of text and voice messages to the [`RelayService`].
//!
//! [`RelayService`]: crate::relay::RelayService

mod agent;
pub(crate) mod handler;

pub use agent::TelegramAgent;

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use tokio::sync::Mutex;

/// Telegram's hard limit on message length.
pub const MAX_MESSAGE_LEN: usize = 4096;

const MODEL_CALLBACK_PREFIX: &str = "setmodel:";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "greeting and your user ID")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "start a new chat")]
    StartNewChat,
    #[command(description = "choose a model")]
    SetModel,
    #[command(description = "show the current model")]
    CurrentModel,
}

/// Runtime state discovered after connecting.
pub struct TelegramState {
    /// Bot's @username, set at startup via get_me(); needed to parse `/cmd@bot`
    bot_username: Mutex<Option<String>>,
}

impl Default for TelegramState {
    fn default() -> Self {
        Self::new()
    }
}

impl TelegramState {
    pub fn new() -> Self {
        Self {
            bot_username: Mutex::new(None),
        }
    }

    pub async fn set_bot_username(&self, username: String) {
        *self.bot_username.lock().await = Some(username);
    }

    pub async fn bot_username(&self) -> Option<String> {
        self.bot_username.lock().await.clone()
    }
}

/// Inline keyboard with one button per model, two per row.
pub fn model_keyboard(models: &[String]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = models
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|model| {
                    InlineKeyboardButton::callback(
                        model.clone(),
                        format!("{}{}", MODEL_CALLBACK_PREFIX, model),
                    )
                })
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Extract the model name from callback data produced by [`model_keyboard`].
pub fn parse_model_callback(data: &str) -> Option<&str> {
    data.strip_prefix(MODEL_CALLBACK_PREFIX)
        .filter(|model| !model.is_empty())
}
