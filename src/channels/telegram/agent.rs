//! Telegram Agent
//!
//! Agent struct and startup logic.

use super::handler::{handle_callback, handle_message, HandlerContext};
use super::{Command, TelegramState};
use crate::channels::voice::Transcriber;
use crate::relay::RelayService;
use std::collections::HashSet;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::utils::command::BotCommands;

/// Telegram bot that forwards messages to the relay service
pub struct TelegramAgent {
    relay: Arc<RelayService>,
    allowed_users: HashSet<i64>,
    transcriber: Option<Transcriber>,
    notify_chat_id: Option<i64>,
    telegram_state: Arc<TelegramState>,
}

impl TelegramAgent {
    pub fn new(
        relay: Arc<RelayService>,
        allowed_users: Vec<i64>,
        transcriber: Option<Transcriber>,
        notify_chat_id: Option<i64>,
    ) -> Self {
        Self {
            relay,
            allowed_users: allowed_users.into_iter().collect(),
            transcriber,
            notify_chat_id,
            telegram_state: Arc::new(TelegramState::new()),
        }
    }

    /// Start the bot as a background task. Returns a JoinHandle.
    pub fn start(self, token: String) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                "Starting Telegram bot: allowed users={}, STT={}, provider={}, default model={}",
                if self.allowed_users.is_empty() {
                    "everyone".to_string()
                } else {
                    self.allowed_users.len().to_string()
                },
                self.transcriber.is_some(),
                self.relay.provider_name(),
                self.relay.default_model(),
            );

            let bot = Bot::new(token.clone());

            // Cache the bot's @username so `/cmd@bot` parses in groups
            match bot.get_me().await {
                Ok(me) => {
                    if let Some(ref username) = me.username {
                        tracing::info!("Telegram: bot username is @{}", username);
                        self.telegram_state.set_bot_username(username.clone()).await;
                    }
                }
                Err(e) => {
                    tracing::warn!("Telegram: failed to get bot info (get_me): {}", e);
                }
            }

            if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
                tracing::warn!("Telegram: failed to register command list: {}", e);
            }

            if let Some(chat_id) = self.notify_chat_id {
                let notice = format!(
                    "🤖 chatrelay v{} started. Default model: {}",
                    crate::VERSION,
                    self.relay.default_model()
                );
                if let Err(e) = bot.send_message(ChatId(chat_id), notice).await {
                    tracing::warn!("Telegram: failed to send startup notice to {}: {}", chat_id, e);
                }
            }

            let ctx = Arc::new(HandlerContext {
                relay: self.relay,
                allowed: self.allowed_users,
                transcriber: self.transcriber,
                bot_token: token,
                state: self.telegram_state,
            });

            let handler = dptree::entry()
                .branch(Update::filter_message().endpoint({
                    let ctx = ctx.clone();
                    move |bot: Bot, msg: Message| {
                        let ctx = ctx.clone();
                        async move { handle_message(bot, msg, ctx).await }
                    }
                }))
                .branch(Update::filter_callback_query().endpoint({
                    let ctx = ctx.clone();
                    move |bot: Bot, q: CallbackQuery| {
                        let ctx = ctx.clone();
                        async move { handle_callback(bot, q, ctx).await }
                    }
                }));

            Dispatcher::builder(bot, handler)
                .enable_ctrlc_handler()
                .build()
                .dispatch()
                .await;

            tracing::info!("Telegram bot stopped");
        })
    }
}
