//! Telegram Message Handler
//!
//! Processes incoming updates: commands, text, voice notes (STT), model picker
//! callbacks, allowlist enforcement.

use super::{model_keyboard, parse_model_callback, Command, TelegramState, MAX_MESSAGE_LEN};
use crate::channels::voice::Transcriber;
use crate::relay::RelayService;
use crate::user::UserKey;
use crate::utils::{preview, truncate_str};
use std::collections::HashSet;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatAction, MaybeInaccessibleMessage};
use teloxide::utils::command::BotCommands;

/// Everything the handlers need, shared across updates.
pub(crate) struct HandlerContext {
    pub relay: Arc<RelayService>,
    pub allowed: HashSet<i64>,
    pub transcriber: Option<Transcriber>,
    pub bot_token: String,
    pub state: Arc<TelegramState>,
}

impl HandlerContext {
    /// Empty allowlist admits everyone.
    fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&user_id)
    }
}

pub(crate) async fn handle_message(
    bot: Bot,
    msg: Message,
    ctx: Arc<HandlerContext>,
) -> ResponseResult<()> {
    let user = match msg.from {
        Some(ref u) => u,
        None => return Ok(()),
    };
    let user_id = user.id.0 as i64;
    let key = UserKey::telegram(user.id.0);

    let command = match msg.text() {
        Some(text) if text.starts_with('/') => {
            let username = ctx.state.bot_username().await.unwrap_or_default();
            Some(Command::parse(text, &username))
        }
        _ => None,
    };

    // /start always answers with the user ID (for allowlist setup)
    if let Some(Ok(Command::Start)) = command {
        let reply = format!(
            "👋 Hi! I relay your messages to a language model.\n\nYour user ID: {}\n\n{}",
            user_id,
            Command::descriptions()
        );
        bot.send_message(msg.chat.id, reply).await?;
        tracing::info!("Telegram: /start from user {} ({})", user_id, user.first_name);
        return Ok(());
    }

    if !ctx.is_allowed(user_id) {
        tracing::debug!("Telegram: ignoring message from non-allowed user {}", user_id);
        bot.send_message(msg.chat.id, "You are not authorized. Send /start to get your user ID.")
            .await?;
        return Ok(());
    }

    match command {
        Some(Ok(cmd)) => return handle_command(&bot, &msg, &ctx, &key, cmd).await,
        Some(Err(_)) => {
            bot.send_message(
                msg.chat.id,
                format!("Unknown command.\n\n{}", Command::descriptions()),
            )
            .await?;
            return Ok(());
        }
        None => {}
    }

    if let Some(text) = msg.text() {
        if text.trim().is_empty() {
            return Ok(());
        }
        tracing::info!(
            "Telegram: text from user {} ({}): {}",
            user_id,
            user.first_name,
            preview(text, 50)
        );
        bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;
        let reply = ctx.relay.handle_text(&key, text).await;
        send_long(&bot, msg.chat.id, &reply.render()).await?;
    } else if let Some(voice) = msg.voice() {
        let Some(ref transcriber) = ctx.transcriber else {
            bot.send_message(msg.chat.id, "Voice notes are not enabled.")
                .await?;
            return Ok(());
        };

        tracing::info!(
            "Telegram: voice note from user {} ({}), {}s",
            user_id,
            user.first_name,
            voice.duration,
        );

        let file = bot.get_file(&voice.file.id).await?;
        let audio_bytes = match download_file(&ctx.bot_token, &file.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Telegram: failed to download voice file: {}", e);
                bot.send_message(msg.chat.id, "Failed to download voice note.")
                    .await?;
                return Ok(());
            }
        };

        bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;
        let transcript = match transcriber.transcribe(audio_bytes).await {
            Ok(t) if !t.is_empty() => t,
            Ok(_) => {
                bot.send_message(msg.chat.id, "❌ No speech recognised in the voice note.")
                    .await?;
                return Ok(());
            }
            Err(e) => {
                tracing::error!("Telegram: STT error: {}", e);
                bot.send_message(msg.chat.id, "❌ Voice transcription failed.")
                    .await?;
                return Ok(());
            }
        };
        tracing::info!("Telegram: transcribed voice: {}", preview(&transcript, 80));

        let reply = ctx.relay.handle_voice(&key, &transcript).await;
        send_long(&bot, msg.chat.id, &reply.render()).await?;
    }
    // Other message kinds are ignored

    Ok(())
}

async fn handle_command(
    bot: &Bot,
    msg: &Message,
    ctx: &HandlerContext,
    key: &UserKey,
    cmd: Command,
) -> ResponseResult<()> {
    match cmd {
        Command::Start | Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::StartNewChat => {
            let reply = match ctx.relay.start_conversation(key) {
                Ok(_) => format!(
                    "🆕 New chat started: {}",
                    chrono::Local::now().format("%d.%m.%Y %H:%M:%S")
                ),
                Err(e) => {
                    tracing::error!("Telegram: failed to start chat for {}: {}", key, e);
                    e.user_message()
                }
            };
            bot.send_message(msg.chat.id, reply).await?;
        }
        Command::SetModel => {
            bot.send_message(msg.chat.id, "Select a model:")
                .reply_markup(model_keyboard(ctx.relay.available_models()))
                .await?;
        }
        Command::CurrentModel => {
            let model = ctx.relay.current_model(key);
            bot.send_message(msg.chat.id, format!("🛠 Current model: {}", model))
                .await?;
        }
    }
    Ok(())
}

/// Handle a press on the model picker keyboard.
pub(crate) async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    ctx: Arc<HandlerContext>,
) -> ResponseResult<()> {
    let user_id = q.from.id.0;
    if !ctx.is_allowed(user_id as i64) {
        tracing::warn!("Telegram: unauthorized callback from user {}", user_id);
        bot.answer_callback_query(q.id).text("Unauthorized.").await?;
        return Ok(());
    }

    let requested = q
        .data
        .as_deref()
        .and_then(parse_model_callback)
        .map(str::to_string);

    let selected = requested.and_then(|name| {
        ctx.relay
            .select_model(&UserKey::telegram(user_id), &name)
            .map_err(|e| tracing::warn!("Telegram: model selection from {} failed: {}", user_id, e))
            .ok()
    });

    match selected {
        Some(model) => {
            bot.answer_callback_query(q.id.clone()).await?;
            let text = format!("✅ Model changed to: {}", model);
            if let Some(MaybeInaccessibleMessage::Regular(m)) = q.message {
                bot.edit_message_text(m.chat.id, m.id, text).await?;
            } else {
                bot.send_message(ChatId(user_id as i64), text).await?;
            }
        }
        None => {
            bot.answer_callback_query(q.id)
                .text("❌ Model selection failed.")
                .show_alert(true)
                .await?;
        }
    }
    Ok(())
}

async fn download_file(bot_token: &str, file_path: &str) -> anyhow::Result<Vec<u8>> {
    let url = format!("https://api.telegram.org/file/bot{}/{}", bot_token, file_path);
    let response = reqwest::get(&url).await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

async fn send_long(bot: &Bot, chat_id: ChatId, text: &str) -> ResponseResult<()> {
    for chunk in split_message(text, MAX_MESSAGE_LEN) {
        bot.send_message(chat_id, chunk).await?;
    }
    Ok(())
}

/// Split a message into chunks of at most `max_len` bytes, preferring line
/// breaks near the end of each chunk and never cutting inside a character.
pub(crate) fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let rest = &text[start..];
        let mut window = truncate_str(rest, max_len);
        if window.is_empty() {
            // max_len smaller than one character; emit it whole
            let first = rest.chars().next().map_or(rest.len(), char::len_utf8);
            window = &rest[..first];
        }
        let take = if window.len() < rest.len() {
            window
                .rfind('\n')
                .filter(|&pos| pos + 200 > window.len())
                .map(|pos| pos + 1)
                .unwrap_or(window.len())
        } else {
            window.len()
        };
        chunks.push(&rest[..take]);
        start += take;
    }
    chunks
}
