//! CLI command handlers.

use anyhow::{Context, Result};
use std::sync::Arc;

use super::{LogCommands, ModelCommands};
use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::models::ModelSelector;
use crate::provider::OpenAIProvider;
use crate::relay::{Reply, RelayService};
use crate::user::UserKey;

/// Build the relay with a live provider. Needs the API key.
fn build_relay(config: &Config) -> Result<RelayService> {
    let api_key = config.require_api_key()?.to_string();
    let provider = OpenAIProvider::with_base_url(api_key, config.provider.base_url.clone())
        .context("Failed to create HTTP client")?
        .with_system_prompt(config.provider.system_prompt.clone());

    RelayService::from_config(config, Arc::new(provider)).context("Failed to set up relay")
}

#[cfg(feature = "telegram")]
pub(super) async fn cmd_run(config: &Config) -> Result<()> {
    use crate::channels::telegram::TelegramAgent;
    use crate::channels::voice::Transcriber;

    let token = config.require_bot_token()?.to_string();
    let relay = Arc::new(build_relay(config)?);

    let transcriber = match (config.voice.stt_enabled, config.stt_api_key()) {
        (true, Some(key)) => Some(Transcriber::new(
            config.voice.stt_url.clone(),
            key.to_string(),
            config.voice.stt_model.clone(),
        )),
        (true, None) => {
            tracing::warn!("Voice transcription enabled but no API key is set; disabling");
            None
        }
        (false, _) => None,
    };

    let agent = TelegramAgent::new(
        relay,
        config.telegram.allowed_users.clone(),
        transcriber,
        config.telegram.notify_chat_id,
    );

    agent
        .start(token)
        .await
        .context("Telegram bot task failed")?;
    Ok(())
}

#[cfg(not(feature = "telegram"))]
pub(super) async fn cmd_run(_config: &Config) -> Result<()> {
    anyhow::bail!("chatrelay was built without the `telegram` feature")
}

pub(super) async fn cmd_ask(config: &Config, user: &str, new: bool, prompt: &str) -> Result<()> {
    let relay = build_relay(config)?;
    let key = UserKey::new(user);

    if new {
        let path = relay.start_conversation(&key)?;
        tracing::info!("Started {}", path.display());
    }

    match relay.handle_text(&key, prompt).await {
        reply @ Reply::Answer { .. } => {
            println!("{}", reply.render());
            Ok(())
        }
        Reply::Error { message, .. } => anyhow::bail!(message),
    }
}

pub(super) fn cmd_new_chat(config: &Config, user: &str) -> Result<()> {
    let store = ConversationStore::from_config(config);
    let log = store.start(&UserKey::new(user))?;
    println!("🆕 New chat started: {}", log.path().display());
    Ok(())
}

pub(super) fn cmd_history(config: &Config, user: &str) -> Result<()> {
    let store = ConversationStore::from_config(config);
    let key = UserKey::new(user);

    let Some(log) = store.active(&key) else {
        println!("No chat for {}. Run `chatrelay new-chat --user {}` first.", key, user);
        return Ok(());
    };

    let earlier = store.list(&key).len().saturating_sub(1);
    println!("📜 {} ({} earlier chat(s))\n", log.path().display(), earlier);
    let turns = log.reconstruct()?;
    if turns.is_empty() {
        println!("(empty conversation)");
    }
    for turn in turns {
        println!("{} {}", turn.role.prefix(), turn.text);
    }
    Ok(())
}

pub(super) fn cmd_model(config: &Config, operation: ModelCommands) -> Result<()> {
    let selector = ModelSelector::from_config(config)?;

    match operation {
        ModelCommands::List => {
            let default = selector.catalog().default_model();
            for model in selector.catalog().available() {
                let marker = if model == default.as_str() { " (default)" } else { "" };
                println!("  - {}{}", model, marker);
            }
        }
        ModelCommands::Show { user } => {
            println!("🛠 Current model: {}", selector.load(&UserKey::new(&user)));
        }
        ModelCommands::Set { user, model } => {
            let model = selector.save(&UserKey::new(&user), &model)?;
            println!("✅ Model changed to: {}", model);
        }
    }
    Ok(())
}

pub(super) fn cmd_init(config: &Config, force: bool) -> Result<()> {
    println!("Chatrelay Configuration Initialization\n");

    let config_path =
        Config::system_config_path().context("Could not determine config directory")?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            config_path.display()
        );
    }

    // Secrets stay in the environment, never in the generated file
    let mut fresh = Config::default();
    fresh.storage = config.storage.clone();
    fresh.save(&config_path)?;

    println!("✅ Configuration initialized at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set TELEGRAM_BOT_TOKEN and OPENAI_API_KEY (environment or .env)");
    println!("   2. Optionally list allowed Telegram user IDs under [telegram]");
    println!("   3. Run 'chatrelay' to start the bot");

    Ok(())
}

pub(super) fn cmd_config(config: &Config, show_secrets: bool) -> Result<()> {
    let shown = if show_secrets {
        config.clone()
    } else {
        config.masked()
    };
    let rendered = toml::to_string_pretty(&shown).context("Failed to render configuration")?;
    println!("{}", rendered);

    if !show_secrets {
        println!("💡 Use --show-secrets to display API keys");
    }
    Ok(())
}

pub(super) fn cmd_logs(config: &Config, operation: LogCommands) -> Result<()> {
    use crate::logging;

    let log_dir = config.log_dir();

    match operation {
        LogCommands::Status => {
            println!("Log directory: {}", log_dir.display());
            let Ok(entries) = std::fs::read_dir(&log_dir) else {
                println!("Status: ❌ No logs found");
                return Ok(());
            };

            let mut file_count = 0;
            let mut total_size = 0u64;
            for entry in entries.flatten() {
                if let Ok(meta) = entry.metadata()
                    && meta.is_file()
                {
                    file_count += 1;
                    total_size += meta.len();
                }
            }
            println!("Log files: {}", file_count);
            println!("Total size: {:.2} MB", total_size as f64 / (1024.0 * 1024.0));
        }
        LogCommands::Clean { days } => {
            println!("🧹 Cleaning up log files older than {} days...\n", days);
            let removed = logging::cleanup_old_logs(&log_dir, days)?;
            if removed > 0 {
                println!("✅ Removed {} old log file(s)", removed);
            } else {
                println!("✅ No old log files to remove");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.storage.data_dir = dir.path().to_path_buf();
        config
    }

    #[test]
    fn test_model_set_then_show_persists() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        cmd_model(
            &config,
            ModelCommands::Set {
                user: "alice".to_string(),
                model: "gpt-4o".to_string(),
            },
        )
        .unwrap();

        let selector = ModelSelector::from_config(&config).unwrap();
        assert_eq!(selector.load(&UserKey::new("alice")).as_str(), "gpt-4o");
    }

    #[test]
    fn test_model_set_rejects_unknown() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let result = cmd_model(
            &config,
            ModelCommands::Set {
                user: "alice".to_string(),
                model: "bogus-model".to_string(),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_new_chat_then_history() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        cmd_new_chat(&config, "alice").unwrap();
        cmd_history(&config, "alice").unwrap();

        let store = ConversationStore::from_config(&config);
        assert_eq!(store.list(&UserKey::new("alice")).len(), 1);
    }

    #[test]
    fn test_history_without_chat_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(cmd_history(&config_in(&dir), "nobody").is_ok());
    }

    #[tokio::test]
    async fn test_ask_requires_api_key() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let err = cmd_ask(&config, "alice", true, "hi").await.unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_ask_relays_through_provider() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"model":"gpt-3.5-turbo","choices":[{"message":{"role":"assistant","content":"pong"}}]}"#)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.provider.api_key = Some("test-key".to_string());
        config.provider.base_url = server.url();

        cmd_ask(&config, "alice", true, "ping").await.unwrap();
        mock.assert_async().await;

        let store = ConversationStore::from_config(&config);
        let turns = store
            .active(&UserKey::new("alice"))
            .unwrap()
            .reconstruct()
            .unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, "pong");
    }

    #[test]
    fn test_logs_clean_on_missing_dir() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.logging.dir = Some(dir.path().join("no-logs-here"));
        assert!(cmd_logs(&config, LogCommands::Clean { days: 7 }).is_ok());
    }
}
