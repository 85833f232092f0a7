//! Configuration Module
//!
//! Handles application configuration loading, validation, and management.

mod types;

pub use types::{
    Config, ConversationConfig, LoggingConfig, ModelsConfig, ProviderConfig, StorageConfig,
    TelegramConfig, VoiceConfig,
};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from default locations
    ///
    /// Files are merged table by table. Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.config/chatrelay/config.toml
    /// 3. Local config: ./chatrelay.toml
    /// 4. Environment variables
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let mut config = Self::default();

        if let Some(system_config_path) = Self::system_config_path()
            && system_config_path.exists()
        {
            tracing::debug!("Loading system config from: {:?}", system_config_path);
            config = Self::merge_from_file(config, &system_config_path)?;
        }

        let local_config_path = Self::local_config_path();
        if local_config_path.exists() {
            tracing::debug!("Loading local config from: {:?}", local_config_path);
            config = Self::merge_from_file(config, &local_config_path)?;
        }

        config = Self::apply_env_overrides(config, |key| std::env::var(key).ok())?;

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }
        let config = Self::merge_from_file(Self::default(), path)?;
        Self::apply_env_overrides(config, |key| std::env::var(key).ok())
    }

    /// Get the system config path: ~/.config/chatrelay/config.toml
    pub fn system_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("chatrelay").join("config.toml"))
    }

    /// Get the local config path: ./chatrelay.toml
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("./chatrelay.toml")
    }

    /// Overlay a TOML file on `base`. Tables merge key by key, so a file that
    /// only sets `[models]` keeps every other section of `base`.
    fn merge_from_file(base: Self, path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let overlay: toml::Table = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        let mut merged = match toml::Value::try_from(&base)
            .context("Failed to serialize base config")?
        {
            toml::Value::Table(table) => table,
            other => anyhow::bail!("Base config is not a table: {}", other.type_str()),
        };
        merge_tables(&mut merged, overlay);

        toml::Value::Table(merged)
            .try_into::<Self>()
            .with_context(|| format!("Invalid configuration in {:?}", path))
    }

    /// Apply environment variable overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    fn apply_env_overrides<F>(mut config: Self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            config.telegram.token = Some(token);
        }

        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID") {
            let chat_id = chat_id
                .trim()
                .parse::<i64>()
                .with_context(|| format!("TELEGRAM_CHAT_ID is not a number: {}", chat_id))?;
            config.telegram.notify_chat_id = Some(chat_id);
        }

        if let Some(api_key) = lookup("OPENAI_API_KEY") {
            config.provider.api_key = Some(api_key);
        }

        // For LM Studio, Ollama, etc.
        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            config.provider.base_url = base_url;
        }

        if let Some(model) = lookup("CHATRELAY_DEFAULT_MODEL") {
            config.models.default = model;
        }

        if let Some(data_dir) = lookup("CHATRELAY_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Some(level) = lookup("CHATRELAY_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Some(dir) = lookup("CHATRELAY_LOG_DIR") {
            config.logging.dir = Some(PathBuf::from(dir));
        }

        if let Some(key) = lookup("CHATRELAY_STT_API_KEY") {
            config.voice.api_key = Some(key);
        }

        if let Some(url) = lookup("CHATRELAY_STT_URL") {
            config.voice.stt_url = url;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        tracing::debug!("Validating configuration...");

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                VALID_LOG_LEVELS
            );
        }

        if !self.models.available.iter().any(|m| m == &self.models.default) {
            anyhow::bail!(
                "Default model '{}' is not in models.available {:?}",
                self.models.default,
                self.models.available
            );
        }

        if self.provider.base_url.trim().is_empty() {
            anyhow::bail!("provider.base_url is empty");
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Completion API key, required by every mode that talks to the model.
    pub fn require_api_key(&self) -> Result<&str> {
        self.provider
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .context("OPENAI_API_KEY is not set (environment, .env or [provider] api_key)")
    }

    /// Telegram bot token, required to run the bot.
    pub fn require_bot_token(&self) -> Result<&str> {
        self.telegram
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .context("TELEGRAM_BOT_TOKEN is not set (environment, .env or [telegram] token)")
    }

    /// Key used for voice transcription.
    pub fn stt_api_key(&self) -> Option<&str> {
        self.voice
            .api_key
            .as_deref()
            .or(self.provider.api_key.as_deref())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn log_dir(&self) -> PathBuf {
        self.logging
            .dir
            .clone()
            .unwrap_or_else(|| self.storage.data_dir.join("logs"))
    }

    /// Copy with secrets replaced, for display.
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        let hide = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some("***".to_string());
            }
        };
        hide(&mut masked.telegram.token);
        hide(&mut masked.provider.api_key);
        hide(&mut masked.voice.api_key);
        masked
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.models.default, "gpt-3.5-turbo");
        assert!(config.models.available.contains(&"gpt-4o".to_string()));
        assert!(config.telegram.allowed_users.is_empty());
        assert!(config.voice.stt_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_default_model_not_listed() {
        let mut config = Config::default();
        config.models.default = "bogus-model".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("bogus-model"));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_content = r#"
[telegram]
allowed_users = [111, 222]
notify_chat_id = -100123

[provider]
base_url = "http://localhost:1234/v1"
system_prompt = "Answer briefly."

[models]
available = ["llama3", "qwen2"]
default = "qwen2"

[storage]
data_dir = "/var/lib/chatrelay"

[logging]
level = "debug"
        "#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.telegram.allowed_users, vec![111, 222]);
        assert_eq!(config.telegram.notify_chat_id, Some(-100123));
        assert_eq!(config.provider.base_url, "http://localhost:1234/v1");
        assert_eq!(config.models.default, "qwen2");
        assert_eq!(config.storage.chats_dir(), PathBuf::from("/var/lib/chatrelay/chats"));
        assert_eq!(config.log_dir(), PathBuf::from("/var/lib/chatrelay/logs"));
        assert_eq!(config.logging.level, "debug");
        // untouched sections keep their defaults
        assert!(!config.conversation.filler_phrases.is_empty());
        assert_eq!(config.voice.stt_model, "whisper-1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_file_layers_over_system_file() {
        let mut system = NamedTempFile::new().unwrap();
        writeln!(
            system,
            "[telegram]\nallowed_users = [111]\n\n[models]\ndefault = \"gpt-4o\""
        )
        .unwrap();
        let mut local = NamedTempFile::new().unwrap();
        writeln!(local, "[models]\ndefault = \"gpt-4o-mini\"").unwrap();

        let config = Config::merge_from_file(Config::default(), system.path()).unwrap();
        let config = Config::merge_from_file(config, local.path()).unwrap();

        assert_eq!(config.telegram.allowed_users, vec![111]);
        assert_eq!(config.models.default, "gpt-4o-mini");
        // keys the local table leaves out survive too
        assert!(config.models.available.contains(&"gpt-4".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_rejects_wrong_types() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[telegram]\nallowed_users = \"everyone\"").unwrap();
        assert!(Config::merge_from_file(Config::default(), file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::apply_env_overrides(
            Config::default(),
            env(&[
                ("TELEGRAM_BOT_TOKEN", "123:abc"),
                ("OPENAI_API_KEY", "sk-test"),
                ("TELEGRAM_CHAT_ID", " 42 "),
                ("CHATRELAY_DEFAULT_MODEL", "gpt-4o"),
                ("CHATRELAY_DATA_DIR", "/tmp/relay"),
            ]),
        )
        .unwrap();

        assert_eq!(config.require_bot_token().unwrap(), "123:abc");
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
        assert_eq!(config.telegram.notify_chat_id, Some(42));
        assert_eq!(config.models.default, "gpt-4o");
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/relay"));
    }

    #[test]
    fn test_env_invalid_chat_id() {
        let result =
            Config::apply_env_overrides(Config::default(), env(&[("TELEGRAM_CHAT_ID", "abc")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_credentials() {
        let config = Config::default();
        assert!(config.require_api_key().is_err());
        assert!(config.require_bot_token().is_err());

        let mut blank = Config::default();
        blank.provider.api_key = Some("  ".to_string());
        assert!(blank.require_api_key().is_err());
    }

    #[test]
    fn test_stt_key_falls_back_to_provider_key() {
        let mut config = Config::default();
        assert!(config.stt_api_key().is_none());
        config.provider.api_key = Some("sk-main".to_string());
        assert_eq!(config.stt_api_key(), Some("sk-main"));
        config.voice.api_key = Some("sk-voice".to_string());
        assert_eq!(config.stt_api_key(), Some("sk-voice"));
    }

    #[test]
    fn test_masked_hides_secrets() {
        let mut config = Config::default();
        config.telegram.token = Some("123:secret".to_string());
        config.provider.api_key = Some("sk-secret".to_string());

        let rendered = toml::to_string_pretty(&config.masked()).unwrap();
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("***"));
        assert!(config.masked().voice.api_key.is_none());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.models.default = "gpt-4o".to_string();

        config.save(temp_file.path()).unwrap();

        let loaded = Config::merge_from_file(Config::default(), temp_file.path()).unwrap();
        assert_eq!(loaded.models.default, "gpt-4o");
        assert_eq!(loaded.logging.level, config.logging.level);
    }

    #[test]
    fn test_load_from_missing_path() {
        assert!(Config::load_from_path("/nonexistent/chatrelay.toml").is_err());
    }

    #[test]
    fn test_system_config_path() {
        let path = Config::system_config_path().unwrap();
        assert!(path.to_string_lossy().contains("chatrelay"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
