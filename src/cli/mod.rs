//! CLI Module
//!
//! Command-line interface for chatrelay using Clap v4.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;

use crate::config::Config;

/// chatrelay - Telegram bot relaying conversations to a chat-completion model
#[derive(Parser, Debug)]
#[command(name = "chatrelay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging for this crate
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Telegram bot (default)
    Run,

    /// Relay a single prompt and print the answer
    Ask {
        /// User key the conversation belongs to
        #[arg(short, long)]
        user: String,

        /// Start a fresh conversation first
        #[arg(short, long)]
        new: bool,

        /// The prompt to send
        prompt: String,
    },

    /// Start a new conversation for a user
    NewChat {
        #[arg(short, long)]
        user: String,
    },

    /// Print the active conversation of a user
    History {
        #[arg(short, long)]
        user: String,
    },

    /// Model selection
    Model {
        #[command(subcommand)]
        operation: ModelCommands,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration
    Config {
        /// Show full configuration including secrets
        #[arg(short, long)]
        show_secrets: bool,
    },

    /// Log management operations
    Logs {
        #[command(subcommand)]
        operation: LogCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModelCommands {
    /// List the models that can be selected
    List,
    /// Show the model a user is on
    Show {
        #[arg(short, long)]
        user: String,
    },
    /// Change the model for a user
    Set {
        #[arg(short, long)]
        user: String,
        /// Model identifier, one of `model list`
        model: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Show log file location and status
    Status,
    /// Clean up old log files
    Clean {
        /// Maximum age in days (default: 7)
        #[arg(short = 'a', long, default_value = "7")]
        days: u64,
    },
}

/// Load configuration from `--config` or the default locations.
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config = match config_path {
        Some(path) => Config::load_from_path(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::load().context("Failed to load configuration")?,
    };
    config.validate()?;
    Ok(config)
}

/// Main CLI entry point
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    if cli.debug {
        tracing::info!("Debug mode enabled");
    }

    match cli.command {
        None | Some(Commands::Run) => commands::cmd_run(&config).await,
        Some(Commands::Ask { user, new, prompt }) => {
            commands::cmd_ask(&config, &user, new, &prompt).await
        }
        Some(Commands::NewChat { user }) => commands::cmd_new_chat(&config, &user),
        Some(Commands::History { user }) => commands::cmd_history(&config, &user),
        Some(Commands::Model { operation }) => commands::cmd_model(&config, operation),
        Some(Commands::Init { force }) => commands::cmd_init(&config, force),
        Some(Commands::Config { show_secrets }) => commands::cmd_config(&config, show_secrets),
        Some(Commands::Logs { operation }) => commands::cmd_logs(&config, operation),
    }
}
