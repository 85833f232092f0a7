//! chatrelay - Telegram bot relaying conversations to a chat-completion model
//!
//! Each Telegram user gets an append-only conversation log on disk and a
//! persisted model choice. Every incoming message is sent to an
//! OpenAI-compatible `/chat/completions` endpoint together with the full
//! reconstructed history, and the answer is recorded before it is returned.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run the bot (needs TELEGRAM_BOT_TOKEN and OPENAI_API_KEY)
//! chatrelay
//!
//! # One-shot relay from the terminal
//! chatrelay ask --user alice --new "hello"
//!
//! # Model selection
//! chatrelay model set --user alice gpt-4o
//! ```

pub mod channels;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod models;
pub mod provider;
pub mod relay;
pub mod user;
pub mod utils;

// Re-export commonly used types
pub use error::{ErrorCode, RelayError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
