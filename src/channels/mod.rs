//! Channel Integrations
//!
//! Chat platform front-ends for the relay service, plus voice transcription.

pub mod voice;

#[cfg(feature = "telegram")]
pub mod telegram;
