//! Voice Transcription
//!
//! Speech-to-text for Telegram voice notes via an OpenAI-compatible
//! `/audio/transcriptions` endpoint (OpenAI Whisper, Groq, local servers).

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

/// Where and how to transcribe.
#[derive(Debug, Clone)]
pub struct Transcriber {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

impl Transcriber {
    pub fn new(url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            url,
            api_key,
            model,
        }
    }

    /// Transcribe OGG/Opus audio (Telegram voice note format).
    pub async fn transcribe(&self, audio_bytes: Vec<u8>) -> Result<String> {
        let file_part = reqwest::multipart::Part::bytes(audio_bytes)
            .file_name("voice.ogg")
            .mime_str("audio/ogg")?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to send audio for transcription")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("STT error ({}): {}", status, error_text);
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        tracing::info!("STT: transcribed {} chars with {}", result.text.len(), self.model);

        Ok(result.text.trim().to_string())
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}
