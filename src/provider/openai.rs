//! OpenAI-compatible Provider
//!
//! Talks to `POST {base_url}/chat/completions`. Works with OpenAI itself and
//! with compatible servers (LM Studio, Ollama, vLLM) via a custom base URL.

use super::error::ProviderError;
use super::types::{ChatMessage, Completion, CompletionRequest};
use super::Provider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Clone)]
pub struct OpenAIProvider {
    api_key: String,
    base_url: String,
    client: Client,
    system_prompt: Option<String>,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, OPENAI_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(DEFAULT_POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(2)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            system_prompt: None,
        })
    }

    /// Prepend a system message to every request.
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn to_openai_request(&self, request: CompletionRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(ref prompt) = self.system_prompt {
            messages.push(ChatMessage::system(prompt.clone()));
        }
        messages.extend(request.messages);
        OpenAIRequest {
            model: request.model,
            messages,
        }
    }

    async fn handle_error(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<OpenAIErrorBody>(&body) {
            Ok(parsed) => ProviderError::Api {
                status,
                message: parsed.error.message,
                error_type: parsed.error.error_type,
            },
            Err(_) => ProviderError::Api {
                status,
                message: if body.is_empty() {
                    "Unknown error".to_string()
                } else {
                    body.chars().take(500).collect()
                },
                error_type: None,
            },
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        tracing::info!(
            "OpenAI API request: model={}, messages={}",
            request.model,
            request.messages.len()
        );

        let requested = request.model.clone();
        let body = self.to_openai_request(request);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("OpenAI API response status: {}", status);

        if !status.is_success() {
            let err = self.handle_error(response).await;
            tracing::error!("OpenAI API request failed: {}", err);
            return Err(err);
        }

        let text = response.text().await?;
        let parsed: OpenAIResponse = serde_json::from_str(&text)?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        let model = parsed.model.unwrap_or(requested);
        if let Some(usage) = parsed.usage {
            tracing::info!(
                "OpenAI API response: model={}, prompt_tokens={}, completion_tokens={}",
                model,
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        Ok(Completion { content, model })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Turn;

    fn provider(url: &str) -> OpenAIProvider {
        OpenAIProvider::with_base_url("test-key".to_string(), url.to_string()).unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::from_turns(
            "gpt-4o",
            &[Turn::user("Hello"), Turn::assistant("Hi there"), Turn::user("How are you?")],
        )
    }

    #[tokio::test]
    async fn test_complete_success_reports_served_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "chatcmpl-1",
                    "model": "gpt-4o-2024-08-06",
                    "choices": [{"index": 0, "message": {"role": "assistant", "content": "Fine, thanks."}}],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
                }"#,
            )
            .create_async()
            .await;

        let completion = provider(&server.url()).complete(request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(completion.content, "Fine, thanks.");
        assert_eq!(completion.model, "gpt-4o-2024-08-06");
    }

    #[tokio::test]
    async fn test_sends_history_in_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model":"gpt-4o","messages":[
                    {"role":"user","content":"Hello"},
                    {"role":"assistant","content":"Hi there"},
                    {"role":"user","content":"How are you?"}
                ]}"#
                .to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"model":"gpt-4o","choices":[{"message":{"content":"ok"}}]}"#)
            .create_async()
            .await;

        provider(&server.url()).complete(request()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_system_prompt_is_prepended() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"messages":[{"role":"system","content":"Be brief."},
                    {"role":"user","content":"Hello"},
                    {"role":"assistant","content":"Hi there"},
                    {"role":"user","content":"How are you?"}]}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"model":"gpt-4o","choices":[{"message":{"content":"ok"}}]}"#)
            .create_async()
            .await;

        provider(&server.url())
            .with_system_prompt(Some("Be brief.".to_string()))
            .complete(request())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_model_falls_back_to_requested() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ok"}}]}"#)
            .create_async()
            .await;

        let completion = provider(&server.url()).complete(request()).await.unwrap();
        assert_eq!(completion.model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_api_error_is_parsed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#)
            .create_async()
            .await;

        let err = provider(&server.url()).complete(request()).await.unwrap_err();

        mock.assert_async().await;
        match err {
            ProviderError::Api {
                status,
                message,
                error_type,
            } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
                assert_eq!(error_type.as_deref(), Some("invalid_request_error"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_with_plain_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let err = provider(&server.url()).complete(request()).await.unwrap_err();
        assert!(err.is_rate_limit());
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("slow down"));
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"model":"gpt-4o","choices":[]}"#)
            .create_async()
            .await;

        let err = provider(&server.url()).complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_malformed_json_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let err = provider(&server.url()).complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let p = provider("http://localhost:1234/v1/");
        assert_eq!(p.endpoint(), "http://localhost:1234/v1/chat/completions");
    }
}
