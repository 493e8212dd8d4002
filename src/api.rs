//! Chat-completion API client.
//!
//! The keyword requester talks to the model through the [`CompletionService`]
//! trait. [`OpenAiChat`] implements it against any OpenAI-compatible
//! `/chat/completions` endpoint.
//!
//! Completion calls are never retried: a failed call is reported to the caller
//! as is.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Default endpoint base for the OpenAI API.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Errors raised by a completion call.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The request could not be sent or the response could not be decoded.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response carried no message content.
    #[error("completion response contained no message content")]
    EmptyResponse,
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the message list sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Trait for chat-completion backends.
///
/// Implementors send an ordered message list to `model` and return the text of
/// the first choice.
pub trait CompletionService {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, CompletionError>;
}

impl<T: CompletionService + ?Sized> CompletionService for &T {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, CompletionError> {
        (**self).complete(model, messages).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completion endpoint.
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiChat {
    /// Create a client for `{api_base}/chat/completions`.
    ///
    /// # Arguments
    ///
    /// * `api_base` - Base URL such as `https://api.openai.com/v1`
    /// * `api_key` - Bearer token sent with every request
    /// * `timeout` - Upper bound for one completion call
    pub fn new(
        api_base: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for OpenAiChat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChat")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl CompletionService for OpenAiChat {
    #[instrument(level = "info", skip_all, fields(%model, messages = messages.len()))]
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, CompletionError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest { model, messages })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis(),
                "Completion call failed"
            );
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(CompletionError::EmptyResponse)?;

        debug!(
            elapsed_ms = t0.elapsed().as_millis(),
            bytes = content.len(),
            "Completion call succeeded"
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn messages() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("Apple launched Vision Pro"),
        ]
    }

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_value(ChatMessage::assistant("Vision Pro")).unwrap();
        assert_eq!(json, json!({ "role": "assistant", "content": "Vision Pro" }));
    }

    #[test]
    fn test_endpoint_joins_base() {
        let chat = OpenAiChat::new("https://api.openai.com/v1/", "k", Duration::from_secs(5)).unwrap();
        assert_eq!(chat.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert!(!format!("{chat:?}").contains("\"k\""));
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer test-key")
                .json_body(json!({
                    "model": "gpt-3.5-turbo",
                    "messages": [
                        { "role": "system", "content": "be brief" },
                        { "role": "user", "content": "Apple launched Vision Pro" }
                    ]
                }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "choices": [
                        { "index": 0, "message": { "role": "assistant", "content": "Vision Pro, Apple" } }
                    ]
                }));
        });

        let chat = OpenAiChat::new(&server.url("/v1"), "test-key", Duration::from_secs(5)).unwrap();
        let got = chat.complete(DEFAULT_MODEL, &messages()).await.unwrap();

        mock.assert();
        assert_eq!(got, "Vision Pro, Apple");
    }

    #[tokio::test]
    async fn test_complete_surfaces_error_status() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401).body("invalid api key");
        });

        let chat = OpenAiChat::new(&server.url("/v1"), "bad", Duration::from_secs(5)).unwrap();
        let err = chat.complete(DEFAULT_MODEL, &messages()).await.unwrap_err();

        mock.assert_hits(1);
        match err {
            CompletionError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_empty_response() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "choices": [] }));
        });

        let chat = OpenAiChat::new(&server.url("/v1"), "k", Duration::from_secs(5)).unwrap();
        let err = chat.complete(DEFAULT_MODEL, &messages()).await.unwrap_err();

        assert!(matches!(err, CompletionError::EmptyResponse));
    }
}
