//! OpenAI client implementation.

use async_stream::try_stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::config::OpenAIConfig;
use crate::error::{ModelError, Result};
use crate::message::{ChatMessage, Completion, CompletionRequest, Usage};
use crate::model::{ChatModel, ChunkStream};

const PROVIDER: &str = "OpenAI";

/// Server-sent data line marking the end of a streamed completion.
const DONE_SENTINEL: &str = "[DONE]";

/// OpenAI client for the standard OpenAI API and OpenAI-compatible APIs.
pub struct OpenAIClient {
    client: reqwest::Client,
    config: OpenAIConfig,
}

impl OpenAIClient {
    /// Create a new OpenAI client.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ModelError::InvalidConfig("API key must not be empty".into()));
        }
        if config.model.is_empty() {
            return Err(ModelError::InvalidConfig("model must not be empty".into()));
        }
        Ok(Self { client: reqwest::Client::new(), config })
    }

    /// Create a client for an OpenAI-compatible API.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        Self::new(OpenAIConfig::compatible(api_key, base_url, model))
    }

    /// Create a client from the `OPENAI_API_KEY` environment variable.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ModelError::InvalidConfig("OPENAI_API_KEY environment variable not set".into())
        })?;
        Self::new(OpenAIConfig::new(api_key, model))
    }

    /// Return the client configuration.
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Send the request and check the status, bounded by the configured timeout.
    async fn send(&self, request: &CompletionRequest, stream: bool) -> Result<reqwest::Response> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
        };

        let send = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send();

        let response = tokio::time::timeout(self.config.timeout, send)
            .await
            .map_err(|_| {
                error!(provider = PROVIDER, timeout = ?self.config.timeout, "completion request timed out");
                ModelError::Timeout {
                    operation: "chat completion request".into(),
                    after: self.config.timeout,
                }
            })?
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                service_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(service_error(format!("API returned {status}: {detail}")));
        }

        Ok(response)
    }
}

fn service_error(message: String) -> ModelError {
    ModelError::Completion { provider: PROVIDER.into(), message }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── ChatModel implementation ───────────────────────────────────────

#[async_trait]
impl ChatModel for OpenAIClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        debug!(provider = PROVIDER, model = %self.config.model, messages = request.messages.len(), "completion request");

        let response = self.send(&request, false).await?;
        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            service_error(format!("failed to parse response: {e}"))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| service_error("API returned no choices".into()))?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            usage: parsed.usage.unwrap_or_default(),
        })
    }

    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        debug!(provider = PROVIDER, model = %self.config.model, messages = request.messages.len(), "streaming request");

        let response = self.send(&request, true).await?;

        Ok(Box::pin(content_deltas(response)))
    }
}

/// Decode an SSE completion body into its content deltas.
///
/// Ends at the `[DONE]` sentinel or at the end of the body, whichever comes first.
fn content_deltas(response: reqwest::Response) -> impl Stream<Item = Result<String>> + Send {
    try_stream! {
        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| service_error(format!("stream error: {e}")))?;
            if event.data.trim() == DONE_SENTINEL {
                break;
            }

            let chunk: ChatChunk = serde_json::from_str(&event.data)
                .map_err(|e| service_error(format!("malformed stream chunk: {e}")))?;

            for choice in chunk.choices {
                if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                    yield content;
                }
            }
        }
    }
}
