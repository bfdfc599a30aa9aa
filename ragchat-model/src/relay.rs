//! Completion relay: prompt assembly plus single-shot and streamed replies.
//!
//! The [`CompletionRelay`] wraps retrieved context into a system instruction,
//! pairs it with the user's message and asks a [`ChatModel`] for a reply.
//! Streamed replies are exposed as a [`TokenStream`]: lazy, finite, not
//! restartable, and infallible from the consumer's point of view. Failures
//! after the stream has started are logged and end the stream, because
//! tokens already delivered cannot be taken back.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragchat_model::{CompletionRelay, RelayConfig};
//!
//! let relay = CompletionRelay::new(Arc::new(model), RelayConfig::default());
//! let reply = relay.complete(&context, "are cats mammals?").await?;
//!
//! let mut tokens = relay.complete_stream(&context, "are cats mammals?").await?;
//! while let Some(token) = tokens.next().await {
//!     print!("{token}");
//! }
//! ```

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info};

use crate::error::{ModelError, Result};
use crate::message::{ChatMessage, CompletionRequest, Usage};
use crate::model::ChatModel;

/// The default system instruction placed before the retrieved context.
pub const DEFAULT_INSTRUCTION: &str =
    "You are a helpful assistant. Answer the user's question using the context below when it is relevant.";

/// Tokens forwarded to the consumer, in arrival order.
pub type TokenStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Configuration for the [`CompletionRelay`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    /// Instruction text that precedes the retrieved context.
    pub instruction: String,
    /// Upper bound on generated tokens.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Bounded wait for the stream to open and yield its first token.
    pub first_token_timeout: Duration,
    /// Bounded wait between consecutive tokens.
    pub idle_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            instruction: DEFAULT_INSTRUCTION.to_string(),
            max_tokens: Some(500),
            temperature: Some(0.7),
            first_token_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(30),
        }
    }
}

impl RelayConfig {
    /// Create a new builder for constructing a [`RelayConfig`].
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RelayConfig`].
#[derive(Debug, Clone, Default)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    /// Set the system instruction.
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.instruction = instruction.into();
        self
    }

    /// Set the maximum number of generated tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Set the first-token timeout for streams.
    pub fn first_token_timeout(mut self, timeout: Duration) -> Self {
        self.config.first_token_timeout = timeout;
        self
    }

    /// Set the inter-token timeout for streams.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Build the [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if:
    /// - `max_tokens == 0`
    /// - `temperature` lies outside `[0, 2]`
    /// - either stream timeout is zero
    pub fn build(self) -> Result<RelayConfig> {
        let config = self.config;
        if config.max_tokens == Some(0) {
            return Err(ModelError::InvalidConfig("max_tokens must be greater than zero".into()));
        }
        if let Some(temperature) = config.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ModelError::InvalidConfig(format!(
                    "temperature ({temperature}) must lie within [0, 2]"
                )));
            }
        }
        if config.first_token_timeout.is_zero() || config.idle_timeout.is_zero() {
            return Err(ModelError::InvalidConfig("stream timeouts must be non-zero".into()));
        }
        Ok(config)
    }
}

/// The outcome of a single-shot completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// The model's answer.
    pub reply: String,
    /// Token usage reported by the service.
    pub usage: Usage,
}

/// Sends context-augmented prompts to a [`ChatModel`].
pub struct CompletionRelay {
    model: Arc<dyn ChatModel>,
    config: RelayConfig,
}

impl CompletionRelay {
    /// Create a relay over the given model.
    pub fn new(model: Arc<dyn ChatModel>, config: RelayConfig) -> Self {
        Self { model, config }
    }

    /// Return a reference to the relay configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Build the system and user messages for one exchange.
    ///
    /// Without context the system message is the bare instruction.
    pub fn build_messages(&self, system_context: &str, user_message: &str) -> Vec<ChatMessage> {
        let system = if system_context.trim().is_empty() {
            self.config.instruction.clone()
        } else {
            format!("{}\n\nContext:\n{}", self.config.instruction, system_context)
        };
        vec![ChatMessage::system(system), ChatMessage::user(user_message)]
    }

    fn request(&self, system_context: &str, user_message: &str) -> CompletionRequest {
        CompletionRequest {
            messages: self.build_messages(system_context, user_message),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    /// Ask for a complete reply.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Completion`] or [`ModelError::Timeout`] from the
    /// model. There is no local retry.
    pub async fn complete(&self, system_context: &str, user_message: &str) -> Result<Reply> {
        let request = self.request(system_context, user_message);
        let completion = self.model.complete(request).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "completion failed");
            e
        })?;

        info!(
            model = self.model.name(),
            prompt_tokens = completion.usage.prompt_tokens,
            completion_tokens = completion.usage.completion_tokens,
            total_tokens = completion.usage.total_tokens,
            "completion finished"
        );

        Ok(Reply { reply: completion.content, usage: completion.usage })
    }

    /// Open a token stream for the reply.
    ///
    /// The upstream request is established and its first non-empty token is
    /// read before this returns, so any failure before output begins is
    /// reported as `Err`. After that, each token is forwarded as soon as it
    /// arrives and empty chunks are dropped. The stream ends when upstream
    /// completes, fails, or stays silent past `idle_timeout`. Dropping the
    /// stream drops the upstream connection.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Completion`] if the request cannot be established
    /// or fails before its first token, and [`ModelError::Timeout`] if the
    /// first token does not arrive within `first_token_timeout`. Setup and the
    /// first token share that one deadline.
    pub async fn complete_stream(
        &self,
        system_context: &str,
        user_message: &str,
    ) -> Result<TokenStream> {
        let request = self.request(system_context, user_message);
        let first_token_timeout = self.config.first_token_timeout;
        let idle_timeout = self.config.idle_timeout;
        let model = self.model.name().to_string();
        let deadline = Instant::now() + first_token_timeout;

        let first_token_elapsed = |operation: &str| {
            error!(model = %model, timeout = ?first_token_timeout, operation, "no first token in time");
            ModelError::Timeout { operation: operation.into(), after: first_token_timeout }
        };

        let mut upstream = timeout_at(deadline, self.model.stream(request))
            .await
            .map_err(|_| first_token_elapsed("stream setup"))?
            .map_err(|e| {
                error!(model = %model, error = %e, "stream setup failed");
                e
            })?;

        let first = loop {
            match timeout_at(deadline, upstream.next()).await {
                Ok(Some(Ok(token))) if token.is_empty() => continue,
                Ok(Some(Ok(token))) => break Some(token),
                Ok(Some(Err(e))) => {
                    error!(model = %model, error = %e, "stream failed before the first token");
                    return Err(e);
                }
                Ok(None) => break None,
                Err(_) => return Err(first_token_elapsed("first token")),
            }
        };

        let tokens = stream! {
            let mut forwarded = 0usize;
            if let Some(first) = first {
                forwarded += 1;
                yield first;

                loop {
                    match tokio::time::timeout(idle_timeout, upstream.next()).await {
                        Ok(Some(Ok(token))) => {
                            if token.is_empty() {
                                continue;
                            }
                            forwarded += 1;
                            yield token;
                        }
                        Ok(Some(Err(e))) => {
                            error!(model = %model, error = %e, forwarded, "stream failed mid-response");
                            break;
                        }
                        Ok(None) => break,
                        Err(_) => {
                            error!(model = %model, timeout = ?idle_timeout, forwarded, "stream stalled");
                            break;
                        }
                    }
                }
            }
            debug!(model = %model, forwarded, "stream ended");
        };

        Ok(Box::pin(tokens))
    }
}
