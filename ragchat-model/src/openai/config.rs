//! Configuration for OpenAI-compatible chat-completion endpoints.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Configuration for [`OpenAIClient`](super::OpenAIClient).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAIConfig {
    /// Bearer token.
    pub api_key: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// API base URL, without the trailing `/chat/completions`.
    pub base_url: String,
    /// Bounded wait for a single-shot completion, and for the response
    /// headers of a streaming one.
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Config for the public OpenAI API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Config for an OpenAI-compatible server (vLLM, Ollama, LocalAI, ...).
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::new(api_key, model).with_base_url(base_url)
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatible_strips_trailing_slash() {
        let config = OpenAIConfig::compatible("key", "http://localhost:11434/v1/", "llama3");
        assert_eq!(config.completions_url(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(config.model, "llama3");
    }
}
