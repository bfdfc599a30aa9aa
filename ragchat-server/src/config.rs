//! Server configuration read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use ragchat_rag::SeedPolicy;

use crate::telemetry::LogFormat;

/// Runtime configuration for `ragchat-server`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Documents joined into each prompt.
    pub top_k: usize,
    pub chat_model: String,
    pub embedding_model: String,
    /// Matryoshka dimension override for the embedding model.
    pub embedding_dimensions: Option<usize>,
    /// OpenAI-compatible base URL shared by both endpoints.
    pub base_url: Option<String>,
    /// JSON array of seed texts; the built-in list is used when unset.
    pub knowledge_file: Option<PathBuf>,
    pub seed_policy: SeedPolicy,
    pub seed_concurrency: usize,
    /// Bounded wait for every outbound call.
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            top_k: 2,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: None,
            base_url: None,
            knowledge_file: None,
            seed_policy: SeedPolicy::FailFast,
            seed_concurrency: 4,
            request_timeout: Duration::from_secs(30),
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    ///
    /// Unset variables fall back to [`ServerConfig::default`]; set but
    /// unparsable ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let seed_policy = match get("RAGCHAT_SEED_POLICY").as_deref() {
            None => defaults.seed_policy,
            Some("fail-fast") => SeedPolicy::FailFast,
            Some("skip-failed") => SeedPolicy::SkipFailed,
            Some(other) => bail!("RAGCHAT_SEED_POLICY must be 'fail-fast' or 'skip-failed', got '{other}'"),
        };

        let config = Self {
            host: get("RAGCHAT_HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "RAGCHAT_PORT", defaults.port)?,
            top_k: parse_or(&get, "RAGCHAT_TOP_K", defaults.top_k)?,
            chat_model: get("RAGCHAT_CHAT_MODEL").unwrap_or(defaults.chat_model),
            embedding_model: get("RAGCHAT_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dimensions: get("RAGCHAT_EMBEDDING_DIMENSIONS")
                .map(|v| v.parse().context("RAGCHAT_EMBEDDING_DIMENSIONS must be an integer"))
                .transpose()?,
            base_url: get("OPENAI_BASE_URL"),
            knowledge_file: get("RAGCHAT_KNOWLEDGE_FILE").map(PathBuf::from),
            seed_policy,
            seed_concurrency: parse_or(&get, "RAGCHAT_SEED_CONCURRENCY", defaults.seed_concurrency)?,
            request_timeout: Duration::from_secs(parse_or(
                &get,
                "RAGCHAT_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            log_format: parse_or(&get, "RAGCHAT_LOG_FORMAT", defaults.log_format)?,
        };

        if config.top_k == 0 {
            bail!("RAGCHAT_TOP_K must be at least 1");
        }
        if config.request_timeout.is_zero() {
            bail!("RAGCHAT_REQUEST_TIMEOUT_SECS must be at least 1");
        }
        Ok(config)
    }

    /// The socket address string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| anyhow::anyhow!("invalid {key} '{raw}': {e}")),
    }
}
