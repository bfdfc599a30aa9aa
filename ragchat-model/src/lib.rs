//! # ragchat-model
//!
//! Chat-completion integrations and the completion relay for ragchat.
//!
//! ## Overview
//!
//! - [`ChatModel`] - one outbound request per call, single-shot or streamed
//! - [`OpenAIClient`] - OpenAI and OpenAI-compatible APIs (vLLM, Ollama, ...)
//! - [`MockChatModel`] - scripted model for tests
//! - [`CompletionRelay`] - injects retrieved context and forwards replies or tokens
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragchat_model::{CompletionRelay, RelayConfig};
//! use ragchat_model::openai::{OpenAIClient, OpenAIConfig};
//!
//! let model = OpenAIClient::new(OpenAIConfig::new(
//!     std::env::var("OPENAI_API_KEY").unwrap(),
//!     "gpt-4o-mini",
//! ))?;
//! let relay = CompletionRelay::new(Arc::new(model), RelayConfig::default());
//! let reply = relay.complete("cats are mammals", "are cats mammals?").await?;
//! ```
//!
//! ## Features
//!
//! - Lazy, cancellable token streams: dropping one closes the upstream connection
//! - Bounded waits on every outbound call
//! - Mid-stream failures end the stream instead of surfacing after partial output

pub mod error;
pub mod message;
pub mod mock;
pub mod model;
#[cfg(feature = "openai")]
pub mod openai;
pub mod relay;

pub use error::{ModelError, Result};
pub use message::{ChatMessage, Completion, CompletionRequest, Role, Usage};
pub use mock::MockChatModel;
pub use model::{ChatModel, ChunkStream};
#[cfg(feature = "openai")]
pub use openai::OpenAIClient;
pub use relay::{CompletionRelay, DEFAULT_INSTRUCTION, RelayConfig, RelayConfigBuilder, Reply, TokenStream};
