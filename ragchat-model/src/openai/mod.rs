//! OpenAI chat-completion provider.
//!
//! Works with the public OpenAI API and any server exposing the same
//! `/chat/completions` contract, including server-sent-event streaming.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragchat_model::openai::{OpenAIClient, OpenAIConfig};
//!
//! let model = OpenAIClient::new(OpenAIConfig::new(
//!     std::env::var("OPENAI_API_KEY").unwrap(),
//!     "gpt-4o-mini",
//! ))?;
//! ```

mod client;
mod config;

pub use client::OpenAIClient;
pub use config::{DEFAULT_CHAT_MODEL, OPENAI_API_BASE, OpenAIConfig};
