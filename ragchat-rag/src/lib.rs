//! # ragchat-rag
//!
//! Retrieval for the ragchat knowledge base.
//!
//! ## Overview
//!
//! - [`EmbeddingProvider`] - text → vector, one outbound call per text
//! - [`cosine_similarity`] - symmetric similarity with explicit dimension checks
//! - [`DocumentStore`] - ordered, immutable in-memory store seeded once at startup
//! - [`KnowledgeBase`] - readiness gate between seeding and request handling
//! - [`Retriever`] - embeds a query, ranks the store and joins the top-K texts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragchat_rag::{DocumentStore, KnowledgeBase, RetrievalConfig, Retriever, SeedOptions};
//! use ragchat_rag::openai::OpenAIEmbeddingProvider;
//!
//! let embedder = Arc::new(OpenAIEmbeddingProvider::from_env()?);
//! let store = DocumentStore::seed(embedder.as_ref(), seed_texts, SeedOptions::default()).await?;
//! let retriever = Retriever::new(embedder, KnowledgeBase::ready(store), RetrievalConfig::default());
//!
//! let context = retriever.retrieve("are cats mammals?", 2).await?;
//! ```

pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod knowledge;
#[cfg(feature = "openai")]
pub mod openai;
pub mod retriever;
pub mod similarity;
pub mod store;

pub use config::{RetrievalConfig, RetrievalConfigBuilder};
pub use document::{Document, ScoredCandidate};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use knowledge::{KnowledgeBase, KnowledgePublisher, knowledge_base};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
pub use retriever::{Retriever, join_context, rank_documents};
pub use similarity::cosine_similarity;
pub use store::{DocumentStore, SeedOptions, SeedPolicy};
