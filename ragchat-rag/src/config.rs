//! Configuration for retrieval.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the [`Retriever`](crate::Retriever).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Number of documents joined into the context by default.
    pub top_k: usize,
    /// Minimum similarity score; candidates below it are dropped.
    pub min_score: Option<f32>,
    /// How long a request waits for the knowledge base to finish seeding.
    pub ready_timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 2, min_score: None, ready_timeout: Duration::from_secs(30) }
    }
}

impl RetrievalConfig {
    /// Create a new builder for constructing a [`RetrievalConfig`].
    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrievalConfigBuilder {
    config: RetrievalConfig,
}

impl RetrievalConfigBuilder {
    /// Set the default number of documents to retrieve.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity score for retrieved documents.
    pub fn min_score(mut self, score: f32) -> Self {
        self.config.min_score = Some(score);
        self
    }

    /// Set how long requests wait for seeding to complete.
    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.config.ready_timeout = timeout;
        self
    }

    /// Build the [`RetrievalConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `top_k == 0`
    /// - `min_score` lies outside `[-1, 1]`
    pub fn build(self) -> Result<RetrievalConfig> {
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if let Some(score) = self.config.min_score {
            if !(-1.0..=1.0).contains(&score) {
                return Err(RagError::ConfigError(format!(
                    "min_score ({score}) must lie within [-1, 1]"
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RetrievalConfig::builder().build().unwrap();
        assert_eq!(config, RetrievalConfig::default());
        assert_eq!(config.top_k, 2);
    }

    #[test]
    fn zero_top_k_is_rejected() {
        assert!(matches!(
            RetrievalConfig::builder().top_k(0).build(),
            Err(RagError::ConfigError(_))
        ));
    }

    #[test]
    fn out_of_range_min_score_is_rejected() {
        assert!(RetrievalConfig::builder().min_score(1.5).build().is_err());
        assert!(RetrievalConfig::builder().min_score(-0.5).build().is_ok());
    }
}
