//! Query-time retrieval: embed → score → rank → join.
//!
//! The [`Retriever`] embeds a query through an [`EmbeddingProvider`], scores
//! it against every document in the seeded [`DocumentStore`] and joins the
//! best `k` texts into a context string for the completion prompt.
//!
//! # Example
//!
//! ```rust,ignore
//! use ragchat_rag::{KnowledgeBase, RetrievalConfig, Retriever};
//!
//! let retriever = Retriever::new(Arc::new(embedder), KnowledgeBase::ready(store), RetrievalConfig::default());
//! let context = retriever.retrieve("are cats mammals?", 2).await?;
//! ```

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::RetrievalConfig;
use crate::document::{Document, ScoredCandidate};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::knowledge::KnowledgeBase;
use crate::similarity::{cosine_similarity, is_finite};

/// Separator placed between retrieved documents in the context string.
pub const CONTEXT_SEPARATOR: &str = "\n";

/// Ranks stored documents against a query and assembles the context.
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    knowledge: KnowledgeBase,
    config: RetrievalConfig,
}

impl Retriever {
    /// Create a retriever over the given knowledge base.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        knowledge: KnowledgeBase,
        config: RetrievalConfig,
    ) -> Self {
        Self { embedding_provider, knowledge, config }
    }

    /// Return a reference to the retrieval configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Return the knowledge base handle.
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Retrieve the `k` most similar documents and join them with newlines.
    ///
    /// An empty store yields an empty string. A `k` larger than the store
    /// yields every document in rank order.
    ///
    /// # Errors
    ///
    /// See [`rank`](Retriever::rank).
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<String> {
        let candidates = self.rank(query, k).await?;
        Ok(join_context(&candidates))
    }

    /// [`retrieve`](Retriever::retrieve) with the configured `top_k`.
    pub async fn context(&self, query: &str) -> Result<String> {
        self.retrieve(query, self.config.top_k).await
    }

    /// Score every stored document against `query` and return the best `k`.
    ///
    /// Candidates are ordered by descending score; equal scores keep store
    /// order. When a `min_score` is configured, lower candidates are dropped.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidArgument`] for `k == 0` or a blank query.
    /// - [`RagError::NotReady`] / [`RagError::SeedingFailed`] from the readiness gate.
    /// - [`RagError::EmbeddingError`] / [`RagError::Timeout`] from the provider,
    ///   including a query embedding with non-finite values.
    /// - [`RagError::DimensionMismatch`] when the query vector does not match the store.
    pub async fn rank(&self, query: &str, k: usize) -> Result<Vec<ScoredCandidate>> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be at least 1".into()));
        }
        if query.trim().is_empty() {
            return Err(RagError::InvalidArgument("query must not be empty".into()));
        }

        let store = self.knowledge.wait(self.config.ready_timeout).await?;
        if store.is_empty() {
            warn!(warning = "EmptyStoreWarning", "knowledge base is empty, answering without context");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(provider = self.embedding_provider.name(), error = %e, "embedding failed during query");
            e
        })?;

        if !is_finite(&query_embedding) {
            error!(provider = self.embedding_provider.name(), "query embedding has non-finite values");
            return Err(RagError::EmbeddingError {
                provider: self.embedding_provider.name().into(),
                message: "query embedding has non-finite values".into(),
            });
        }

        if query_embedding.len() != store.dimensions() {
            error!(
                expected = store.dimensions(),
                actual = query_embedding.len(),
                "query embedding does not match the knowledge base dimensionality"
            );
            return Err(RagError::DimensionMismatch {
                expected: store.dimensions(),
                actual: query_embedding.len(),
            });
        }

        let mut candidates = rank_documents(store.all(), &query_embedding, k)?;
        if let Some(min_score) = self.config.min_score {
            candidates.retain(|c| c.score >= min_score);
        }

        info!(candidate_count = candidates.len(), k, "query completed");
        Ok(candidates)
    }
}

/// Score `documents` against `query` and keep the best `k`.
///
/// The sort is stable, so documents with equal scores stay in store order.
///
/// # Errors
///
/// Returns [`RagError::DimensionMismatch`] if any document's embedding length
/// differs from the query's, and [`RagError::InvalidArgument`] if any vector
/// has non-finite values.
pub fn rank_documents(
    documents: &[Document],
    query: &[f32],
    k: usize,
) -> Result<Vec<ScoredCandidate>> {
    let mut candidates = documents
        .iter()
        .enumerate()
        .map(|(position, document)| {
            let score = cosine_similarity(query, &document.embedding)?;
            Ok(ScoredCandidate { content: document.content.clone(), score, position })
        })
        .collect::<Result<Vec<_>>>()?;

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(k);

    debug!(scored = documents.len(), kept = candidates.len(), "ranked documents");
    Ok(candidates)
}

/// Join candidate texts in rank order.
pub fn join_context(candidates: &[ScoredCandidate]) -> String {
    candidates.iter().map(|c| c.content.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str, embedding: &[f32]) -> Document {
        Document { content: content.into(), embedding: embedding.to_vec() }
    }

    #[test]
    fn ties_keep_store_order() {
        let documents = vec![doc("a", &[1.0, 0.0]), doc("b", &[2.0, 0.0]), doc("c", &[0.0, 1.0])];
        let ranked = rank_documents(&documents, &[1.0, 0.0], 3).unwrap();
        let order: Vec<_> = ranked.iter().map(|c| c.position).collect();
        assert_eq!(order, [0, 1, 2]);
    }

    #[test]
    fn truncates_to_k() {
        let documents = vec![doc("a", &[1.0, 0.0]), doc("b", &[0.0, 1.0])];
        let ranked = rank_documents(&documents, &[0.0, 1.0], 1).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].content, "b");
    }

    #[test]
    fn ragged_documents_are_rejected() {
        let documents = vec![doc("a", &[1.0, 0.0, 0.0])];
        assert!(matches!(
            rank_documents(&documents, &[1.0, 0.0], 1),
            Err(RagError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn join_uses_newlines() {
        let candidates = vec![
            ScoredCandidate { content: "one".into(), score: 0.9, position: 1 },
            ScoredCandidate { content: "two".into(), score: 0.5, position: 0 },
        ];
        assert_eq!(join_context(&candidates), "one\ntwo");
        assert_eq!(join_context(&[]), "");
    }

    #[test]
    fn non_finite_documents_are_rejected() {
        let documents = [doc("good", &[1.0, 0.0]), doc("broken", &[f32::NAN, 0.0])];
        let err = rank_documents(&documents, &[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, RagError::InvalidArgument(_)));
    }
}
