//! In-memory document store populated once at startup.
//!
//! [`DocumentStore`] is an ordered, immutable list of [`Document`]s. It is
//! built by [`DocumentStore::seed`], which embeds every seed text through an
//! [`EmbeddingProvider`], and is then shared read-only (usually behind an
//! `Arc`) with the [`Retriever`](crate::Retriever). There is no mutation API.

use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::document::Document;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::similarity::is_finite;

/// What seeding does when a single text cannot be embedded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeedPolicy {
    /// Abort seeding on the first failure.
    #[default]
    FailFast,
    /// Log the failure, skip the text and keep going.
    SkipFailed,
}

/// Options controlling [`DocumentStore::seed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedOptions {
    /// Failure policy.
    pub policy: SeedPolicy,
    /// Maximum number of embedding calls in flight at once.
    pub concurrency: usize,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self { policy: SeedPolicy::FailFast, concurrency: 4 }
    }
}

impl SeedOptions {
    /// Set the failure policy.
    pub fn policy(mut self, policy: SeedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the number of concurrent embedding calls.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// An ordered, immutable collection of embedded documents.
///
/// Every document's embedding has exactly [`dimensions()`](DocumentStore::dimensions)
/// entries.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::{DocumentStore, SeedOptions};
///
/// let store = DocumentStore::seed(&provider, ["cats are mammals", "Paris is in France"], SeedOptions::default()).await?;
/// assert_eq!(store.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentStore {
    documents: Vec<Document>,
    dimensions: usize,
}

impl DocumentStore {
    /// Create an empty store for vectors of the given dimensionality.
    pub fn empty(dimensions: usize) -> Self {
        Self { documents: Vec::new(), dimensions }
    }

    /// Build a store from documents that already carry embeddings.
    ///
    /// The dimensionality is taken from the first document.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] for an empty document text or an
    /// empty or non-finite embedding, and [`RagError::DimensionMismatch`] when
    /// embeddings disagree on their length.
    pub fn from_documents(documents: Vec<Document>) -> Result<Self> {
        let dimensions = documents.first().map(|d| d.embedding.len()).unwrap_or_default();
        for (index, document) in documents.iter().enumerate() {
            if document.content.trim().is_empty() {
                return Err(RagError::InvalidArgument(format!("document #{index} has no content")));
            }
            if document.embedding.is_empty() {
                return Err(RagError::InvalidArgument(format!("document #{index} has no embedding")));
            }
            if !is_finite(&document.embedding) {
                return Err(RagError::InvalidArgument(format!(
                    "document #{index} has non-finite embedding values"
                )));
            }
            if document.embedding.len() != dimensions {
                return Err(RagError::DimensionMismatch {
                    expected: dimensions,
                    actual: document.embedding.len(),
                });
            }
        }
        Ok(Self { documents, dimensions })
    }

    /// Embed every text and collect the results in input order.
    ///
    /// Up to `options.concurrency` embedding calls run at once, but the
    /// resulting store always follows the order of `texts`. Texts that are
    /// empty after trimming are rejected without calling the provider.
    ///
    /// The store's dimensionality is the provider's promised
    /// [`dimensions`](EmbeddingProvider::dimensions) when it has one, and
    /// otherwise the length of the first successful embedding in input order.
    /// Every other embedding must match it.
    ///
    /// # Errors
    ///
    /// With [`SeedPolicy::FailFast`], the first failing text aborts seeding
    /// with [`RagError::Seed`] carrying its index; in-flight calls are
    /// cancelled. With [`SeedPolicy::SkipFailed`] failures are logged and the
    /// text is left out. A wrong-length or non-finite embedding counts as a
    /// failure of its text. A [`RagError::ConfigError`] is returned for a zero
    /// concurrency or a provider promising zero dimensions.
    pub async fn seed<I, S>(
        provider: &dyn EmbeddingProvider,
        texts: I,
        options: SeedOptions,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if options.concurrency == 0 {
            return Err(RagError::ConfigError("seed concurrency must be greater than zero".into()));
        }
        let mut dimensions = provider.dimensions();
        if dimensions == Some(0) {
            return Err(RagError::ConfigError(format!(
                "embedding provider '{}' promises zero dimensions",
                provider.name()
            )));
        }

        let texts: Vec<String> = texts.into_iter().map(Into::into).collect();
        let total = texts.len();
        let mut documents = Vec::with_capacity(total);
        let mut skipped = 0usize;

        let mut embeddings = stream::iter(texts.into_iter().enumerate())
            .map(|(index, text)| async move {
                let embedding = embed_seed_text(provider, &text).await;
                (index, text, embedding)
            })
            .buffered(options.concurrency);

        while let Some((index, content, embedding)) = embeddings.next().await {
            let embedding = embedding.and_then(|embedding| match dimensions {
                Some(expected) if embedding.len() != expected => {
                    Err(RagError::DimensionMismatch { expected, actual: embedding.len() })
                }
                _ => Ok(embedding),
            });

            match embedding {
                Ok(embedding) => {
                    dimensions.get_or_insert(embedding.len());
                    documents.push(Document { content, embedding });
                }
                Err(e) if options.policy == SeedPolicy::SkipFailed => {
                    warn!(index, error = %e, "skipping seed text");
                    skipped += 1;
                }
                Err(e) => {
                    error!(index, error = %e, "seeding aborted");
                    return Err(RagError::Seed { index, source: Box::new(e) });
                }
            }
        }

        let dimensions = dimensions.unwrap_or_default();
        info!(
            provider = provider.name(),
            documents = documents.len(),
            dimensions,
            skipped,
            total,
            "seeded knowledge base"
        );

        Ok(Self { documents, dimensions })
    }

    /// Read-only view of every document in seeding order.
    pub fn all(&self) -> &[Document] {
        &self.documents
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The dimensionality shared by every stored embedding.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

async fn embed_seed_text(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    if text.trim().is_empty() {
        return Err(RagError::InvalidArgument("seed text is empty".into()));
    }
    let embedding = provider.embed(text).await?;
    if embedding.is_empty() || !is_finite(&embedding) {
        return Err(RagError::EmbeddingError {
            provider: provider.name().into(),
            message: "embedding is empty or has non-finite values".into(),
        });
    }
    Ok(embedding)
}
