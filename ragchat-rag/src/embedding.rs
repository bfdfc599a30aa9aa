//! Embedding provider trait for turning text into vectors.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap a remote embedding capability behind a unified async
/// interface. Callers are expected to reject empty or whitespace-only text
/// before invoking [`embed`](EmbeddingProvider::embed); providers do not
/// validate their input. Providers never retry and never cache: each call is
/// exactly one outbound request.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert!(!embedding.is_empty());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The vector length this provider promises, when it is fixed by
    /// configuration.
    ///
    /// `None` means the length is only known once the first embedding comes
    /// back; seeding then takes it from that embedding.
    fn dimensions(&self) -> Option<usize> {
        None
    }

    /// A short name used in logs and error messages.
    fn name(&self) -> &str {
        "embedding"
    }
}
