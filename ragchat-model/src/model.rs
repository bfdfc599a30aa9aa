//! The chat-model trait implemented by every completion backend.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::message::{Completion, CompletionRequest};

/// Raw incremental output from a backend: content deltas or a transport error.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A remote chat-completion capability.
///
/// Implementations perform exactly one outbound request per call and never
/// retry.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, used in logs.
    fn name(&self) -> &str;

    /// Request a complete reply.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;

    /// Request incremental output.
    ///
    /// Errors establishing the request are returned directly; failures after
    /// the first chunk surface as `Err` items in the stream. Dropping the
    /// stream must release the underlying connection.
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream>;
}
