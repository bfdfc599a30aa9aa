//! Scripted chat model for tests and offline runs.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;

use crate::error::{ModelError, Result};
use crate::message::{Completion, CompletionRequest, Usage};
use crate::model::{ChatModel, ChunkStream};

/// A [`ChatModel`] that replays a fixed script and records every request.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat_model::MockChatModel;
///
/// let model = MockChatModel::new("The answer is 4.")
///     .with_chunks(["The", " answer", " is", " 4."]);
/// ```
#[derive(Debug, Default)]
pub struct MockChatModel {
    reply: String,
    chunks: Vec<String>,
    usage: Usage,
    chunk_delay: Option<Duration>,
    fail_after: Option<usize>,
    failure: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockChatModel {
    /// A model whose single-shot reply is `reply` and whose stream is `reply`
    /// as one chunk.
    pub fn new(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self { chunks: vec![reply.clone()], reply, ..Default::default() }
    }

    /// A model that fails every request with a completion error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { failure: Some(message.into()), ..Default::default() }
    }

    /// Replace the streamed chunks.
    pub fn with_chunks<I, S>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chunks = chunks.into_iter().map(Into::into).collect();
        self
    }

    /// Report this usage for single-shot completions.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Sleep before emitting each chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Emit a transport error after `count` chunks.
    pub fn fail_stream_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn record(&self, request: CompletionRequest) -> Result<()> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        match &self.failure {
            Some(message) => Err(mock_error(message.clone())),
            None => Ok(()),
        }
    }
}

fn mock_error(message: String) -> ModelError {
    ModelError::Completion { provider: "mock".into(), message }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        self.record(request)?;
        Ok(Completion { content: self.reply.clone(), usage: self.usage })
    }

    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        self.record(request)?;

        let mut items: Vec<Result<String>> = self.chunks.iter().cloned().map(Ok).collect();
        if let Some(count) = self.fail_after {
            items.truncate(count);
            items.push(Err(mock_error("stream interrupted".into())));
        }

        let delay = self.chunk_delay;
        let chunks = stream::iter(items).then(move |item| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            item
        });
        Ok(Box::pin(chunks))
    }
}
