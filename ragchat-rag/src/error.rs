//! Error types for the `ragchat-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while seeding the knowledge base or retrieving context.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding service was unavailable or returned a malformed response.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Two vectors that must share a dimensionality do not.
    ///
    /// This points at a configuration bug (for example two embedding models
    /// mixed in one run), not at a transient failure.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimensionality that was required.
        expected: usize,
        /// The dimensionality that was found.
        actual: usize,
    },

    /// An outbound call did not finish within its bounded wait.
    #[error("Timeout: {operation} did not complete within {after:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The wait that elapsed.
        after: Duration,
    },

    /// Seeding failed on the text at `index`.
    #[error("Seeding failed at text #{index}: {source}")]
    Seed {
        /// Position of the failing text in the seed list.
        index: usize,
        /// The underlying failure.
        #[source]
        source: Box<RagError>,
    },

    /// The knowledge base did not become ready within the allowed wait.
    #[error("Knowledge base is not ready (waited {waited:?})")]
    NotReady {
        /// How long the caller waited.
        waited: Duration,
    },

    /// Seeding was abandoned, so the knowledge base will never become ready.
    #[error("Knowledge base seeding failed")]
    SeedingFailed,

    /// A caller passed an argument outside the operation's domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    /// Returns `true` for failures caused by a bounded wait elapsing.
    pub fn is_timeout(&self) -> bool {
        match self {
            RagError::Timeout { .. } => true,
            RagError::Seed { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
