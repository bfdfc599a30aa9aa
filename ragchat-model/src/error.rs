//! Error types for ragchat-model.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to a chat-completion service.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The completion service was unavailable or returned a malformed response.
    #[error("Completion error ({provider}): {message}")]
    Completion {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An outbound call did not finish within its bounded wait.
    #[error("Timeout: {operation} did not complete within {after:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The wait that elapsed.
        after: Duration,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ModelError {
    /// Returns `true` for failures caused by a bounded wait elapsing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ModelError::Timeout { .. })
    }
}

/// Result type alias for ModelError
pub type Result<T> = std::result::Result<T, ModelError>;
