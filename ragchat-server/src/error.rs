//! HTTP error mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ragchat_model::ModelError;
use ragchat_rag::RagError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errors returned by the chat handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Retrieval(#[from] RagError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ApiError {
    /// The status code this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Retrieval(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Retrieval(RagError::NotReady { .. } | RagError::SeedingFailed) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Retrieval(RagError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
            ApiError::Retrieval(RagError::EmbeddingError { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Retrieval(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Model(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Model(ModelError::Completion { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "invalid request",
            StatusCode::SERVICE_UNAVAILABLE => "knowledge base is not ready",
            StatusCode::GATEWAY_TIMEOUT => "upstream service timed out",
            StatusCode::BAD_GATEWAY => "upstream service failed",
            _ => "internal error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::BadRequest(message) => {
                warn!(error = %message, "rejected chat request");
                json!({ "error": message })
            }
            other => {
                error!(status = status.as_u16(), error = %other, "chat request failed");
                json!({ "error": self.public_message() })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn statuses_follow_the_failure_kind() {
        let cases = [
            (ApiError::BadRequest("empty".into()), StatusCode::BAD_REQUEST),
            (
                RagError::NotReady { waited: Duration::from_secs(1) }.into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (RagError::SeedingFailed.into(), StatusCode::SERVICE_UNAVAILABLE),
            (
                RagError::EmbeddingError { provider: "p".into(), message: "down".into() }.into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                RagError::Timeout { operation: "embed".into(), after: Duration::from_secs(1) }
                    .into(),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                RagError::DimensionMismatch { expected: 3, actual: 2 }.into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ModelError::Completion { provider: "p".into(), message: "down".into() }.into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ModelError::Timeout { operation: "complete".into(), after: Duration::from_secs(1) }
                    .into(),
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{error}");
        }
    }
}
