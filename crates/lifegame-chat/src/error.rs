//! Error types for the chat API.
//!
//! [`ChatError`] unifies every failure a handler can hit and converts into
//! an Axum response via its [`IntoResponse`] implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lifegame_runner::RunnerError;
use lifegame_store::StoreError;

/// Errors that can occur in the chat layer.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The request could not be understood.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The game pipeline failed.
    #[error("runner error: {0}")]
    Runner(#[from] RunnerError),

    /// Player storage failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Runner(RunnerError::QueueClosed) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Runner(_) | Self::Store(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
