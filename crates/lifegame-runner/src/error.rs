//! Error types for the runner.
//!
//! [`RunnerError`] covers failures inside the pipeline (backend calls,
//! template rendering, a closed queue). [`TransferError`] is the outcome
//! vocabulary of the transfer subsystem; its `Display` text is what the
//! player sees.

use lifegame_types::PlayerId;

/// Errors that can occur during runner operation.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A completion backend returned an error or was unreachable.
    #[error("{0}")]
    LlmBackend(String),

    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The action queue worker is gone.
    #[error("action queue is closed")]
    QueueClosed,

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Why a transfer could not be created or resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    /// The receiver has never played.
    #[error("❌ Player {0} not found")]
    ReceiverNotFound(PlayerId),

    /// The validation step refused the transfer.
    #[error("❌ {reason}")]
    Rejected {
        /// Explanation given by the validator.
        reason: String,
    },

    /// No pending transfer with that id (already resolved, or never existed).
    #[error("❌ Transfer not found")]
    NotFound,

    /// Someone other than the receiver tried to resolve the transfer.
    #[error("❌ Transfer not found")]
    NotReceiver,
}
