//! Error types for the player store.
//!
//! Callers rarely see these: [`PlayerStore::load`](crate::PlayerStore::load)
//! and [`PlayerStore::save`](crate::PlayerStore::save) log them and degrade.
//! They surface only through the `try_` variants.

/// Errors that can occur while reading or writing player files.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A player file did not contain a valid record.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Attach a path to an I/O error.
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
