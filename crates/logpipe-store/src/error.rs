//! Error types for the log store.

/// Errors that can occur while ingesting or querying log events.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The request body is absent, not JSON, or not a non-empty object.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A database operation failed.
    #[error("store database error: {0}")]
    Database(#[from] rusqlite::Error),
}
