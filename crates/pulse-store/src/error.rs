//! Error types for the event store.

/// Errors that can occur in event store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input rejected before touching storage
    #[error("validation error: {0}")]
    Validation(String),

    /// SQLite database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization / deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General internal error
    #[error("{0}")]
    Internal(String),
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, Error>;
