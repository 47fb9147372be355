//! Error types for pulse-core
//!
//! The three failure classes of the bus: bad input, a failed durable write,
//! and a single connection's failed push. None of them is process-fatal.

use thiserror::Error;
use uuid::Uuid;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input from a publisher or a control frame
    #[error("validation error: {0}")]
    Validation(String),

    /// The durable append or a log read failed; the event is not recorded
    #[error("persistence error: {0}")]
    Persistence(#[source] pulse_store::Error),

    /// A single connection's push failed; isolated, never fails a publish
    #[error("delivery error: connection {connection_id}: {reason}")]
    Delivery {
        /// The connection whose push failed
        connection_id: Uuid,
        /// What went wrong
        reason: String,
    },
}

impl From<pulse_store::Error> for Error {
    fn from(err: pulse_store::Error) -> Self {
        // Store-side input rejection stays a validation error; everything
        // else means the write/read itself failed.
        match err {
            pulse_store::Error::Validation(msg) => Error::Validation(msg),
            other => Error::Persistence(other),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
