//! Error types shared across the event subsystem.

use thiserror::Error;

/// Failure reported by an event store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation.
    #[error("event store unavailable: {0}")]
    Unavailable(String),

    /// An event could not be encoded for persistence.
    #[error("event serialization failed: {0}")]
    Serialization(String),
}

/// Failure reported by an event handler.
///
/// Carries only a message: the dispatcher records it in a dead-letter
/// entry and moves on, so the concrete cause stays with the handler.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error from a displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
