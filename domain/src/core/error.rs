//! Domain error types

use thiserror::Error;

use crate::conversation::SessionId;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("No plan available in session {0}")]
    NoPlan(SessionId),

    #[error("Operation cancelled")]
    Cancelled,
}

impl DomainError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }
}
