//! Error types for transcript operations

use thiserror::Error;

use crate::models::TurnId;

/// Result type for transcript operations
pub type TranscriptResult<T> = Result<T, TranscriptError>;

/// Errors that can occur while mutating a transcript
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    /// No turn with this id
    #[error("Turn not found: {0}")]
    TurnNotFound(TurnId),

    /// No assistant turn at this position
    #[error("No assistant turn at position {0}")]
    OrdinalOutOfRange(usize),

    /// Operation only applies to assistant turns
    #[error("Turn {0} is not an assistant turn")]
    NotAssistant(TurnId),

    /// Turn is still receiving content
    #[error("Turn {0} is not complete yet")]
    NotSealed(TurnId),

    /// Rating outside 1..=5
    #[error("Invalid rating {0}: expected 1 to 5")]
    InvalidRating(u8),
}
