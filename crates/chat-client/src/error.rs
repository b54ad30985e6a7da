//! Error types for chat client operations

use thiserror::Error;

/// Result type alias for chat client operations
pub type Result<T> = std::result::Result<T, ChatClientError>;

/// Errors that can occur during chat client operations
#[derive(Error, Debug)]
pub enum ChatClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Server returned an error response
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Nothing to send
    #[error("Message is empty")]
    EmptyMessage,

    /// Transcript rejected the operation
    #[error(transparent)]
    Transcript(#[from] chat_core::TranscriptError),

    /// Streaming error
    #[error("Stream error: {0}")]
    StreamError(String),
}

impl ChatClientError {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    /// HTTP status if the server answered with an error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerError { status, .. } => Some(*status),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
