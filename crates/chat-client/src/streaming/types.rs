//! Types for the event stream

use thiserror::Error;

/// Lifecycle of a stream connection, numbered like the browser's `readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    /// Request sent, no response yet
    Connecting = 0,
    /// Response received, events flowing
    Open = 1,
    /// Closed by the client or after an error
    Closed = 2,
}

impl ReadyState {
    pub fn describe(&self) -> &'static str {
        match self {
            ReadyState::Connecting => "The connection has not yet been established.",
            ReadyState::Open => "The connection is established and communication is possible.",
            ReadyState::Closed => "The connection is closed.",
        }
    }
}

/// Errors that can occur during streaming
#[derive(Debug, Error)]
pub enum StreamError {
    /// HTTP/connection error
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// Failed to parse SSE data
    #[error("Parse error: {0}")]
    Parse(String),

    /// Server returned an error
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Stream was closed by the server
    #[error("Stream closed")]
    Closed,
}

/// Result type for streaming operations
pub type StreamResult<T> = std::result::Result<T, StreamError>;
