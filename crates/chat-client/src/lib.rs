//! Chat Client Library
//!
//! Consumes the chat server's Server-Sent-Events stream and drives a
//! transcript from it.
//!
//! # Example
//!
//! ```rust,no_run
//! use chat_client::{ChatClient, SessionConfig, StreamSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ChatClient::new("http://localhost:8080")?;
//!     let mut session = StreamSession::new(client, SessionConfig::default());
//!
//!     // Opens the stream, adds the turns and posts the question
//!     session.submit("What is the weather like?").await?;
//!
//!     // Process events and typing ticks until the answer is complete
//!     session.run_until_idle().await;
//!
//!     for turn in session.transcript().turns() {
//!         println!("{}: {}", turn.role().as_str(), turn.bubble().html());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides an in-process chat server:
//!
//! ```rust,ignore
//! use chat_client::testing::{FakeChatServer, TestServer};
//!
//! let fake = FakeChatServer::new();
//! let server = TestServer::start(fake.router()).await?;
//! fake.push_answer(["Hello", " there"]);
//! ```

mod client;
mod config;
mod error;
pub mod session;
pub mod streaming;
pub mod testing;
mod types;

pub use client::ChatClient;
pub use config::SessionConfig;
pub use error::{ChatClientError, Result};
pub use session::StreamSession;
pub use types::*;

// Re-export streaming types for convenience
pub use streaming::{
    ConnectionHandle, FnHandler, ReadyState, StreamConsumer, StreamError, StreamHandler,
};

// Re-export core types for convenience
pub use chat_core::{ChatTurn, EventKind, Rating, RevealStrategy, ServerEvent, Transcript, TurnId};
