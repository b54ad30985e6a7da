//! Event stream support
//!
//! One long-lived Server-Sent-Events connection per tab. The
//! [`StreamConsumer`] opens it at most once, a background reader task parses
//! the wire format and hands named events to a [`StreamHandler`].
//!
//! # Example
//!
//! ```no_run
//! use chat_client::{ChatClient, FnHandler, StreamConsumer};
//! use chat_core::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ChatClient::new("http://localhost:8080")?;
//! let mut consumer = StreamConsumer::new(client.stream_http_client().clone(), Arc::new(MemoryStore::new()));
//!
//! let url = client.stream_url("k3x9q0w1e2r3t4y5")?;
//! let handle = consumer.open(
//!     url,
//!     FnHandler::new(
//!         |event| println!("{}: {}", event.kind, event.data),
//!         |conn, err| {
//!             eprintln!("Stream error: {}", err);
//!             conn.close();
//!         },
//!     ),
//! );
//!
//! // A second open while the first is live returns the same handle
//! # let url = client.stream_url("k3x9q0w1e2r3t4y5")?;
//! # let h2 = consumer.open(url, FnHandler::new(|_| {}, |c, _| c.close()));
//! # assert!(handle.ptr_eq(&h2));
//! consumer.unload();
//! # Ok(())
//! # }
//! ```

mod connection;
mod consumer;
mod handler;
mod parser;
mod types;

pub use connection::ConnectionHandle;
pub use consumer::StreamConsumer;
pub use handler::{ChannelHandler, FnHandler, StreamHandler, StreamMessage};
pub use parser::SseParser;
pub use types::{ReadyState, StreamError, StreamResult};
