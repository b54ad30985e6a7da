//! chat-core - Core types for a streamed chat transcript
//!
//! This crate holds the state a chat tab owns: the transcript of turns, the
//! renderers that reveal streamed text into the active assistant turn, and
//! the small key-value session state shared between tabs.
//!
//! Nothing here performs I/O. The network side lives in `chat-client`, which
//! feeds [`ServerEvent`]s into a [`TypingRenderer`].

pub mod broadcast;
pub mod error;
pub mod event;
pub mod models;
pub mod storage;
pub mod transcript;
pub mod typing;

pub use broadcast::{BroadcastHub, BroadcastMessage, TabChannel};
pub use error::{TranscriptError, TranscriptResult};
pub use event::{EventKind, ServerEvent, SENTINEL};
pub use models::*;
pub use storage::{MemoryStore, SessionStore, TabRegistry};
pub use transcript::Transcript;
pub use typing::{FragmentOutcome, RevealStrategy, TypingRenderer};
