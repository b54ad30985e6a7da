//! Command implementations for chat-cli

pub mod ask;
pub mod chat;
pub mod listen;
pub mod rate;

pub use ask::ask;
pub use chat::chat;
pub use listen::listen;
pub use rate::rate;
