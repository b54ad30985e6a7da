//! Callbacks invoked by the stream reader

use chat_core::ServerEvent;
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::connection::ConnectionHandle;
use super::types::StreamError;

/// Receives stream lifecycle notifications
///
/// Calls happen one at a time from the connection's reader task, in the
/// order the server sent the events.
pub trait StreamHandler: Send + 'static {
    /// The server accepted the stream
    fn on_open(&mut self, _conn: &ConnectionHandle) {}

    /// A content event (`chatgpt_response` or `sql_table_as_json`) arrived
    fn on_event(&mut self, event: ServerEvent);

    /// The transport failed; the default closes the connection
    fn on_error(&mut self, conn: &ConnectionHandle, err: &StreamError) {
        error!("SSE error: {}", err);
        conn.close();
    }
}

/// Handler built from an event closure and an error closure
pub struct FnHandler<E, R> {
    on_event: E,
    on_error: R,
}

impl<E, R> FnHandler<E, R>
where
    E: FnMut(ServerEvent) + Send + 'static,
    R: FnMut(&ConnectionHandle, &StreamError) + Send + 'static,
{
    pub fn new(on_event: E, on_error: R) -> Self {
        Self { on_event, on_error }
    }
}

impl<E, R> StreamHandler for FnHandler<E, R>
where
    E: FnMut(ServerEvent) + Send + 'static,
    R: FnMut(&ConnectionHandle, &StreamError) + Send + 'static,
{
    fn on_event(&mut self, event: ServerEvent) {
        (self.on_event)(event)
    }

    fn on_error(&mut self, conn: &ConnectionHandle, err: &StreamError) {
        (self.on_error)(conn, err)
    }
}

/// What a [`ChannelHandler`] forwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    Opened,
    Event(ServerEvent),
    /// The connection failed and has been closed
    Failed(String),
}

/// Forwards everything into a channel for a single consumer task
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<StreamMessage>,
}

impl ChannelHandler {
    pub fn new(tx: mpsc::UnboundedSender<StreamMessage>) -> Self {
        Self { tx }
    }

    fn forward(&self, msg: StreamMessage) {
        if self.tx.send(msg).is_err() {
            debug!("Stream consumer gone, dropping message");
        }
    }
}

impl StreamHandler for ChannelHandler {
    fn on_open(&mut self, _conn: &ConnectionHandle) {
        self.forward(StreamMessage::Opened);
    }

    fn on_event(&mut self, event: ServerEvent) {
        self.forward(StreamMessage::Event(event));
    }

    fn on_error(&mut self, conn: &ConnectionHandle, err: &StreamError) {
        error!("SSE error: {}", err);
        conn.close();
        self.forward(StreamMessage::Failed(err.to_string()));
    }
}
