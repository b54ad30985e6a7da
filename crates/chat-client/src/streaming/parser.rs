//! SSE (Server-Sent Events) parser
//!
//! Parses the SSE wire format into [`ServerEvent`]s.

use bytes::Bytes;
use chat_core::{EventKind, ServerEvent};
use tracing::trace;

use super::types::{StreamError, StreamResult};

/// SSE parser state
#[derive(Debug, Default)]
pub struct SseParser {
    /// Buffer for incomplete lines
    buffer: Vec<u8>,
    /// Current event data being accumulated
    data_buffer: String,
    /// Whether any data line was seen for the current event
    has_data: bool,
    /// Current event type (if any)
    event_type: Option<String>,
    /// Last event ID (persists across events)
    last_id: Option<String>,
}

impl SseParser {
    /// Create a new SSE parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Last event id seen on the stream
    pub fn last_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    /// Feed bytes into the parser and extract any complete events
    pub fn feed(&mut self, bytes: Bytes) -> Vec<StreamResult<ServerEvent>> {
        let mut events = Vec::new();

        self.buffer.extend_from_slice(&bytes);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<_>>();
            let line = &line[..line.len() - 1];

            // Handle \r\n line endings
            let line = if line.last() == Some(&b'\r') {
                &line[..line.len() - 1]
            } else {
                line
            };

            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }

        events
    }

    /// Process a single line of SSE data
    fn process_line(&mut self, line: &[u8]) -> Option<StreamResult<ServerEvent>> {
        // Empty line signals end of event
        if line.is_empty() {
            return self.dispatch_event().map(Ok);
        }

        // Comment line (keepalive)
        if line.starts_with(b":") {
            trace!("SSE keepalive/comment");
            return None;
        }

        let line_str = match std::str::from_utf8(line) {
            Ok(s) => s,
            Err(_) => {
                return Some(Err(StreamError::Parse("Invalid UTF-8 in SSE line".into())));
            }
        };

        // Split on first colon
        let (field, value) = if let Some(colon_pos) = line_str.find(':') {
            let (f, v) = line_str.split_at(colon_pos);
            let v = &v[1..];
            let v = v.strip_prefix(' ').unwrap_or(v);
            (f, v)
        } else {
            (line_str, "")
        };

        match field {
            "data" => {
                if self.has_data {
                    self.data_buffer.push('\n');
                }
                self.data_buffer.push_str(value);
                self.has_data = true;
            }
            "event" => {
                self.event_type = Some(value.to_string());
            }
            "id" => {
                self.last_id = Some(value.to_string());
            }
            "retry" => {
                // No automatic reconnect, so the hint is unused
                trace!("SSE retry: {}", value);
            }
            _ => {
                trace!("SSE unknown field: {}", field);
            }
        }

        None
    }

    /// Dispatch the accumulated event
    fn dispatch_event(&mut self) -> Option<ServerEvent> {
        let event_type = self.event_type.take();
        if !self.has_data {
            return None;
        }
        self.has_data = false;

        Some(ServerEvent {
            kind: EventKind::from_name(event_type.as_deref()),
            data: std::mem::take(&mut self.data_buffer),
            id: self.last_id.clone(),
        })
    }
}
