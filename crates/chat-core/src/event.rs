//! Server event taxonomy

use serde::{Deserialize, Serialize};

/// Payload marking the end of the current assistant turn
pub const SENTINEL: &str = "######";

/// Kind of a server-sent event, keyed by its `event:` field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Untyped default event
    Message,
    /// Free-text streaming delta (`chatgpt_response`)
    ChatResponse,
    /// JSON-serialized tabular result (`sql_table_as_json`)
    SqlTable,
    /// Any other named event
    Other(String),
}

impl EventKind {
    pub const CHAT_RESPONSE: &'static str = "chatgpt_response";
    pub const SQL_TABLE: &'static str = "sql_table_as_json";

    /// Classify an `event:` field value; a missing or empty name is the default event
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            None | Some("") | Some("message") => EventKind::Message,
            Some(Self::CHAT_RESPONSE) => EventKind::ChatResponse,
            Some(Self::SQL_TABLE) => EventKind::SqlTable,
            Some(other) => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Message => "message",
            EventKind::ChatResponse => Self::CHAT_RESPONSE,
            EventKind::SqlTable => Self::SQL_TABLE,
            EventKind::Other(name) => name,
        }
    }

    /// Whether events of this kind carry turn content
    pub fn is_content(&self) -> bool {
        matches!(self, EventKind::ChatResponse | EventKind::SqlTable)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEvent {
    pub kind: EventKind,
    /// Event payload, multiple `data:` lines joined with `\n`
    pub data: String,
    /// Last event id seen on the stream, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ServerEvent {
    pub fn new(kind: EventKind, data: impl Into<String>) -> Self {
        Self {
            kind,
            data: data.into(),
            id: None,
        }
    }

    pub fn chat(data: impl Into<String>) -> Self {
        Self::new(EventKind::ChatResponse, data)
    }

    pub fn is_sentinel(&self) -> bool {
        self.data == SENTINEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_from_name() {
        assert_eq!(EventKind::from_name(None), EventKind::Message);
        assert_eq!(EventKind::from_name(Some("")), EventKind::Message);
        assert_eq!(
            EventKind::from_name(Some("chatgpt_response")),
            EventKind::ChatResponse
        );
        assert_eq!(
            EventKind::from_name(Some("sql_table_as_json")),
            EventKind::SqlTable
        );
        assert_eq!(
            EventKind::from_name(Some("announce")),
            EventKind::Other("announce".into())
        );
    }

    #[test]
    fn test_content_kinds() {
        assert!(EventKind::ChatResponse.is_content());
        assert!(EventKind::SqlTable.is_content());
        assert!(!EventKind::Message.is_content());
        assert!(!EventKind::Other("info".into()).is_content());
    }

    #[test]
    fn test_sentinel() {
        assert!(ServerEvent::chat("######").is_sentinel());
        assert!(!ServerEvent::chat("###### ").is_sentinel());
    }
}
