//! Request and response types for the chat server API

use chat_core::{Rating, TurnId};
use serde::{Deserialize, Serialize};

/// Body of a chat submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's question
    #[serde(rename = "userRequest")]
    pub user_request: String,
    /// Server-side conversation id, once the server has assigned one
    #[serde(rename = "chatId", skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

impl ChatRequest {
    pub fn new(user_request: impl Into<String>) -> Self {
        Self {
            user_request: user_request.into(),
            chat_id: None,
        }
    }

    pub fn with_chat_id(mut self, chat_id: Option<String>) -> Self {
        self.chat_id = chat_id;
        self
    }
}

/// Acknowledgement of a chat submission
///
/// The answer itself arrives on the event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAck {
    #[serde(default)]
    pub status: String,
    #[serde(rename = "chatId", default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

impl ChatAck {
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

/// Body of a rating submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRequest {
    /// Server-side conversation id
    #[serde(rename = "chatID", default)]
    pub chat_id: String,
    /// Score from 1 to 5
    #[serde(rename = "chatRating")]
    pub chat_rating: Rating,
    /// Position of the rated answer among assistant turns, counting from 1
    #[serde(rename = "chatIdx")]
    pub chat_idx: usize,
    /// Stable id of the rated turn, when rated from a live transcript
    #[serde(rename = "turnId", default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<TurnId>,
}

/// Error body returned by the server
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(alias = "error")]
    pub message: String,
}
