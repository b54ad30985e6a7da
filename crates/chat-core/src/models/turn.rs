//! Chat turns and their visible bubble

use chat_render::{escape_html, Rendered};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rating::RatingAnnotation;

/// Stable identifier minted when a turn is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// The visible chat bubble of a turn
///
/// Content is HTML. New content is always placed before the loading
/// indicator, which stays last while present. The typing target is an
/// inline element that the typewriter reveals into; merging it moves its
/// contents into the bubble body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bubble {
    content: String,
    typing_target: Option<String>,
    loading: bool,
    error_style: bool,
}

impl Bubble {
    pub(crate) fn with_content(content: String) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }

    pub(crate) fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub(crate) fn error_styled() -> Self {
        Self {
            error_style: true,
            ..Self::default()
        }
    }

    /// Committed body content, excluding the typing target
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn typing_target(&self) -> Option<&str> {
        self.typing_target.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_error_styled(&self) -> bool {
        self.error_style
    }

    /// Everything currently visible, typing target contents included
    pub fn visible(&self) -> String {
        match &self.typing_target {
            Some(target) => format!("{}{}", self.content, target),
            None => self.content.clone(),
        }
    }

    /// Full markup of the bubble body
    pub fn html(&self) -> String {
        let mut out = self.content.clone();
        if let Some(target) = &self.typing_target {
            out.push_str("<span id=\"type\">");
            out.push_str(target);
            out.push_str("</span>");
        }
        if self.loading {
            out.push_str("<span class=\"loading loading-dots loading-sm\"></span>");
        }
        out
    }

    pub(crate) fn append(&mut self, html: &str) {
        self.content.push_str(html);
    }

    pub(crate) fn replace(&mut self, html: String) {
        self.typing_target = None;
        self.content = html;
    }

    /// Merge any existing typing target, then open an empty one
    pub(crate) fn open_typing_target(&mut self) {
        self.merge_typing_target();
        self.typing_target = Some(String::new());
    }

    pub(crate) fn type_into(&mut self, html: &str) {
        self.typing_target
            .get_or_insert_with(String::new)
            .push_str(html);
    }

    pub(crate) fn merge_typing_target(&mut self) {
        if let Some(target) = self.typing_target.take() {
            self.content.push_str(&target);
        }
    }

    pub(crate) fn remove_loading(&mut self) {
        self.loading = false;
    }
}

/// One user or assistant message in the transcript
#[derive(Debug, Clone)]
pub struct ChatTurn {
    id: TurnId,
    role: Role,
    text: String,
    bubble: Bubble,
    rendered: Option<Rendered>,
    timestamp: DateTime<Utc>,
    sealed: bool,
    synthesized: bool,
    rating: Option<RatingAnnotation>,
}

impl ChatTurn {
    /// A user turn; its text is escaped into the bubble and the turn is sealed
    pub fn user(text: impl Into<String>) -> Self {
        let text = text.into();
        let bubble = Bubble::with_content(escape_html(&text));
        Self {
            sealed: true,
            ..Self::new(Role::User, text, bubble)
        }
    }

    /// An assistant placeholder waiting for streamed content
    pub fn assistant() -> Self {
        Self::new(Role::Assistant, String::new(), Bubble::loading())
    }

    /// An assistant turn created because content arrived with no placeholder
    pub(crate) fn synthesized() -> Self {
        Self {
            synthesized: true,
            ..Self::new(Role::Assistant, String::new(), Bubble::error_styled())
        }
    }

    fn new(role: Role, text: String, bubble: Bubble) -> Self {
        Self {
            id: TurnId::new(),
            role,
            text,
            bubble,
            rendered: None,
            timestamp: Utc::now(),
            sealed: false,
            synthesized: false,
            rating: None,
        }
    }

    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }

    /// Raw text accumulated from the stream
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bubble(&self) -> &Bubble {
        &self.bubble
    }

    pub fn rendered(&self) -> Option<&Rendered> {
        self.rendered.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    pub fn rating(&self) -> Option<&RatingAnnotation> {
        self.rating.as_ref()
    }

    pub(crate) fn bubble_mut(&mut self) -> &mut Bubble {
        &mut self.bubble
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub(crate) fn set_rendered(&mut self, rendered: Rendered) {
        self.bubble.replace(rendered.html());
        self.rendered = Some(rendered);
    }

    pub(crate) fn set_rating(&mut self, rating: RatingAnnotation) {
        self.rating = Some(rating);
    }

    /// Close the turn; later content goes to a new turn
    pub(crate) fn seal(&mut self) {
        self.bubble.merge_typing_target();
        self.bubble.remove_loading();
        self.timestamp = Utc::now();
        self.sealed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_turn_is_escaped_and_sealed() {
        let turn = ChatTurn::user("<b>hi</b>");
        assert!(turn.is_sealed());
        assert_eq!(turn.role(), Role::User);
        assert_eq!(turn.text(), "<b>hi</b>");
        assert_eq!(turn.bubble().content(), "&lt;b&gt;hi&lt;/b&gt;");
    }

    #[test]
    fn test_bubble_markup_keeps_loading_last() {
        let mut bubble = Bubble::loading();
        bubble.append("a");
        bubble.open_typing_target();
        bubble.type_into("b");
        assert_eq!(
            bubble.html(),
            "a<span id=\"type\">b</span><span class=\"loading loading-dots loading-sm\"></span>"
        );
        assert_eq!(bubble.visible(), "ab");

        bubble.open_typing_target();
        assert_eq!(bubble.content(), "ab");
        assert_eq!(bubble.typing_target(), Some(""));
    }

    #[test]
    fn test_seal_merges_and_removes_loading() {
        let mut turn = ChatTurn::assistant();
        turn.bubble_mut().open_typing_target();
        turn.bubble_mut().type_into("done");
        turn.seal();
        assert!(turn.is_sealed());
        assert!(!turn.bubble().is_loading());
        assert_eq!(turn.bubble().html(), "done");
    }
}
