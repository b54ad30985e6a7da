//! The ordered list of chat turns in a tab

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{TranscriptError, TranscriptResult};
use crate::models::{ChatTurn, Notice, Rating, RatingAnnotation, TurnId};

/// How long a submission error banner stays visible
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(3);

/// Chat transcript of one tab
#[derive(Debug, Clone)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
    notices: Vec<Notice>,
    notice_ttl: Duration,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            notices: Vec::new(),
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }

    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn get(&self, id: TurnId) -> Option<&ChatTurn> {
        self.turns.iter().find(|t| t.id() == id)
    }

    /// Append a user turn
    pub fn push_user(&mut self, text: impl Into<String>) -> TurnId {
        let turn = ChatTurn::user(text);
        let id = turn.id();
        self.turns.push(turn);
        id
    }

    /// Append an assistant placeholder with a loading indicator
    pub fn begin_assistant(&mut self) -> TurnId {
        let turn = ChatTurn::assistant();
        let id = turn.id();
        self.turns.push(turn);
        id
    }

    /// The last turn, if it is an assistant turn still receiving content
    pub fn open_assistant_mut(&mut self) -> Option<&mut ChatTurn> {
        self.turns
            .last_mut()
            .filter(|turn| turn.is_assistant() && !turn.is_sealed())
    }

    /// The assistant turn currently receiving content
    ///
    /// When the last turn is not an open assistant turn a new one is
    /// synthesized, so streamed content always has somewhere to go.
    pub fn active_assistant_mut(&mut self) -> &mut ChatTurn {
        let needs_turn = !matches!(
            self.turns.last(),
            Some(turn) if turn.is_assistant() && !turn.is_sealed()
        );
        if needs_turn {
            debug!("No open assistant turn, synthesizing one");
            self.turns.push(ChatTurn::synthesized());
        }
        let last = self.turns.len() - 1;
        &mut self.turns[last]
    }

    /// The open assistant turn `id`, falling back to the active one
    ///
    /// Renderers stay bound to the turn they started on even after newer
    /// turns have been appended behind it.
    pub(crate) fn assistant_for(&mut self, id: Option<TurnId>) -> &mut ChatTurn {
        let open = id.and_then(|id| {
            self.turns
                .iter()
                .position(|t| t.id() == id && t.is_assistant() && !t.is_sealed())
        });
        match open {
            Some(index) => &mut self.turns[index],
            None => self.active_assistant_mut(),
        }
    }

    /// The assistant turn `id` if it is still open
    pub(crate) fn open_turn_mut(&mut self, id: TurnId) -> Option<&mut ChatTurn> {
        self.turns
            .iter_mut()
            .find(|t| t.id() == id && t.is_assistant() && !t.is_sealed())
    }

    /// The n-th assistant turn, counting from 1 and ignoring user turns
    pub fn assistant_by_ordinal(&self, ordinal: usize) -> Option<&ChatTurn> {
        if ordinal == 0 {
            return None;
        }
        self.turns
            .iter()
            .filter(|t| t.is_assistant())
            .nth(ordinal - 1)
    }

    /// Position of an assistant turn among assistant turns, counting from 1
    pub fn ordinal_of(&self, id: TurnId) -> Option<usize> {
        self.turns
            .iter()
            .filter(|t| t.is_assistant())
            .position(|t| t.id() == id)
            .map(|p| p + 1)
    }

    /// Attach a rating to a sealed assistant turn
    pub fn rate(&mut self, id: TurnId, score: Rating) -> TranscriptResult<&RatingAnnotation> {
        let turn = self
            .turns
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or(TranscriptError::TurnNotFound(id))?;
        if !turn.is_assistant() {
            return Err(TranscriptError::NotAssistant(id));
        }
        if !turn.is_sealed() {
            return Err(TranscriptError::NotSealed(id));
        }
        turn.set_rating(RatingAnnotation {
            turn_id: id,
            score,
            rated_at: Utc::now(),
        });
        turn.rating().ok_or(TranscriptError::TurnNotFound(id))
    }

    /// Handle a failed submission
    ///
    /// Removes the trailing in-flight assistant placeholder (if any) and
    /// raises an error notice that expires after the notice TTL.
    pub fn fail_pending(&mut self, status: u16, now: DateTime<Utc>) -> Option<ChatTurn> {
        let removed = match self.turns.last() {
            Some(turn) if turn.is_assistant() && !turn.is_sealed() => self.turns.pop(),
            _ => None,
        };
        let ttl = chrono::Duration::from_std(self.notice_ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(3));
        warn!("Chat submission failed with HTTP status {}", status);
        self.notices.push(Notice {
            message: format!("Error sending message! HTTP Status: {}", status),
            raised_at: now,
            expires_at: now + ttl,
        });
        removed
    }

    /// Drop expired notices, returning how many were removed
    pub fn prune_notices(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.notices.len();
        self.notices.retain(|n| !n.is_expired(now));
        before - self.notices.len()
    }

    /// Earliest notice expiry, if any notice is showing
    pub fn next_notice_expiry(&self) -> Option<DateTime<Utc>> {
        self.notices.iter().map(|n| n.expires_at).min()
    }
}
