//! Direct append of raw chunks with a single render at the end

use tracing::{debug, info};

use crate::event::SENTINEL;
use crate::models::TurnId;
use crate::transcript::Transcript;

use super::FragmentOutcome;

/// Appends each fragment verbatim and renders the turn on the sentinel
///
/// The renderer sticks to the turn its first fragment went to until the
/// sentinel seals it.
#[derive(Debug, Default)]
pub struct ChunkedRenderer {
    buffer: String,
    turn: Option<TurnId>,
}

impl ChunkedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text accumulated for the current turn
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// The turn currently receiving text, if any
    pub fn turn(&self) -> Option<TurnId> {
        self.turn
    }

    pub fn push(&mut self, transcript: &mut Transcript, fragment: &str) -> FragmentOutcome {
        if fragment == SENTINEL {
            self.finish(transcript);
            return FragmentOutcome::Finalized;
        }

        self.buffer.push_str(fragment);
        self.buffer.push('\n');

        let turn = transcript.assistant_for(self.turn);
        self.turn = Some(turn.id());
        turn.push_text(fragment);
        turn.bubble_mut().append(fragment);
        FragmentOutcome::Appended
    }

    fn finish(&mut self, transcript: &mut Transcript) {
        info!("Answer complete, rendering {} buffered bytes", self.buffer.len());
        let text = std::mem::take(&mut self.buffer);
        let bound = self.turn.take();
        if text.is_empty() && bound.is_none() && transcript.open_assistant_mut().is_none() {
            debug!("Sentinel with no open turn, nothing to finalize");
            return;
        }
        let rendered = chat_render::finalize(&text);
        debug!("Rendered turn as {}", if rendered.is_table() { "table" } else { "markdown" });

        let turn = transcript.assistant_for(bound);
        turn.bubble_mut().remove_loading();
        turn.set_rendered(rendered);
        turn.seal();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_append_before_loading() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut renderer = ChunkedRenderer::new();

        renderer.push(&mut transcript, "Hello ");
        renderer.push(&mut transcript, "world");

        let turn = transcript.last().unwrap();
        assert_eq!(turn.bubble().content(), "Hello world");
        assert!(turn.bubble().html().ends_with("loading-sm\"></span>"));
        assert_eq!(renderer.buffered(), "Hello \nworld\n");
    }

    #[test]
    fn test_sentinel_renders_markdown() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut renderer = ChunkedRenderer::new();

        renderer.push(&mut transcript, "**done**");
        assert_eq!(renderer.push(&mut transcript, SENTINEL), FragmentOutcome::Finalized);

        let turn = transcript.last().unwrap();
        assert!(turn.is_sealed());
        assert!(!turn.bubble().is_loading());
        assert_eq!(turn.bubble().html(), "<p><strong>done</strong></p>\n");
        assert!(!turn.rendered().unwrap().is_table());
        assert_eq!(renderer.buffered(), "");
    }

    #[test]
    fn test_sentinel_renders_json_table() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut renderer = ChunkedRenderer::new();

        renderer.push(&mut transcript, "[{\"code\":\"A1\"},");
        renderer.push(&mut transcript, "{\"code\":\"B2\"}]");
        renderer.push(&mut transcript, SENTINEL);

        let turn = transcript.last().unwrap();
        assert!(turn.rendered().unwrap().is_table());
        assert!(turn.bubble().html().contains("<td>B2</td>"));
    }

    #[test]
    fn test_sentinel_is_never_displayed() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut renderer = ChunkedRenderer::new();
        renderer.push(&mut transcript, "text");
        renderer.push(&mut transcript, SENTINEL);
        assert!(!transcript.last().unwrap().bubble().html().contains(SENTINEL));
        assert_eq!(transcript.last().unwrap().text(), "text");
    }

    #[test]
    fn test_repeated_sentinel_adds_no_turn() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut renderer = ChunkedRenderer::new();
        renderer.push(&mut transcript, "a");
        renderer.push(&mut transcript, SENTINEL);
        renderer.push(&mut transcript, SENTINEL);
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_new_question_mid_answer_keeps_answers_apart() {
        let mut transcript = Transcript::new();
        transcript.push_user("q1");
        let first = transcript.begin_assistant();
        let mut renderer = ChunkedRenderer::new();

        renderer.push(&mut transcript, "abc");
        transcript.push_user("q2");
        let second = transcript.begin_assistant();
        renderer.push(&mut transcript, "def");
        renderer.push(&mut transcript, SENTINEL);

        let answer = transcript.get(first).unwrap();
        assert!(answer.is_sealed());
        assert_eq!(answer.text(), "abcdef");
        assert!(answer.bubble().html().contains("def"));
        assert!(!answer.bubble().is_loading());

        let placeholder = transcript.get(second).unwrap();
        assert!(!placeholder.is_sealed());
        assert!(placeholder.bubble().is_loading());
        assert_eq!(placeholder.text(), "");
        assert_eq!(renderer.turn(), None);

        renderer.push(&mut transcript, "next");
        renderer.push(&mut transcript, SENTINEL);
        assert!(transcript.get(second).unwrap().is_sealed());
        assert_eq!(transcript.get(second).unwrap().text(), "next");
        assert_eq!(transcript.len(), 4);
    }
}
