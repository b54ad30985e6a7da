//! Animated one-fragment-at-a-time typing
//!
//! At most one fragment animates at a time; the rest wait in FIFO order.
//! Each [`Typewriter::tick`] reveals one step of the running fragment.
//! A sentinel is a finalize signal: it seals the turn at once when nothing
//! is pending, otherwise as soon as the queue has drained. It is never
//! typed out.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::event::SENTINEL;
use crate::models::TurnId;
use crate::transcript::Transcript;

use super::FragmentOutcome;

/// Split pre-escaped HTML into reveal steps
///
/// A markup tag (`<...>`) or an entity (`&...;`) is one step; any other
/// character is a step of its own. Unterminated tags and entities fall back
/// to single characters.
pub fn reveal_steps(html: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut rest = html;
    while let Some(c) = rest.chars().next() {
        let len = match c {
            '<' => rest.find('>').map(|end| end + 1),
            '&' => rest
                .find(';')
                .filter(|&end| {
                    end > 1
                        && rest[1..end]
                            .chars()
                            .all(|ch| ch.is_ascii_alphanumeric() || ch == '#')
                })
                .map(|end| end + 1),
            _ => None,
        }
        .unwrap_or_else(|| c.len_utf8());
        steps.push(rest[..len].to_string());
        rest = &rest[len..];
    }
    steps
}

/// Undo the literal escape sequences the stream leaves in text deltas
fn expand_escapes(fragment: &str) -> String {
    fragment.replace("\\n", "<br>").replace("\\t", "\t")
}

#[derive(Debug)]
struct Animation {
    turn: TurnId,
    steps: Vec<String>,
    next: usize,
}

impl Animation {
    fn new(turn: TurnId, fragment: &str) -> Self {
        Self {
            turn,
            steps: reveal_steps(fragment),
            next: 0,
        }
    }

    fn is_done(&self) -> bool {
        self.next >= self.steps.len()
    }
}

/// Work waiting behind the running animation
#[derive(Debug)]
enum Pending {
    Text(String),
    /// A sentinel that arrived while busy
    Seal,
}

/// Queue-backed typing effect
///
/// The typewriter is bound to the assistant turn it first wrote to until
/// that turn is sealed, so turns appended in the meantime are left alone.
#[derive(Debug, Default)]
pub struct Typewriter {
    queue: VecDeque<Pending>,
    current: Option<Animation>,
    turn: Option<TurnId>,
}

impl Typewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_typing(&self) -> bool {
        self.current.is_some()
    }

    /// Number of fragments waiting behind the running animation
    pub fn queued(&self) -> usize {
        self.queue
            .iter()
            .filter(|p| matches!(p, Pending::Text(_)))
            .count()
    }

    pub fn is_finalize_pending(&self) -> bool {
        self.queue.iter().any(|p| matches!(p, Pending::Seal))
    }

    /// The turn currently receiving text, if any
    pub fn turn(&self) -> Option<TurnId> {
        self.turn
    }

    pub fn push(&mut self, transcript: &mut Transcript, fragment: &str) -> FragmentOutcome {
        trace!(
            "typing={} queued={} fragment={:?}",
            self.is_typing(),
            self.queue.len(),
            fragment
        );

        let busy = self.current.is_some() || !self.queue.is_empty();
        if fragment == SENTINEL {
            if !busy {
                self.finish(transcript);
                return FragmentOutcome::Finalized;
            }
            debug!("Sentinel arrived mid-animation, finalizing after {} queued", self.queued());
            self.queue.push_back(Pending::Seal);
            return FragmentOutcome::FinalizeDeferred;
        }

        let fragment = expand_escapes(fragment);
        if busy {
            self.queue.push_back(Pending::Text(fragment));
            return FragmentOutcome::Queued;
        }
        self.start(transcript, &fragment);
        FragmentOutcome::Started
    }

    /// Reveal the next step; returns `true` while still typing afterwards
    pub fn tick(&mut self, transcript: &mut Transcript) -> bool {
        let Some(animation) = self.current.as_mut() else {
            return false;
        };

        if let Some(step) = animation.steps.get(animation.next) {
            match transcript.open_turn_mut(animation.turn) {
                Some(turn) => turn.bubble_mut().type_into(step),
                None => trace!("Turn {} is gone, dropping step", animation.turn),
            }
            animation.next += 1;
        }

        if animation.is_done() {
            self.complete(transcript);
        }
        self.current.is_some()
    }

    fn start(&mut self, transcript: &mut Transcript, fragment: &str) {
        let turn = transcript.assistant_for(self.turn);
        let id = turn.id();
        turn.push_text(fragment);
        turn.bubble_mut().open_typing_target();
        self.turn = Some(id);
        self.current = Some(Animation::new(id, fragment));
    }

    fn complete(&mut self, transcript: &mut Transcript) {
        self.current = None;
        while let Some(pending) = self.queue.pop_front() {
            match pending {
                Pending::Text(next) => {
                    self.start(transcript, &next);
                    return;
                }
                Pending::Seal => self.seal_bound(transcript),
            }
        }
    }

    /// Finalize on an idle sentinel
    fn finish(&mut self, transcript: &mut Transcript) {
        if self.turn.is_some() {
            self.seal_bound(transcript);
            return;
        }
        match transcript.open_assistant_mut() {
            Some(turn) => {
                debug!("Answer complete for turn {}", turn.id());
                turn.seal();
            }
            None => debug!("Sentinel with no open turn, nothing to finalize"),
        }
    }

    fn seal_bound(&mut self, transcript: &mut Transcript) {
        let Some(id) = self.turn.take() else {
            debug!("Sentinel with no bound turn, nothing to finalize");
            return;
        };
        if let Some(turn) = transcript.open_turn_mut(id) {
            debug!("Answer complete for turn {}", id);
            turn.seal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(writer: &mut Typewriter, transcript: &mut Transcript) {
        let mut ticks = 0;
        while writer.tick(transcript) {
            ticks += 1;
            assert!(ticks < 10_000, "animation never completed");
        }
    }

    #[test]
    fn test_reveal_steps() {
        assert_eq!(reveal_steps("ab"), vec!["a", "b"]);
        assert_eq!(reveal_steps("a<br>b"), vec!["a", "<br>", "b"]);
        assert_eq!(reveal_steps("x &amp; y"), vec!["x", " ", "&amp;", " ", "y"]);
        assert_eq!(reveal_steps("a&b c;"), vec!["a", "&", "b", " ", "c", ";"]);
        assert_eq!(reveal_steps("1 < 2"), vec!["1", " ", "<", " ", "2"]);
        assert_eq!(reveal_steps("ü"), vec!["ü"]);
        assert!(reveal_steps("").is_empty());
    }

    #[test]
    fn test_sentinel_first_finalizes_without_animation() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut writer = Typewriter::new();

        assert_eq!(writer.push(&mut transcript, SENTINEL), FragmentOutcome::Finalized);
        assert!(!writer.is_typing());
        let turn = transcript.last().unwrap();
        assert!(turn.is_sealed());
        assert!(!turn.bubble().is_loading());
        assert_eq!(turn.bubble().html(), "");
    }

    #[test]
    fn test_fragments_reveal_in_order_exactly_once() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut writer = Typewriter::new();

        let fragments = ["Hel", "lo, ", "wor", "ld", "!"];
        assert_eq!(writer.push(&mut transcript, fragments[0]), FragmentOutcome::Started);
        for f in &fragments[1..] {
            assert_eq!(writer.push(&mut transcript, f), FragmentOutcome::Queued);
        }
        assert_eq!(writer.queued(), 4);
        assert_eq!(
            writer.push(&mut transcript, SENTINEL),
            FragmentOutcome::FinalizeDeferred
        );

        drain(&mut writer, &mut transcript);

        assert!(!writer.is_typing());
        assert_eq!(writer.queued(), 0);
        assert!(!writer.is_finalize_pending());
        let turn = transcript.last().unwrap();
        assert!(turn.is_sealed());
        assert_eq!(turn.bubble().html(), "Hello, world!");
        assert_eq!(turn.text(), "Hello, world!");
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_one_step_per_tick() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut writer = Typewriter::new();

        writer.push(&mut transcript, "a<b>c</b>");
        assert!(writer.tick(&mut transcript));
        assert_eq!(transcript.last().unwrap().bubble().visible(), "a");
        assert!(writer.tick(&mut transcript));
        assert_eq!(transcript.last().unwrap().bubble().visible(), "a<b>");
        assert!(writer.tick(&mut transcript));
        // last step completes the animation
        assert!(!writer.tick(&mut transcript));
        assert_eq!(transcript.last().unwrap().bubble().visible(), "a<b>c</b>");
    }

    #[test]
    fn test_sentinel_mid_animation_is_never_typed() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut writer = Typewriter::new();

        writer.push(&mut transcript, "abc");
        writer.tick(&mut transcript);
        assert_eq!(
            writer.push(&mut transcript, SENTINEL),
            FragmentOutcome::FinalizeDeferred
        );
        assert!(!transcript.last().unwrap().is_sealed());

        drain(&mut writer, &mut transcript);
        let turn = transcript.last().unwrap();
        assert!(turn.is_sealed());
        assert!(!turn.bubble().html().contains(SENTINEL));
        assert_eq!(turn.bubble().html(), "abc");
    }

    #[test]
    fn test_literal_escapes_become_markup() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut writer = Typewriter::new();

        writer.push(&mut transcript, "a\\nb\\tc");
        drain(&mut writer, &mut transcript);
        assert_eq!(transcript.last().unwrap().bubble().visible(), "a<br>b\tc");
    }

    #[test]
    fn test_each_fragment_gets_fresh_target() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut writer = Typewriter::new();

        writer.push(&mut transcript, "one ");
        writer.push(&mut transcript, "two");
        while writer.tick(&mut transcript) {
            let bubble = transcript.last().unwrap().bubble();
            if bubble.content() == "one " {
                assert!("two".starts_with(bubble.typing_target().unwrap()));
            }
        }
        let bubble = transcript.last().unwrap().bubble();
        assert_eq!(bubble.content(), "one ");
        assert_eq!(bubble.typing_target(), Some("two"));
        assert!(bubble.is_loading());
    }

    #[test]
    fn test_empty_fragment_completes_on_next_tick() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut writer = Typewriter::new();

        assert_eq!(writer.push(&mut transcript, ""), FragmentOutcome::Started);
        assert!(writer.is_typing());
        assert!(!writer.tick(&mut transcript));
    }

    #[test]
    fn test_idle_fragment_after_seal_opens_new_turn() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant();
        let mut writer = Typewriter::new();

        writer.push(&mut transcript, SENTINEL);
        writer.push(&mut transcript, "late");
        drain(&mut writer, &mut transcript);
        assert_eq!(transcript.len(), 2);
        assert!(transcript.last().unwrap().is_synthesized());
    }

    #[test]
    fn test_new_question_while_typing_keeps_answers_apart() {
        let mut transcript = Transcript::new();
        transcript.push_user("q1");
        let first = transcript.begin_assistant();
        let mut writer = Typewriter::new();

        writer.push(&mut transcript, "abc");
        writer.tick(&mut transcript);
        writer.push(&mut transcript, SENTINEL);

        transcript.push_user("q2");
        let second = transcript.begin_assistant();
        drain(&mut writer, &mut transcript);

        let answer = transcript.get(first).unwrap();
        assert!(answer.is_sealed());
        assert!(!answer.bubble().is_loading());
        assert_eq!(answer.bubble().html(), "abc");

        let placeholder = transcript.get(second).unwrap();
        assert!(!placeholder.is_sealed());
        assert!(placeholder.bubble().is_loading());
        assert_eq!(placeholder.text(), "");
        assert_eq!(writer.turn(), None);

        // the next answer lands in the new placeholder
        writer.push(&mut transcript, "de");
        writer.push(&mut transcript, SENTINEL);
        drain(&mut writer, &mut transcript);
        let answer = transcript.get(second).unwrap();
        assert!(answer.is_sealed());
        assert_eq!(answer.bubble().html(), "de");
        assert!(!answer.is_synthesized());
        assert_eq!(transcript.len(), 4);
    }

    #[test]
    fn test_fragments_after_deferred_sentinel_start_next_answer() {
        let mut transcript = Transcript::new();
        let first = transcript.begin_assistant();
        let mut writer = Typewriter::new();

        writer.push(&mut transcript, "one");
        writer.push(&mut transcript, SENTINEL);
        assert!(writer.is_finalize_pending());
        let second = transcript.begin_assistant();
        assert_eq!(writer.push(&mut transcript, "two"), FragmentOutcome::Queued);
        writer.push(&mut transcript, SENTINEL);
        drain(&mut writer, &mut transcript);

        assert_eq!(transcript.get(first).unwrap().bubble().html(), "one");
        assert_eq!(transcript.get(second).unwrap().bubble().html(), "two");
        assert!(transcript.get(second).unwrap().is_sealed());
        assert!(!writer.is_finalize_pending());
    }
}
