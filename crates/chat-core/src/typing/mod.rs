//! Reveal strategies for streamed assistant text
//!
//! Two strategies share one contract: take a fragment, show it, and seal
//! the active turn when the [`SENTINEL`](crate::SENTINEL) arrives.
//!
//! - [`ChunkedRenderer`] appends fragments as they arrive and renders the
//!   whole turn (table or Markdown) at the end.
//! - [`Typewriter`] animates one fragment at a time, queueing the rest.

mod chunked;
mod typewriter;

pub use chunked::ChunkedRenderer;
pub use typewriter::{reveal_steps, Typewriter};

use crate::transcript::Transcript;

/// Routes that stream raw chunks instead of typed text
const CHUNKED_ROUTES: [&str; 2] = ["/voip", "/aidb"];

/// Which reveal strategy a view uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStrategy {
    Chunked,
    Typewriter,
}

impl RevealStrategy {
    /// Pick the strategy for a route path
    pub fn for_path(path: &str) -> Self {
        if CHUNKED_ROUTES.contains(&path) {
            RevealStrategy::Chunked
        } else {
            RevealStrategy::Typewriter
        }
    }
}

/// What happened to a fragment handed to a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// Shown immediately
    Appended,
    /// Animation started
    Started,
    /// Waiting behind the running animation
    Queued,
    /// The turn was sealed
    Finalized,
    /// Sentinel noted; the turn seals once queued text has been typed
    FinalizeDeferred,
}

/// The renderer a tab uses for its active assistant turn
#[derive(Debug)]
pub enum TypingRenderer {
    Chunked(ChunkedRenderer),
    Typewriter(Typewriter),
}

impl TypingRenderer {
    pub fn new(strategy: RevealStrategy) -> Self {
        match strategy {
            RevealStrategy::Chunked => TypingRenderer::Chunked(ChunkedRenderer::new()),
            RevealStrategy::Typewriter => TypingRenderer::Typewriter(Typewriter::new()),
        }
    }

    pub fn strategy(&self) -> RevealStrategy {
        match self {
            TypingRenderer::Chunked(_) => RevealStrategy::Chunked,
            TypingRenderer::Typewriter(_) => RevealStrategy::Typewriter,
        }
    }

    /// Hand a fragment (or the sentinel) to the renderer
    pub fn push(&mut self, transcript: &mut Transcript, fragment: &str) -> FragmentOutcome {
        match self {
            TypingRenderer::Chunked(r) => r.push(transcript, fragment),
            TypingRenderer::Typewriter(r) => r.push(transcript, fragment),
        }
    }

    /// Advance any running animation by one step
    ///
    /// Returns `true` while an animation is still running afterwards.
    pub fn tick(&mut self, transcript: &mut Transcript) -> bool {
        match self {
            TypingRenderer::Chunked(_) => false,
            TypingRenderer::Typewriter(r) => r.tick(transcript),
        }
    }

    pub fn is_animating(&self) -> bool {
        match self {
            TypingRenderer::Chunked(_) => false,
            TypingRenderer::Typewriter(r) => r.is_typing(),
        }
    }
}
