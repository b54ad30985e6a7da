//! Chat command - interactive conversation

use anyhow::{Context, Result};
use chat_client::StreamSession;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::output::OutputContext;

/// A line typed at the prompt
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Question(&'a str),
    Rate { ordinal: usize, score: u8 },
    History,
    Quit,
    Invalid(&'static str),
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix(':') else {
        return Input::Question(line);
    };

    let mut parts = command.split_whitespace();
    match parts.next() {
        Some("q") | Some("quit") => Input::Quit,
        Some("history") => Input::History,
        Some("rate") => {
            let ordinal = parts.next().and_then(|s| s.parse().ok());
            let score = parts.next().and_then(|s| s.parse().ok());
            match (ordinal, score) {
                (Some(ordinal), Some(score)) => Input::Rate { ordinal, score },
                _ => Input::Invalid("Usage: :rate <answer number> <1-5>"),
            }
        }
        _ => Input::Invalid("Commands: :rate <n> <score>, :history, :quit"),
    }
}

/// Wait for a background rating submission to finish
async fn await_rating(submission: JoinHandle<()>) -> Result<()> {
    submission.await.context("Rating submission did not complete")
}

/// Read questions from stdin until EOF, `:quit` or Ctrl+C
pub async fn chat(session: &mut StreamSession, show_history: bool, ctx: &OutputContext) -> Result<()> {
    ctx.info("Type a question, :rate <n> <score> to rate an answer, :quit to leave");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_input(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::History => ctx.print_transcript(session.transcript()),
            Input::Invalid(usage) => ctx.warn(usage),
            Input::Rate { ordinal, score } => match session.rate(ordinal, score) {
                Ok(submission) => match await_rating(submission).await {
                    Ok(()) => ctx.success(&format!("Rated answer {} with {}", ordinal, score)),
                    Err(e) => ctx.error(&format!("{:#}", e)),
                },
                Err(e) => ctx.error(&format!("Rating failed: {}", e)),
            },
            Input::Question(question) => {
                if let Err(e) = super::ask(session, question, ctx).await {
                    ctx.error(&format!("{:#}", e));
                }
            }
        }
    }

    if show_history {
        ctx.print_transcript(session.transcript());
    }
    Ok(())
}
