//! Rate command - rate an answer of an earlier conversation

use anyhow::{Context, Result};
use chat_client::{ChatClient, RateRequest};
use chat_core::Rating;

use crate::output::OutputContext;

/// Submit a rating by conversation id and answer number
pub async fn rate(
    client: &ChatClient,
    chat_id: &str,
    ordinal: usize,
    score: u8,
    ctx: &OutputContext,
) -> Result<()> {
    let rating = Rating::try_from(score)?;
    let request = RateRequest {
        chat_id: chat_id.to_string(),
        chat_rating: rating,
        chat_idx: ordinal,
        turn_id: None,
    };
    client
        .rate(&request)
        .await
        .context("Failed to submit rating")?;
    ctx.success(&format!("Rated answer {} of {} with {}", ordinal, chat_id, score));
    Ok(())
}
