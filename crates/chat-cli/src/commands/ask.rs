//! Ask command - one question, one answer

use anyhow::{bail, Context, Result};
use chat_client::StreamSession;

use crate::output::OutputContext;

/// Send a question and print the answer once it has fully streamed in
pub async fn ask(session: &mut StreamSession, question: &str, ctx: &OutputContext) -> Result<()> {
    let spinner = ctx.spinner("Waiting for answer...");
    let result = tokio::select! {
        result = answer(session, question) => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow::anyhow!("Interrupted")),
    };
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if let Err(e) = result {
        ctx.print_notices(session.transcript());
        return Err(e);
    }

    match session.transcript().last() {
        Some(turn) if turn.is_assistant() => ctx.print_answer(turn),
        _ => bail!("Server sent no answer"),
    }
    Ok(())
}

async fn answer(session: &mut StreamSession, question: &str) -> Result<()> {
    session
        .submit(question)
        .await
        .context("Failed to send message")?;
    session
        .run_until_idle()
        .await
        .context("Answer stream failed")?;
    Ok(())
}
