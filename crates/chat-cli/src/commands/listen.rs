//! Listen command - print raw stream events

use anyhow::{Context, Result};
use chat_client::streaming::{ChannelHandler, StreamConsumer, StreamMessage};
use chat_client::ChatClient;
use chat_core::storage::{self, MemoryStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::output::OutputContext;

/// Print every content event on the stream until Ctrl+C
pub async fn listen(
    client: &ChatClient,
    connection_id: Option<&str>,
    liveness_delay: Duration,
    ctx: &OutputContext,
) -> Result<()> {
    let session = MemoryStore::new();
    let connection_id = match connection_id {
        Some(id) => id.to_string(),
        None => storage::connection_id(&session),
    };
    let url = client
        .stream_url(&connection_id)
        .context("Failed to build stream URL")?;

    ctx.info(&format!("Listening on {} (connection {})", url, connection_id));
    ctx.info("Press Ctrl+C to stop");

    let mut consumer = StreamConsumer::new(
        client.stream_http_client().clone(),
        Arc::new(MemoryStore::new()),
    )
    .with_liveness_delay(liveness_delay);
    let (tx, mut rx) = mpsc::unbounded_channel();
    consumer.open(url, ChannelHandler::new(tx));

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(StreamMessage::Opened) => ctx.success("Connected"),
                Some(StreamMessage::Event(event)) => ctx.print_event(&event),
                Some(StreamMessage::Failed(reason)) => {
                    ctx.error(&format!("Stream error: {}", reason));
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    ctx.info("\nClosing stream...");
    consumer.unload();
    Ok(())
}
