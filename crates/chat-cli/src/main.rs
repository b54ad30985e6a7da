//! Chat CLI - Command-line client for the streaming chat server
//!
//! Asks questions, follows the answer stream and rates answers.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use chat_client::{ChatClient, StreamSession};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, MergedConfig};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "chat-cli")]
#[command(author, version, about = "Streaming chat client")]
#[command(propagate_version = true)]
struct Cli {
    /// Server URL [default: http://localhost:8080]
    #[arg(short, long, env = "CHAT_SERVER")]
    server: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "CHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Route whose reveal strategy to use (/voip and /aidb stream raw chunks)
    #[arg(short, long, env = "CHAT_ROUTE")]
    route: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the answer
    Ask {
        /// The question
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Interactive conversation on stdin
    Chat {
        /// Print the conversation when leaving
        #[arg(long)]
        history: bool,
    },

    /// Print raw stream events (SSE) until Ctrl+C
    Listen {
        /// Connection id to listen on; a fresh one by default
        #[arg(long)]
        connection_id: Option<String>,
    },

    /// Rate an answer of an earlier conversation
    Rate {
        /// Conversation id returned by the server
        chat_id: String,

        /// Answer number, counting from 1
        answer: usize,

        /// Score from 1 to 5
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        score: u8,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(cli.server.as_deref(), cli.route.as_deref(), cli.no_color);
    debug!(
        "Server {} on route {} ({:?})",
        merged.server,
        merged.session.route,
        merged.session.strategy()
    );

    // Create output context
    let ctx = OutputContext::new(cli.output, merged.no_color, cli.quiet);

    // Execute command
    match &cli.command {
        Commands::Ask { question } => {
            let mut session = create_session(&merged)?;
            let result = commands::ask(&mut session, &question.join(" "), &ctx).await;
            session.unload();
            result?;
        }

        Commands::Chat { history } => {
            let mut session = create_session(&merged)?;
            let result = commands::chat(&mut session, *history, &ctx).await;
            session.unload();
            result?;
        }

        Commands::Listen { connection_id } => {
            let client = create_client(&merged.server)?;
            commands::listen(
                &client,
                connection_id.as_deref(),
                merged.session.liveness_delay,
                &ctx,
            )
            .await?;
        }

        Commands::Rate {
            chat_id,
            answer,
            score,
        } => {
            let client = create_client(&merged.server)?;
            commands::rate(&client, chat_id, *answer, *score, &ctx).await?;
        }
    }

    Ok(())
}

/// Create a chat client for the given server URL
fn create_client(server: &str) -> Result<ChatClient> {
    ChatClient::new(server).context("Failed to create chat client")
}

fn create_session(merged: &MergedConfig) -> Result<StreamSession> {
    let client = create_client(&merged.server)?;
    Ok(StreamSession::new(client, merged.session.clone()))
}
