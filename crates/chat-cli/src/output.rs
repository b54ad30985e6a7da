//! Output formatting for chat-cli (text, html, json)

use std::time::Duration;

use chat_core::{ChatTurn, Role, ServerEvent, Transcript};
use chat_render::{JsonTable, Rendered};
use clap::ValueEnum;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::{Table, Tabled};

/// Longest text shown per row of the history table
const PREVIEW_CHARS: usize = 60;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain terminal text; tables drawn as ASCII (default)
    #[default]
    Text,
    /// The rendered bubble markup
    Html,
    /// JSON format
    Json,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Spinner shown while an answer streams in
    pub fn spinner(&self, msg: &str) -> Option<ProgressBar> {
        if self.quiet || self.format == OutputFormat::Json {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    /// Print one assistant answer in the configured format
    pub fn print_answer(&self, turn: &ChatTurn) {
        match self.format {
            OutputFormat::Text => println!("{}", answer_text(turn)),
            OutputFormat::Html => println!("{}", turn.bubble().html()),
            OutputFormat::Json => print_json(&TurnJson::from_turn(turn)),
        }
    }

    /// Print the whole conversation
    pub fn print_transcript(&self, transcript: &Transcript) {
        match self.format {
            OutputFormat::Text => {
                if transcript.is_empty() {
                    if !self.quiet {
                        println!("No messages");
                    }
                } else {
                    let rows: Vec<TurnRow> = history_rows(transcript);
                    println!("{}", Table::new(rows));
                }
            }
            OutputFormat::Html => {
                for turn in transcript.turns() {
                    println!("<div class=\"chat {}\">", bubble_class(turn.role()));
                    println!("{}", turn.bubble().html());
                    println!("</div>");
                }
            }
            OutputFormat::Json => {
                let turns: Vec<TurnJson> =
                    transcript.turns().iter().map(TurnJson::from_turn).collect();
                print_json(&turns);
            }
        }
    }

    /// Print notices that are still up
    pub fn print_notices(&self, transcript: &Transcript) {
        for notice in transcript.notices() {
            self.error(&notice.message);
        }
    }

    /// Print a raw stream event
    pub fn print_event(&self, event: &ServerEvent) {
        match self.format {
            OutputFormat::Json => {
                print_json(&serde_json::json!({
                    "event": event.kind.as_str(),
                    "data": event.data,
                    "id": event.id,
                }));
            }
            _ => {
                if event.is_sentinel() {
                    println!("{}", format!("[{}] end of answer", event.kind).dimmed());
                } else {
                    println!("{} {}", format!("[{}]", event.kind).cyan(), event.data);
                }
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn bubble_class(role: Role) -> &'static str {
    match role {
        Role::User => "chat-start",
        Role::Assistant => "chat-end",
    }
}

/// Terminal rendition of a turn
pub fn answer_text(turn: &ChatTurn) -> String {
    match turn.rendered() {
        Some(Rendered::Table(table)) => table_text(table),
        _ => turn.text().replace("<br>", "\n"),
    }
}

/// Draw a tabular answer as an ASCII table
pub fn table_text(table: &JsonTable) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.columns().iter().cloned());
    for row in table.rows() {
        builder.push_record(row.iter().map(format_json_value));
    }
    builder.build().to_string()
}

fn format_json_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn preview(text: &str) -> String {
    let flat = text.replace("<br>", " ").replace('\n', " ");
    if flat.chars().count() > PREVIEW_CHARS {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

fn history_rows(transcript: &Transcript) -> Vec<TurnRow> {
    let mut ordinal = 0;
    transcript
        .turns()
        .iter()
        .map(|turn| {
            let index = if turn.is_assistant() {
                ordinal += 1;
                ordinal.to_string()
            } else {
                String::new()
            };
            TurnRow {
                index,
                role: turn.role().as_str().to_string(),
                time: turn.timestamp().format("%Y-%m-%d %H:%M:%S").to_string(),
                rating: turn
                    .rating()
                    .map(|r| r.score.value().to_string())
                    .unwrap_or_default(),
                text: preview(turn.text()),
            }
        })
        .collect()
}

// =============================================================================
// Display types
// =============================================================================

/// One line of the history table
#[derive(Debug, Tabled, Serialize)]
pub struct TurnRow {
    #[tabled(rename = "#")]
    pub index: String,
    #[tabled(rename = "Role")]
    pub role: String,
    #[tabled(rename = "Time")]
    pub time: String,
    #[tabled(rename = "Rating")]
    pub rating: String,
    #[tabled(rename = "Text")]
    pub text: String,
}

/// JSON shape of a turn
#[derive(Debug, Serialize)]
pub struct TurnJson {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub html: String,
    pub timestamp: String,
    pub sealed: bool,
    pub table: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl TurnJson {
    pub fn from_turn(turn: &ChatTurn) -> Self {
        Self {
            id: turn.id().to_string(),
            role: turn.role(),
            text: turn.text().to_string(),
            html: turn.bubble().html(),
            timestamp: turn.timestamp().to_rfc3339(),
            sealed: turn.is_sealed(),
            table: turn.rendered().is_some_and(Rendered::is_table),
            rating: turn.rating().map(|r| r.score.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_text() {
        let table = chat_render::render_json_table(r#"[{"a":1,"b":null},{"a":"x","b":true}]"#)
            .unwrap();
        let text = table_text(&table);
        assert!(text.contains('a'));
        assert!(text.contains("true"));
        assert!(!text.contains("null"));
    }

    #[test]
    fn test_preview_truncates() {
        let long = "word ".repeat(40);
        let short = preview(&long);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), PREVIEW_CHARS + 3);
        assert_eq!(preview("a<br>b"), "a b");
    }

    #[test]
    fn test_history_numbers_assistant_turns() {
        let mut transcript = Transcript::new();
        transcript.push_user("one");
        transcript.begin_assistant();
        transcript.push_user("two");
        transcript.begin_assistant();

        let rows = history_rows(&transcript);
        let indexes: Vec<&str> = rows.iter().map(|r| r.index.as_str()).collect();
        assert_eq!(indexes, vec!["", "1", "", "2"]);
        assert_eq!(rows[0].role, "user");
    }
}
