//! chat-render - Finalization helpers for streamed chat turns
//!
//! When an assistant turn is complete its accumulated text is rendered once,
//! either as an HTML table (when the text is a JSON array of records) or as
//! Markdown.
//!
//! # Example
//!
//! ```
//! use chat_render::{finalize, Rendered};
//!
//! let rendered = finalize(r#"[{"name":"alpha"},{"name":"beta"}]"#);
//! assert!(matches!(rendered, Rendered::Table(_)));
//!
//! let rendered = finalize("**bold** text");
//! assert_eq!(rendered.html(), "<p><strong>bold</strong> text</p>\n");
//! ```

mod error;
mod escape;
pub mod json;
pub mod markdown;
pub mod table;

pub use error::{TableError, TableResult};
pub use escape::escape_html;
pub use json::{highlight_json, indent_json, is_valid_json, prepare_json};
pub use markdown::render_markdown;
pub use table::{render_json_table, JsonTable};

use tracing::debug;

/// Terminal rendering of a finished turn
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// The text was a JSON array of records
    Table(JsonTable),
    /// Everything else, rendered from Markdown
    Markdown(String),
}

impl Rendered {
    /// HTML for the rendered turn
    pub fn html(&self) -> String {
        match self {
            Rendered::Table(table) => table.to_html(),
            Rendered::Markdown(html) => html.clone(),
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Rendered::Table(_))
    }
}

/// Render accumulated turn text
///
/// Valid JSON that tabulates becomes a table. Malformed JSON, or JSON that is
/// not an array of records, falls back to Markdown.
pub fn finalize(text: &str) -> Rendered {
    if is_valid_json(text) {
        match render_json_table(text) {
            Ok(table) => return Rendered::Table(table),
            Err(e) => debug!("JSON text does not tabulate, rendering as markdown: {}", e),
        }
    }
    Rendered::Markdown(render_markdown(text))
}
