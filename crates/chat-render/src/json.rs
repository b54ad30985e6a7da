//! JSON helpers: normalization, validity, pretty-printing, highlighting

use serde_json::Value;
use tracing::trace;

use crate::escape::escape_html;

/// Artifact some model responses leave behind a JSON payload
const TRAILING_FENCE_ARTIFACT: &str = "\n `";

const CLASS_KEY: &str = "text-red-500";
const CLASS_STRING: &str = "text-success";
const CLASS_NUMBER: &str = "text-pink-500";
const CLASS_BOOL: &str = "text-sky-500";
const CLASS_NULL: &str = "text-purple-500";

/// Light normalization before a strict JSON parse
///
/// Trims, drops a trailing `"\n `"` artifact and replaces typographic double
/// quotes with ASCII ones. Returns `None` for blank input.
pub fn prepare_json(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let trimmed = trimmed
        .strip_suffix(TRAILING_FENCE_ARTIFACT)
        .unwrap_or(trimmed);
    Some(trimmed.replace(['\u{201C}', '\u{201D}'], "\""))
}

/// Whether `text` parses as JSON. Never panics.
pub fn is_valid_json(text: &str) -> bool {
    match serde_json::from_str::<Value>(text) {
        Ok(_) => true,
        Err(e) => {
            trace!("value is not JSON ({}): {:?}", e, text);
            false
        }
    }
}

/// Pretty-print JSON text with two-space indentation
pub fn indent_json(text: &str) -> serde_json::Result<String> {
    let value: Value = serde_json::from_str(text)?;
    serde_json::to_string_pretty(&value)
}

/// Pretty-print JSON as HTML with each token wrapped in a coloured span
///
/// Text that is not JSON is returned escaped and otherwise untouched.
pub fn highlight_json(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => {
            let mut out = String::new();
            write_value(&mut out, &value, 0);
            out
        }
        Err(_) => escape_html(text),
    }
}

fn span(out: &mut String, class: &str, content: &str) {
    out.push_str("<span class=\"");
    out.push_str(class);
    out.push_str("\">");
    out.push_str(content);
    out.push_str("</span>");
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn quoted(s: &str) -> String {
    // serde_json quoting handles escapes, then the result is made HTML-safe
    escape_html(&Value::String(s.to_string()).to_string())
}

fn write_value(out: &mut String, value: &Value, level: usize) {
    match value {
        Value::Null => span(out, CLASS_NULL, "null"),
        Value::Bool(b) => span(out, CLASS_BOOL, if *b { "true" } else { "false" }),
        Value::Number(n) => span(out, CLASS_NUMBER, &n.to_string()),
        Value::String(s) => span(out, CLASS_STRING, &quoted(s)),
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return;
            }
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                indent(out, level + 1);
                write_value(out, item, level + 1);
                if i + 1 < items.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            indent(out, level);
            out.push(']');
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push_str("{\n");
            for (i, (key, item)) in map.iter().enumerate() {
                indent(out, level + 1);
                span(out, CLASS_KEY, &format!("{}:", quoted(key)));
                out.push(' ');
                write_value(out, item, level + 1);
                if i + 1 < map.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            indent(out, level);
            out.push('}');
        }
    }
}
