//! JSON to HTML table rendering

use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::Value;
use tracing::debug;

use crate::error::{TableError, TableResult};
use crate::escape::escape_html;
use crate::json::prepare_json;

/// Source of unique table element ids within a process
static NEXT_TABLE_ID: AtomicU32 = AtomicU32::new(1);

/// A tabular rendering of a JSON array of records
///
/// Columns are the first record's keys in document order. Later records
/// are projected onto those columns; keys they lack render as empty cells.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonTable {
    id: u32,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl JsonTable {
    /// Element id used in the rendered markup (`dt-<id>`)
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render as an HTML table
    pub fn to_html(&self) -> String {
        let mut out = format!(
            "<table id=\"dt-{}\" class=\"table-sm display compact stripe nowrap\"><thead><tr>",
            self.id
        );
        for column in &self.columns {
            out.push_str("<th>");
            out.push_str(&escape_html(column));
            out.push_str("</th>");
        }
        out.push_str("</tr></thead><tbody>");
        for row in &self.rows {
            out.push_str("<tr>");
            for cell in row {
                out.push_str("<td>");
                out.push_str(&escape_html(&cell_text(cell)));
                out.push_str("</td>");
            }
            out.push_str("</tr>");
        }
        out.push_str("</tbody></table>");
        out
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Render raw turn text as a table
///
/// Fails (without panicking) when the text is blank, is not JSON, or is not
/// a non-empty array of objects.
pub fn render_json_table(raw: &str) -> TableResult<JsonTable> {
    let prepared = prepare_json(raw).ok_or(TableError::Empty)?;
    let value: Value = serde_json::from_str(&prepared)?;

    let records = match value {
        Value::Array(records) => records,
        _ => return Err(TableError::NotArray),
    };

    let columns: Vec<String> = match records.first() {
        Some(Value::Object(first)) => first.keys().cloned().collect(),
        Some(_) => return Err(TableError::NotObject(0)),
        None => return Err(TableError::NoRecords),
    };

    let mut rows = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let object = record.as_object().ok_or(TableError::NotObject(index))?;
        rows.push(
            columns
                .iter()
                .map(|column| object.get(column).cloned().unwrap_or(Value::Null))
                .collect(),
        );
    }

    let table = JsonTable {
        id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
        columns,
        rows,
    };
    debug!(
        "Built table with {} rows and {} columns",
        table.rows.len(),
        table.columns.len()
    );
    Ok(table)
}
