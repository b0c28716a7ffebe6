use anyhow::Result;
use serde_json::{Map, Value};
use flatstore::{Record, Table};

use crate::formatters::Formatter;

/// JSON formatter: rows become objects keyed by column label
pub struct JsonFormatter {
    /// Whether output is indented
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        JsonFormatter { pretty: true }
    }

    fn render(&self, value: &Value) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }

    fn message(&self, kind: &str, text: &str) -> String {
        let mut map = Map::new();
        map.insert(kind.to_string(), Value::String(text.to_string()));
        self.render(&Value::Object(map))
            .unwrap_or_else(|_| format!("{{\"{}\":\"{}\"}}", kind, text))
    }
}

/// Pair labels with cells into a JSON object
fn row_object<'a>(labels: impl Iterator<Item = &'a str>, cells: Vec<&str>) -> Value {
    let map: Map<String, Value> = labels
        .zip(cells)
        .map(|(label, cell)| (label.to_string(), Value::String(cell.to_string())))
        .collect();
    Value::Object(map)
}

impl Formatter for JsonFormatter {
    fn format_table(&self, table: &Table) -> Result<String> {
        let rows: Vec<Value> = table
            .rows
            .iter()
            .map(|row| row_object(table.columns.iter().map(String::as_str), row.cells()))
            .collect();
        self.render(&Value::Array(rows))
    }

    fn format_record(&self, record: &Record) -> Result<String> {
        self.render(&row_object(record.ordering().into_iter(), record.cells()))
    }

    fn format_error(&self, error: &str) -> String {
        self.message("error", error)
    }

    fn format_info(&self, info: &str) -> String {
        self.message("info", info)
    }

    fn format_success(&self, success: &str) -> String {
        self.message("success", success)
    }
}
