use anyhow::Result;
use colored::*;
use prettytable::{Cell, Row, Table};
use flatstore::{Record, Table as ResultTable};

use crate::formatters::Formatter;

/// Bordered table formatter
pub struct TableFormatter {
    /// Whether messages are coloured
    colored: bool,
}

impl TableFormatter {
    pub fn new() -> Self {
        TableFormatter { colored: true }
    }
}

fn header<'a>(labels: impl Iterator<Item = &'a str>) -> Row {
    Row::new(labels.map(|label| Cell::new(label).style_spec("b")).collect())
}

fn cells(values: Vec<&str>) -> Row {
    Row::new(values.into_iter().map(Cell::new).collect())
}

impl Formatter for TableFormatter {
    fn format_table(&self, result: &ResultTable) -> Result<String> {
        let mut table = Table::new();

        // Headers
        table.set_titles(header(result.columns.iter().map(String::as_str)));

        for row in &result.rows {
            table.add_row(cells(row.cells()));
        }

        let mut output = table.to_string();
        output.push_str(&format!("{} row(s)", result.len()));
        Ok(output)
    }

    fn format_record(&self, record: &Record) -> Result<String> {
        let mut table = Table::new();

        table.set_titles(Row::new(vec![
            Cell::new("Field").style_spec("b"),
            Cell::new("Value").style_spec("b"),
        ]));

        for (field, value) in record.ordering().into_iter().zip(record.cells()) {
            table.add_row(Row::new(vec![Cell::new(field), Cell::new(value)]));
        }

        Ok(table.to_string())
    }

    fn format_error(&self, error: &str) -> String {
        if self.colored {
            format!("{}", error.red().bold())
        } else {
            format!("Error: {}", error)
        }
    }

    fn format_info(&self, info: &str) -> String {
        if self.colored {
            format!("{}", info.blue())
        } else {
            format!("Info: {}", info)
        }
    }

    fn format_success(&self, success: &str) -> String {
        if self.colored {
            format!("{}", success.green().bold())
        } else {
            format!("Success: {}", success)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatstore::{ql, MemoryStore, Schema, Store};
    use std::sync::Arc;

    #[test]
    fn test_format_table_contains_cells() {
        let schema = Arc::new(Schema::media_views());
        let mut store = MemoryStore::new(Arc::clone(&schema));
        store.upsert(&Record::parse(&schema, "stb1|the matrix|warner bros|2014-04-01|4.00|1:30").unwrap()).unwrap();

        let result = ql::execute_query(&mut store, "-s title,rev").unwrap();
        let output = TableFormatter { colored: false }.format_table(&result).unwrap();

        assert!(output.contains("title"));
        assert!(output.contains("the matrix"));
        assert!(output.contains("4.00"));
        assert!(output.ends_with("1 row(s)"));
    }
}
