use anyhow::Result;
use colored::*;
use flatstore::{Record, Table};

use crate::formatters::Formatter;

/// Plain text formatter using the display form of records
pub struct TextFormatter {
    /// Whether messages are coloured
    colored: bool,
}

impl TextFormatter {
    pub fn new() -> Self {
        TextFormatter { colored: true }
    }
}

impl Formatter for TextFormatter {
    fn format_table(&self, table: &Table) -> Result<String> {
        if table.is_empty() {
            return Ok(self.format_info("No rows"));
        }
        Ok(table.lines().join("\n"))
    }

    fn format_record(&self, record: &Record) -> Result<String> {
        Ok(record.to_string())
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
    fn test_format_table_lines() {
        let schema = Arc::new(Schema::media_views());
        let mut store = MemoryStore::new(Arc::clone(&schema));
        store.upsert(&Record::parse(&schema, "stb1|the matrix|warner bros|2014-04-01|4.00|1:30").unwrap()).unwrap();

        let table = ql::execute_query(&mut store, "-s title,rev").unwrap();
        let formatter = TextFormatter { colored: false };
        assert_eq!(formatter.format_table(&table).unwrap(), "the matrix,4.00");

        let empty = ql::execute_query(&mut store, "-s title -f title=\"x\"").unwrap();
        assert_eq!(formatter.format_table(&empty).unwrap(), "Info: No rows");
    }
}
