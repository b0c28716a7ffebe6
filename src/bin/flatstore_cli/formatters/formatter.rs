use anyhow::Result;
use flatstore::{Record, Table};

/// Renders query results and messages for the terminal
pub trait Formatter {
    /// Format the rows of a query result
    fn format_table(&self, table: &Table) -> Result<String>;

    /// Format a single stored record
    fn format_record(&self, record: &Record) -> Result<String>;

    /// Format an error message
    fn format_error(&self, error: &str) -> String;

    /// Format an information message
    fn format_info(&self, info: &str) -> String;

    /// Format a success message
    fn format_success(&self, success: &str) -> String;
}
