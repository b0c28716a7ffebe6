pub mod formatter;
pub mod json;
pub mod table;
pub mod text;

pub use formatter::Formatter;
use clap::ValueEnum;

/// Available output formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One comma-separated line per row
    Text,

    /// JSON array of objects
    Json,

    /// Bordered table
    Table,
}
