use thiserror::Error;

/// Failures specific to the CLI front end
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Unknown command: .{0}")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Unknown output format: {0}")]
    UnknownFormat(String),
}
