mod app;
mod commands;
mod context;
mod formatters;
mod repl;
mod utils;

use std::fs::File;

use anyhow::{Context as _, Result};
use clap::Parser;
use env_logger::{Builder, Target};
use log::{info, LevelFilter};

use crate::app::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;

    // Initialise the logger
    init_logger(cli.verbose, config.log_file.as_deref())?;

    info!("Starting flatstore CLI");

    // Run the application
    let result = app::run(cli, config);

    info!("Stopping flatstore CLI");

    result
}

/// Log at a level chosen by `-v`, overridable by `RUST_LOG`
fn init_logger(verbosity: u8, log_file: Option<&std::path::Path>) -> Result<()> {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = Builder::new();
    builder.filter_level(level).parse_default_env();

    if let Some(path) = log_file {
        let file = File::create(path)
            .with_context(|| format!("Unable to create log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;
    Ok(())
}
