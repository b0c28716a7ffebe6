use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use flatstore::Config;

use crate::commands;
use crate::context::Context;
use crate::formatters::OutputFormat;
use crate::repl::Repl;

#[derive(Parser)]
#[command(name = "flatstore")]
#[command(about = "Flat-file record store with a small query language", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format (text, json, table)
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Interactive mode (REPL)
    #[arg(short, long)]
    interactive: bool,

    /// JSON configuration file; flags given on the command line take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the datastore file [default: ./datastore.sds]
    #[arg(short, long)]
    datastore: Option<PathBuf>,

    /// JSON file describing the record schema
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Client id used to authenticate [default: local]
    #[arg(long)]
    client_id: Option<String>,

    /// Client secret used to authenticate
    #[arg(long, default_value = "flatstore")]
    secret: String,

    /// Command to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import delimited records from one or more files
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Run a query such as "-s title,rev:sum -g title"
    Query {
        /// Query to run
        #[arg(allow_hyphen_values = true)]
        query: String,
    },

    /// Show the record stored under a composite key
    Get {
        /// Composite key
        key: String,
    },

    /// Delete the record stored under a composite key
    Delete {
        /// Composite key
        key: String,
    },
}

impl Cli {
    /// Settings from the configuration file, overridden by explicit flags
    pub fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Unable to load configuration {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(datastore) = &self.datastore {
            config.datastore_path = datastore.clone();
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
        if let Some(schema) = &self.schema {
            config.schema_path = Some(schema.clone());
        }
        if let Some(client_id) = &self.client_id {
            config.client_id = client_id.clone();
        }

        Ok(config)
    }
}

/// Run the CLI
pub fn run(cli: Cli, config: Config) -> Result<()> {
    let mut context = Context::new(config, &cli.secret, cli.format)?;

    // Run the given command, then the REPL if asked for or if there was none
    let interactive = cli.interactive || cli.command.is_none();
    let result = match cli.command {
        Some(Commands::Import { files }) => commands::import::execute(&mut context, &files),
        Some(Commands::Query { query }) => commands::query::execute(&mut context, &query),
        Some(Commands::Get { key }) => commands::get::execute(&mut context, &key),
        Some(Commands::Delete { key }) => commands::delete::execute(&mut context, &key),
        None => Ok(()),
    };

    if interactive && result.is_ok() {
        let mut repl = Repl::new(context)?;
        return repl.run();
    }

    context.close()?;
    result
}
