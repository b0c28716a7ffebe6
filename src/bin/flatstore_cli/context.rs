use std::sync::Arc;

use anyhow::{Context as _, Result};

use flatstore::{Config, Credentials, Datastore, PersistentStore, TokenAuthenticator};

use crate::formatters::json::JsonFormatter;
use crate::formatters::table::TableFormatter;
use crate::formatters::text::TextFormatter;
use crate::formatters::{Formatter, OutputFormat};

pub type CliDatastore = Datastore<PersistentStore, TokenAuthenticator>;

/// CLI execution context
pub struct Context {
    /// The open datastore
    datastore: CliDatastore,

    /// Credentials of the CLI session
    credentials: Credentials,

    /// Settings the context was built from
    config: Config,

    /// Output format
    format: OutputFormat,

    /// Current formatter
    formatter: Box<dyn Formatter>,
}

impl Context {
    /// Open the datastore and authenticate
    pub fn new(config: Config, secret: &str, format: OutputFormat) -> Result<Self> {
        let schema = config.schema().context("Unable to load the record schema")?;
        let store = PersistentStore::new(Arc::new(schema));

        let mut datastore = Datastore::new(store, TokenAuthenticator::new(), config.connection()?)?;
        let credentials = datastore
            .connect(&config.client_id, secret)
            .with_context(|| format!("Unable to connect as {}", config.client_id))?;

        Ok(Context {
            datastore,
            credentials,
            config,
            format,
            formatter: make_formatter(format),
        })
    }

    /// Datastore and session credentials together
    pub fn session(&mut self) -> (&mut CliDatastore, &Credentials) {
        (&mut self.datastore, &self.credentials)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the current formatter
    pub fn formatter(&self) -> &dyn Formatter {
        self.formatter.as_ref()
    }

    /// Set the output format
    pub fn set_format(&mut self, format: OutputFormat) {
        if format != self.format {
            self.format = format;
            self.formatter = make_formatter(format);
        }
    }

    /// End the session and release the datastore
    pub fn close(&mut self) -> Result<()> {
        self.datastore.disconnect(&self.credentials);
        self.datastore.close()?;
        Ok(())
    }
}

fn make_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new()),
        OutputFormat::Json => Box::new(JsonFormatter::new()),
        OutputFormat::Table => Box::new(TableFormatter::new()),
    }
}
