use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::context::Context;

/// Run the import command
pub fn execute(context: &mut Context, files: &[PathBuf]) -> Result<()> {
    for file in files {
        let (datastore, credentials) = context.session();
        let report = datastore
            .import_file(credentials, file)
            .with_context(|| format!("Import of {} failed", file.display()))?;

        let message = format!(
            "Imported {} records from {} ({} skipped)",
            report.imported,
            file.display(),
            report.skipped
        );
        println!("{}", context.formatter().format_success(&message));
    }

    Ok(())
}
