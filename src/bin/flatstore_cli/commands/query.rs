use anyhow::Result;

use crate::context::Context;

/// Run a query and print the result table
pub fn execute(context: &mut Context, query: &str) -> Result<()> {
    let (datastore, credentials) = context.session();
    let table = datastore.query(credentials, query)?;

    // Format and print the rows
    let formatted = context.formatter().format_table(&table)?;
    println!("{}", formatted);

    Ok(())
}
