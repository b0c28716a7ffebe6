use anyhow::Result;

use crate::context::Context;

/// Print the record stored under `key`
pub fn execute(context: &mut Context, key: &str) -> Result<()> {
    let (datastore, credentials) = context.session();
    match datastore.get(credentials, key)? {
        Some(record) => println!("{}", context.formatter().format_record(&record)?),
        None => println!("{}", context.formatter().format_info(&format!("No record with key {}", key))),
    }

    Ok(())
}
