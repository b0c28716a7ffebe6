use anyhow::Result;

use crate::context::Context;

/// Delete the record stored under `key`
pub fn execute(context: &mut Context, key: &str) -> Result<()> {
    let (datastore, credentials) = context.session();
    let message = if datastore.delete(credentials, key)? {
        context.formatter().format_success(&format!("Deleted record {}", key))
    } else {
        context.formatter().format_info(&format!("No record with key {}", key))
    };
    println!("{}", message);

    Ok(())
}
