//! Query language for flatstore
//!
//! Queries are short command strings such as `-s title,rev:sum -g title`.
//! Commands run in the order they are written: `-s` selects and projects
//! fields, `-f` filters rows, `-o` orders them and `-g` groups them,
//! folding the other selected fields with their aggregate.

pub mod aggregate;
pub mod ast;
pub mod evaluator;
pub mod executor;
pub mod parser;

use crate::core::errors::Result;
use crate::core::store::Store;
pub use executor::Table;

/// Execute a query string on the given store
pub fn execute_query<S: Store + ?Sized>(store: &mut S, query_str: &str) -> Result<Table> {
    // Parse the query
    let query = parser::parse_query(query_str)?;

    // Execute the query
    executor::execute_query(store, &query)
}
