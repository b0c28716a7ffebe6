pub mod delete;
pub mod get;
pub mod import;
pub mod query;
