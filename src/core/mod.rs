pub mod errors;
pub mod schema;
pub mod record;
pub mod store;


pub use errors::{Result, StoreError};
pub use schema::{FieldDef, FieldKind, Schema};
pub use record::{Record, SerializeMode};
pub use store::{RecordStream, Store};
