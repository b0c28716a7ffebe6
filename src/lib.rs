//! Flatstore: a flat-file record store with a small query language
//!
//! Records are delimited lines following a [`Schema`]. The store keeps one
//! record per composite key inside a single file, overwriting in place or
//! appending, and answers queries such as `-s title,rev:sum -g title`.
//!
//! ```no_run
//! use std::sync::Arc;
//! use flatstore::{Datastore, PersistentStore, Schema, TokenAuthenticator};
//!
//! # fn main() -> flatstore::Result<()> {
//! let store = PersistentStore::new(Arc::new(Schema::media_views()));
//! let mut datastore = Datastore::new(store, TokenAuthenticator::new(), "./datastore.sds")?;
//! let credentials = datastore.connect("local", "secret")?;
//!
//! datastore.import_file(&credentials, "views.txt")?;
//! for row in datastore.query(&credentials, "-s title,rev:sum -g title")?.rows {
//!     println!("{}", row);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod core;
pub mod manager;
pub mod ql;
pub mod storage;

pub use crate::auth::{Authenticator, Credentials, TokenAuthenticator};
pub use crate::config::Config;
pub use crate::core::{FieldDef, FieldKind, Record, Result, Schema, SerializeMode, Store, StoreError};
pub use crate::manager::{Datastore, ImportReport};
pub use crate::ql::Table;
pub use crate::storage::{MemoryStore, PersistentStore};
