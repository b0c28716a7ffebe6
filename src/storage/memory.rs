//! In-memory store for flatstore
//!
//! This module provides a simple in-memory implementation of the
//! [`Store`] trait with the same dedup semantics as the file-backed store.
//! It is mainly useful as a test double.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use crate::core::errors::{Result, StoreError};
use crate::core::record::{Record, SerializeMode};
use crate::core::schema::{check_storable, Schema};
use crate::core::store::{RecordStream, Store};

/// An in-memory store keeping records in insertion order
#[derive(Debug)]
pub struct MemoryStore {
    schema: Arc<Schema>,
    connected: bool,
    /// Records in storage order
    records: Vec<Record>,
    /// Write-through cache of records by composite key
    index: HashMap<String, Record>,
}

impl MemoryStore {
    /// Create a new, connected, empty memory store
    pub fn new(schema: Arc<Schema>) -> Self {
        MemoryStore {
            schema,
            connected: true,
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(StoreError::StoreUnavailable("datastore is not connected".to_string()))
        }
    }
}

impl Store for MemoryStore {
    fn connect(&mut self, _connection: &str) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.index.clear();
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn get_by_key(&self, key: &str) -> Option<Record> {
        self.index.get(key).cloned()
    }

    fn upsert(&mut self, record: &Record) -> Result<()> {
        if record.is_empty() {
            return Ok(());
        }
        self.ensure_connected()?;
        for (field, value) in self.schema.field_names().zip(record.values()) {
            check_storable(field, value)?;
        }

        let key = record.key();
        match self.records.iter().position(|r| r.key() == key) {
            Some(i) => self.records[i] = record.clone(),
            None => self.records.push(record.clone()),
        }

        self.index.insert(key, record.clone());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        if key.is_empty() {
            return Ok(false);
        }
        self.ensure_connected()?;

        let cached = self.index.remove(key).is_some();
        let before = self.records.len();
        self.records.retain(|r| r.key() != key);

        Ok(cached || self.records.len() != before)
    }

    fn records(&mut self) -> Result<RecordStream<'_>> {
        self.ensure_connected()?;

        let mut data = String::new();
        for record in &self.records {
            data.push_str(&record.serialize(SerializeMode::Storage));
            data.push('\n');
        }

        Ok(RecordStream::new(Cursor::new(data), Arc::clone(&self.schema)))
    }

    fn flush(&mut self) -> Result<()> {
        // No-op for in-memory store
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_delete() {
        let schema = Arc::new(Schema::media_views());
        let mut store = MemoryStore::new(Arc::clone(&schema));

        store.upsert(&Record::parse(&schema, "A|T1|P|2020-01-01|1.00|1:00").unwrap()).unwrap();
        store.upsert(&Record::parse(&schema, "A|T1|P|2020-01-01|2.00|1:00").unwrap()).unwrap();
        store.upsert(&Record::parse(&schema, "B|T1|P|2020-01-01|2.00|1:00").unwrap()).unwrap();
        assert_eq!(store.count().unwrap(), 2);

        let first = store.records().unwrap().next().unwrap().unwrap();
        assert_eq!(first.get_field("rev").unwrap(), "2.00");

        assert!(store.delete("AT12020-01-01").unwrap());
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.get_by_key("AT12020-01-01").is_none());
    }
}
