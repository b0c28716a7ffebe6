//! File-backed store
//!
//! Records live one per line in a single flat file. Writes scan the file for
//! the record's composite key and either overwrite that line in place or
//! append a new one.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::core::errors::{Result, StoreError};
use crate::core::record::{Record, SerializeMode};
use crate::core::schema::{check_storable, Schema};
use crate::core::store::{RecordStream, Store};

/// Where a key lives in the backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    /// A line with the key starts at `offset` and spans `len` bytes including its terminator
    Line { offset: u64, len: u64 },
    /// No line has the key; the file ends at `offset`
    End { offset: u64, needs_terminator: bool },
}

/// A store backed by a single flat file, one `|`-delimited record per line
///
/// The file is the source of truth. The in-memory index only remembers the
/// records written through this instance and is never bulk-loaded.
pub struct PersistentStore {
    /// Schema of the stored records
    schema: Arc<Schema>,
    /// Handle on the backing file while connected
    file: Option<File>,
    /// Path of the backing file while connected
    path: Option<PathBuf>,
    /// Write-through cache of records by composite key
    index: HashMap<String, Record>,
}

impl PersistentStore {
    /// Create a disconnected store for records of `schema`
    pub fn new(schema: Arc<Schema>) -> Self {
        PersistentStore {
            schema,
            file: None,
            path: None,
            index: HashMap::new(),
        }
    }

    /// Create a store and connect it to the file at `path`
    pub fn open<P: AsRef<Path>>(schema: Arc<Schema>, path: P) -> Result<Self> {
        let mut store = Self::new(schema);
        store.connect(&path.as_ref().to_string_lossy())?;
        Ok(store)
    }

    /// Path of the backing file, if connected
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn file(&self) -> Result<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| StoreError::StoreUnavailable("datastore is not connected".to_string()))
    }

    /// Scan the file from the start for the line holding `key`
    fn locate(&self, key: &str) -> Result<Location> {
        let mut reader = BufReader::new(self.file()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut offset = 0u64;
        let mut terminated = true;
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader.read_line(&mut line)? as u64;
            if read == 0 {
                break;
            }

            let text = line.trim_end_matches(|c| c == '\n' || c == '\r');
            let candidate = Record::parse(&self.schema, text)?;
            if !candidate.is_empty() && candidate.key() == key {
                debug!("Found key {:?} at offset {}", key, offset);
                return Ok(Location::Line { offset, len: read });
            }

            offset += read;
            terminated = line.ends_with('\n');
        }

        Ok(Location::End { offset, needs_terminator: !terminated })
    }

    /// Replace `len` bytes at `offset` with `replacement`
    ///
    /// When the lengths differ, everything after the replaced span is
    /// rewritten behind the replacement and the file is resized.
    fn splice(&self, offset: u64, len: u64, replacement: &[u8]) -> Result<()> {
        let mut file = self.file()?;
        let resized = replacement.len() as u64 != len;

        let mut tail = Vec::new();
        if resized {
            file.seek(SeekFrom::Start(offset + len))?;
            file.read_to_end(&mut tail)?;
        }

        file.seek(SeekFrom::Start(offset)).map_err(write_failed)?;
        file.write_all(replacement).map_err(write_failed)?;
        if resized {
            file.write_all(&tail).map_err(write_failed)?;
            file.set_len(offset + replacement.len() as u64 + tail.len() as u64)
                .map_err(write_failed)?;
        }
        file.flush().map_err(write_failed)?;

        Ok(())
    }
}

fn write_failed(e: io::Error) -> StoreError {
    StoreError::StoreWriteFailed(e.to_string())
}

impl Store for PersistentStore {
    fn connect(&mut self, connection: &str) -> Result<()> {
        if self.file.is_some() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(connection)
            .map_err(|e| StoreError::StoreUnavailable(format!("Unable to open or create {}: {}", connection, e)))?;

        info!("Connected to datastore {}", connection);
        self.file = Some(file);
        self.path = Some(PathBuf::from(connection));
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(path) = self.path.take() {
            info!("Disconnected from datastore {}", path.display());
        }
        self.file = None;
        self.index.clear();
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
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
        if record.schema() != &self.schema {
            return Err(StoreError::MalformedRecord("record schema does not match the datastore".to_string()));
        }
        for (field, value) in self.schema.field_names().zip(record.values()) {
            check_storable(field, value)?;
        }

        let key = record.key();
        let mut line = record.serialize(SerializeMode::Storage);
        line.push('\n');

        match self.locate(&key)? {
            Location::Line { offset, len } => {
                debug!("Overwriting record {:?} at offset {}", key, offset);
                self.splice(offset, len, line.as_bytes())?;
            },
            Location::End { offset, needs_terminator } => {
                debug!("Appending record {:?} at offset {}", key, offset);
                if needs_terminator {
                    line.insert(0, '\n');
                }
                self.splice(offset, 0, line.as_bytes())?;
            },
        }

        self.index.insert(key, record.clone());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        if key.is_empty() {
            return Ok(false);
        }

        let cached = self.index.remove(key).is_some();
        let stored = match self.locate(key)? {
            Location::Line { offset, len } => {
                debug!("Removing record {:?} at offset {}", key, offset);
                self.splice(offset, len, &[])?;
                true
            },
            Location::End { .. } => false,
        };

        Ok(cached || stored)
    }

    fn records(&mut self) -> Result<RecordStream<'_>> {
        let mut file = self.file()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(RecordStream::new(BufReader::new(file), Arc::clone(&self.schema)))
    }

    fn flush(&mut self) -> Result<()> {
        self.file()?.sync_data().map_err(write_failed)
    }
}
