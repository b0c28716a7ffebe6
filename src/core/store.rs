use std::io::BufRead;
use std::sync::Arc;

use crate::core::errors::Result;
use crate::core::record::Record;
use crate::core::schema::Schema;

/// Trait defining the core operations of a record store
///
/// A store keeps at most one record per composite key. Callers sharing a
/// store between threads must serialise access themselves.
pub trait Store {
    /// Open the backing storage; a no-op when already connected
    fn connect(&mut self, connection: &str) -> Result<()>;

    /// Release the backing storage
    fn disconnect(&mut self);

    /// Whether the store is currently connected
    fn is_connected(&self) -> bool;

    /// Schema of the records held by the store
    fn schema(&self) -> &Arc<Schema>;

    /// Look a record up in the in-memory index only
    fn get_by_key(&self, key: &str) -> Option<Record>;

    /// Create or overwrite the record with the same composite key
    fn upsert(&mut self, record: &Record) -> Result<()>;

    /// Create a record
    fn create(&mut self, record: &Record) -> Result<()> {
        self.upsert(record)
    }

    /// Update a record
    fn update(&mut self, record: &Record) -> Result<()> {
        self.upsert(record)
    }

    /// Delete the record with the given key, returning whether one existed
    fn delete(&mut self, key: &str) -> Result<bool>;

    /// Sequential view over every stored record, from the beginning
    fn records(&mut self) -> Result<RecordStream<'_>>;

    /// Count the records currently stored
    fn count(&mut self) -> Result<usize> {
        self.records()?.try_fold(0, |count, record| record.map(|_| count + 1))
    }

    /// Flush pending writes
    fn flush(&mut self) -> Result<()>;
}

/// Lazily parses records from a line-oriented reader
///
/// Lines that parse to an empty record are skipped.
pub struct RecordStream<'a> {
    reader: Box<dyn BufRead + 'a>,
    schema: Arc<Schema>,
    line: String,
}

impl<'a> RecordStream<'a> {
    /// Create a stream over `reader`
    pub fn new<R: BufRead + 'a>(reader: R, schema: Arc<Schema>) -> Self {
        RecordStream {
            reader: Box::new(reader),
            schema,
            line: String::new(),
        }
    }
}

impl Iterator for RecordStream<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {
                    let text = self.line.trim_end_matches(|c| c == '\n' || c == '\r');
                    match Record::parse(&self.schema, text) {
                        Ok(record) if record.is_empty() => continue,
                        result => return Some(result),
                    }
                },
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_record_stream_skips_empty_lines() {
        let schema = Arc::new(Schema::media_views());
        let data = "a|t1|p|2014-04-01|1.00|1:00\n\nb|t2|p|2014-04-02|2.00|2:00\r\n";

        let records: Vec<Record> = RecordStream::new(Cursor::new(data), schema)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_field("title").unwrap(), "t1");
        assert_eq!(records[1].get_field("viewtime").unwrap(), "2:00");
    }
}
