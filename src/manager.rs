//! Datastore facade
//!
//! [`Datastore`] ties a [`Store`] to an [`Authenticator`]. Clients connect
//! to obtain credentials, and every data operation checks them before
//! touching the store.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::auth::{Authenticator, Credentials};
use crate::core::errors::{Result, StoreError};
use crate::core::record::Record;
use crate::core::schema::{Schema, FIELD_DELIMITER};
use crate::core::store::Store;
use crate::ql::{self, Table};

/// Outcome of importing a batch of lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Lines written to the store, counting overwrites
    pub imported: usize,
    /// Non-blank lines rejected before reaching the store
    pub skipped: usize,
}

/// An authenticated datastore over a record store
pub struct Datastore<S: Store, A: Authenticator> {
    store: S,
    authenticator: A,
}

impl<S: Store, A: Authenticator> Datastore<S, A> {
    /// Create a datastore and connect `store` to `path`
    pub fn new(mut store: S, authenticator: A, path: &str) -> Result<Self> {
        store.connect(path)?;
        Ok(Datastore { store, authenticator })
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Schema of the stored records
    pub fn schema(&self) -> &Arc<Schema> {
        self.store.schema()
    }

    /// Open a client session
    pub fn connect(&mut self, client_id: &str, secret: &str) -> Result<Credentials> {
        self.authenticator.connect(client_id, secret)
    }

    /// Close a client session
    pub fn disconnect(&mut self, credentials: &Credentials) {
        self.authenticator.disconnect(credentials);
    }

    /// Check that `credentials` belong to an open session
    pub fn authenticate(&self, credentials: &Credentials) -> Result<()> {
        if self.authenticator.authenticate(credentials) {
            Ok(())
        } else {
            Err(StoreError::Unauthorized(format!(
                "{}: unknown token {}",
                credentials.client_id, credentials.token
            )))
        }
    }

    /// Import every line of the file at `path`
    pub fn import_file<P: AsRef<Path>>(&mut self, credentials: &Credentials, path: P) -> Result<ImportReport> {
        self.authenticate(credentials)?;

        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| StoreError::StoreUnavailable(format!("Unable to open file {}: {}", path.display(), e)))?;

        info!("Importing {}", path.display());
        self.import_reader(credentials, BufReader::new(file))
    }

    /// Import delimited lines from `reader`
    ///
    /// Blank lines are ignored. Lines that are not UTF-8, have too many
    /// fields or hold values the schema rejects are skipped. A failed write aborts the import.
    pub fn import_reader<R: BufRead>(&mut self, credentials: &Credentials, reader: R) -> Result<ImportReport> {
        self.authenticate(credentials)?;

        let schema = Arc::clone(self.store.schema());
        let mut report = ImportReport::default();

        for (number, bytes) in reader.split(b'\n').enumerate() {
            let line = match String::from_utf8(bytes?) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Skipping line {}: {}", number + 1, e);
                    report.skipped += 1;
                    continue;
                },
            };
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let tokens = line.split(FIELD_DELIMITER).count();
            if tokens > schema.len() {
                warn!("Skipping line {}: {} fields, expected at most {}", number + 1, tokens, schema.len());
                report.skipped += 1;
                continue;
            }

            let record = Record::parse(&schema, line)?;
            if let Err(e) = schema.validate(&record) {
                warn!("Skipping line {}: {}", number + 1, e);
                report.skipped += 1;
                continue;
            }

            self.store.upsert(&record)?;
            report.imported += 1;
        }

        self.store.flush()?;
        info!("Imported {} records, skipped {}", report.imported, report.skipped);
        Ok(report)
    }

    /// Run a query string
    pub fn query(&mut self, credentials: &Credentials, query: &str) -> Result<Table> {
        self.authenticate(credentials)?;
        debug!("Query {:?} from client {}", query, credentials.client_id);
        ql::execute_query(&mut self.store, query)
    }

    /// Look a record up by composite key
    pub fn get(&self, credentials: &Credentials, key: &str) -> Result<Option<Record>> {
        self.authenticate(credentials)?;
        Ok(self.store.get_by_key(key))
    }

    /// Delete a record by composite key, returning whether one existed
    pub fn delete(&mut self, credentials: &Credentials, key: &str) -> Result<bool> {
        self.authenticate(credentials)?;
        let deleted = self.store.delete(key)?;
        if deleted {
            self.store.flush()?;
        }
        Ok(deleted)
    }

    /// Flush and release the store
    pub fn close(&mut self) -> Result<()> {
        if self.store.is_connected() {
            self.store.flush()?;
            self.store.disconnect();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    use crate::auth::TokenAuthenticator;
    use crate::storage::PersistentStore;

    type TestDatastore = Datastore<PersistentStore, TokenAuthenticator>;

    fn open(path: &Path) -> (TestDatastore, Credentials) {
        let store = PersistentStore::new(Arc::new(Schema::media_views()));
        let mut datastore = Datastore::new(store, TokenAuthenticator::new(), path.to_str().unwrap()).unwrap();
        let credentials = datastore.connect("local", "secret").unwrap();
        (datastore, credentials)
    }

    fn import(datastore: &mut TestDatastore, credentials: &Credentials, data: &str) -> ImportReport {
        datastore.import_reader(credentials, Cursor::new(data.to_string())).unwrap()
    }

    #[test]
    fn test_import_deduplicates_by_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("datastore.sds");
        let (mut datastore, credentials) = open(&path);

        let report = import(
            &mut datastore,
            &credentials,
            "A|T1|P|2020-01-01|1.00|1:00\nA|T1|P|2020-01-01|2.00|2:00\n",
        );
        assert_eq!(report, ImportReport { imported: 2, skipped: 0 });

        let record = datastore.get(&credentials, "AT12020-01-01").unwrap().unwrap();
        assert_eq!(record.get_field("rev").unwrap(), "2.00");
        assert_eq!(fs::read_to_string(&path).unwrap(), "A|T1|P|2020-01-01|2.00|2:00\n");
    }

    #[test]
    fn test_import_file_skips_bad_lines() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("views.txt");
        fs::write(
            &input,
            "stb1|the matrix|warner bros|2014-04-01|4.00|1:30\r\n\
             \n\
             stb1|too|many|2014-04-01|4.00|1:30|extra\n\
             stb2|bad date|warner bros|April 1st|4.00|1:30\n\
             stb3|bad rev|warner bros|2014-04-01|four|1:30\n\
             stb4|unbreakable|buena vista|2014-04-03|6.00|2:05\n",
        )
        .unwrap();

        let (mut datastore, credentials) = open(&dir.path().join("datastore.sds"));
        let report = datastore.import_file(&credentials, &input).unwrap();

        assert_eq!(report, ImportReport { imported: 2, skipped: 3 });
        assert_eq!(datastore.query(&credentials, "-s stb -o stb").unwrap().lines(), vec!["stb1", "stb4"]);
    }

    #[test]
    fn test_import_skips_invalid_utf8_line() {
        let dir = tempdir().unwrap();
        let (mut datastore, credentials) = open(&dir.path().join("datastore.sds"));

        let mut data = b"A|T1|P|2020-01-01|1.00|1:00\nB|".to_vec();
        data.extend_from_slice(&[0xff, 0xfe]);
        data.extend_from_slice(b"|P|2020-01-01|1.00|1:00\nC|T1|P|2020-01-01|1.00|1:00\n");

        let report = datastore.import_reader(&credentials, Cursor::new(data)).unwrap();
        assert_eq!(report, ImportReport { imported: 2, skipped: 1 });
        assert_eq!(datastore.query(&credentials, "-s stb -o stb").unwrap().lines(), vec!["A", "C"]);
    }

    #[test]
    fn test_import_skips_overflowing_duration() {
        let dir = tempdir().unwrap();
        let (mut datastore, credentials) = open(&dir.path().join("datastore.sds"));

        let report = import(
            &mut datastore,
            &credentials,
            "A|T1|P|2020-01-01|1.00|999999999999999999:00\nB|T1|P|2020-01-01|1.00|1:00\n",
        );
        assert_eq!(report, ImportReport { imported: 1, skipped: 1 });
    }

    #[test]
    fn test_import_missing_file() {
        let dir = tempdir().unwrap();
        let (mut datastore, credentials) = open(&dir.path().join("datastore.sds"));

        assert!(matches!(
            datastore.import_file(&credentials, dir.path().join("missing.txt")),
            Err(StoreError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_query_scenarios() {
        let dir = tempdir().unwrap();
        let (mut datastore, credentials) = open(&dir.path().join("datastore.sds"));
        import(
            &mut datastore,
            &credentials,
            "A|T1|P|2020-01-01|1.00|1:00\nB|T1|P|2020-01-01|2.00|1:00\nA|T2|P|2020-01-02|3.00|1:00\n",
        );

        let table = datastore.query(&credentials, "-s title,date -f title=\"T1\"").unwrap();
        assert_eq!(table.lines(), vec!["T1,2020-01-01", "T1,2020-01-01"]);

        let table = datastore.query(&credentials, "-s title,rev:sum -g title").unwrap();
        assert_eq!(table.lines(), vec!["T1,3.00", "T2,3.00"]);

        assert!(matches!(datastore.query(&credentials, "-z foo"), Err(StoreError::UnknownCommand(_))));
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("datastore.sds");
        let (mut datastore, credentials) = open(&path);
        import(&mut datastore, &credentials, "A|T1|P|2020-01-01|1.00|1:00\nB|T1|P|2020-01-01|2.00|1:00\n");

        assert!(datastore.delete(&credentials, "AT12020-01-01").unwrap());
        assert!(!datastore.delete(&credentials, "AT12020-01-01").unwrap());
        assert!(datastore.get(&credentials, "AT12020-01-01").unwrap().is_none());
        assert_eq!(fs::read_to_string(&path).unwrap(), "B|T1|P|2020-01-01|2.00|1:00\n");
    }

    #[test]
    fn test_operations_require_credentials() {
        let dir = tempdir().unwrap();
        let (mut datastore, credentials) = open(&dir.path().join("datastore.sds"));
        datastore.disconnect(&credentials);

        assert!(matches!(datastore.authenticate(&credentials), Err(StoreError::Unauthorized(_))));
        assert!(matches!(datastore.query(&credentials, "-s title"), Err(StoreError::Unauthorized(_))));
        assert!(matches!(datastore.get(&credentials, "x"), Err(StoreError::Unauthorized(_))));
        assert!(matches!(datastore.delete(&credentials, "x"), Err(StoreError::Unauthorized(_))));
        assert!(matches!(
            datastore.import_reader(&credentials, Cursor::new("A|T1")),
            Err(StoreError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_reopen_reads_existing_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("datastore.sds");

        let (mut datastore, credentials) = open(&path);
        import(&mut datastore, &credentials, "A|T1|P|2020-01-01|1.00|1:00\n");
        datastore.close().unwrap();
        assert!(!datastore.store().is_connected());

        let (mut datastore, credentials) = open(&path);
        assert_eq!(datastore.query(&credentials, "-s stb,title").unwrap().lines(), vec!["A,T1"]);

        // The index only holds records written in this session
        assert!(datastore.get(&credentials, "AT12020-01-01").unwrap().is_none());
        import(&mut datastore, &credentials, "A|T1|P|2020-01-01|5.00|1:00\n");
        assert_eq!(datastore.store().get_by_key("AT12020-01-01").unwrap().get_field("rev").unwrap(), "5.00");
        assert_eq!(fs::read_to_string(&path).unwrap(), "A|T1|P|2020-01-01|5.00|1:00\n");
    }
}
