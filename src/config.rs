//! Runtime configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, StoreError};
use crate::core::schema::Schema;

/// Default location of the datastore file
pub const DEFAULT_DATASTORE_PATH: &str = "./datastore.sds";

/// Settings for opening a datastore and running the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the flat file holding the records
    pub datastore_path: PathBuf,
    /// Write log output here instead of stderr
    pub log_file: Option<PathBuf>,
    /// JSON schema file; the media-view schema is used when absent
    pub schema_path: Option<PathBuf>,
    /// Client id presented to the authenticator
    pub client_id: String,
    /// File the REPL history is kept in
    pub history_path: PathBuf,
    /// Maximum number of REPL history entries
    pub history_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            datastore_path: PathBuf::from(DEFAULT_DATASTORE_PATH),
            log_file: None,
            schema_path: None,
            client_id: "local".to_string(),
            history_path: PathBuf::from("flatstore_history.txt"),
            history_size: 1000,
        }
    }
}

impl Config {
    /// Read a configuration from a JSON file; missing keys take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("Unable to read {}: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// The schema records follow
    pub fn schema(&self) -> Result<Schema> {
        match &self.schema_path {
            Some(path) => Schema::load(path),
            None => Ok(Schema::media_views()),
        }
    }

    /// The datastore path as the string a store connects to
    pub fn connection(&self) -> Result<&str> {
        self.datastore_path.to_str().ok_or_else(|| {
            StoreError::Config(format!("datastore path {} is not valid UTF-8", self.datastore_path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.connection().unwrap(), "./datastore.sds");
        assert_eq!(config.client_id, "local");
        assert_eq!(config.schema().unwrap(), Schema::media_views());
    }

    #[test]
    fn test_load_partial_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("flatstore.json");
        fs::write(&path, r#"{"datastore_path": "/tmp/views.sds", "history_size": 10}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.datastore_path, PathBuf::from("/tmp/views.sds"));
        assert_eq!(config.history_size, 10);
        assert_eq!(config.client_id, "local");

        assert!(matches!(Config::load(dir.path().join("missing.json")), Err(StoreError::Config(_))));
        fs::write(&path, "not json").unwrap();
        assert!(matches!(Config::load(&path), Err(StoreError::Json(_))));
    }
}
