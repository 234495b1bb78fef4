//! Durable storage for validated proxy records

use crate::proxy::models::ProxyRecord;
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A store read in full before a batch and written in full after it
pub trait ProxyStore {
    fn load(&self) -> Result<Vec<ProxyRecord>>;
    fn save(&self, records: &[ProxyRecord]) -> Result<()>;
}

/// Store backed by a single JSON array on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProxyStore for JsonFileStore {
    /// Load all records, creating an empty store file if none exists
    fn load(&self) -> Result<Vec<ProxyRecord>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "initializing empty store");
            self.save(&[])?;
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading store {}", self.path.display()))?;
        let records: Vec<ProxyRecord> = serde_json::from_str(&content)
            .with_context(|| format!("parsing store {}", self.path.display()))?;
        Ok(records)
    }

    fn save(&self, records: &[ProxyRecord]) -> Result<()> {
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        records.serialize(&mut ser)?;

        fs::write(&self.path, buf)
            .with_context(|| format!("writing store {}", self.path.display()))?;
        debug!(path = %self.path.display(), count = records.len(), "saved store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::Speed;

    fn sample() -> Vec<ProxyRecord> {
        vec![
            ProxyRecord {
                ip: "5.6.7.8:80".to_string(),
                country: "US".to_string(),
                city: "Ashburn".to_string(),
                speed: Speed::Seconds(0.05),
            },
            ProxyRecord {
                ip: "9.9.9.9:3128".to_string(),
                country: "DE".to_string(),
                city: "Berlin".to_string(),
                speed: Speed::Fail,
            },
        ]
    }

    #[test]
    fn test_load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxies.json");
        let store = JsonFileStore::new(&path);

        assert!(store.load().unwrap().is_empty());
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("proxies.json"));

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("proxies.json"));

        store.save(&sample()).unwrap();
        store.save(&sample()[..1]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_saved_document_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("proxies.json"));
        store.save(&sample()).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("\n    {\n        \"ip\": \"5.6.7.8:80\""));
        assert!(content.contains("\"speed\": \"fail\""));
    }

    #[test]
    fn test_load_corrupt_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxies.json");
        fs::write(&path, "{not json").unwrap();

        assert!(JsonFileStore::new(&path).load().is_err());
    }
}
