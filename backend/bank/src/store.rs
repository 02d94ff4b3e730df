//! # Store
//!
//! Key value documents, replaced whole on every write.
//!
//! ## Keys
//! - `mindbattle_users`: every user with wallet and history
//! - `mindbattle_contests`: every contest, any status
//! - `mindbattle_settings`: signup bonus, withdrawal floor, role table
//! - `mindbattle_audit_log`: admin actions, newest first
//!
//! There are no partial updates and no schema versions. Old documents are
//! brought forward by the migrations in [`crate::state`] when loaded.
use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;

pub const USERS_KEY: &str = "mindbattle_users";
pub const CONTESTS_KEY: &str = "mindbattle_contests";
pub const SETTINGS_KEY: &str = "mindbattle_settings";
pub const AUDIT_LOG_KEY: &str = "mindbattle_audit_log";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt document {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait Store {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

#[derive(Default, Debug, Clone)]
pub struct MemoryStore {
    documents: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.documents.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.documents.insert(key.to_string(), value);
        Ok(())
    }
}

/// One `<key>.json` file per document inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path(key);
        let staging = path.with_extension("json.tmp");

        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;

        debug!("Wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert!(store.get(USERS_KEY).unwrap().is_none());

        store.put(USERS_KEY, "[]".to_string()).unwrap();
        store.put(USERS_KEY, "[1]".to_string()).unwrap();

        assert_eq!(store.get(USERS_KEY).unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path().join("data")).unwrap();

        assert!(store.get(CONTESTS_KEY).unwrap().is_none());

        store.put(CONTESTS_KEY, "[]".to_string()).unwrap();
        assert_eq!(store.get(CONTESTS_KEY).unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("data").join("mindbattle_contests.json").exists());

        let reopened = FileStore::open(dir.path().join("data")).unwrap();
        assert_eq!(reopened.get(CONTESTS_KEY).unwrap().as_deref(), Some("[]"));
    }
}
