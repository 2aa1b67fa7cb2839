//! String key/value persistence for the document library.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::MdbaseError;

/// A synchronous string store, shaped like browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, MdbaseError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), MdbaseError>;
    fn del(&mut self, key: &str) -> Result<(), MdbaseError>;
    fn clear(&mut self) -> Result<(), MdbaseError>;
}

/// In-memory store, used in tests and for throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, MdbaseError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), MdbaseError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn del(&mut self, key: &str) -> Result<(), MdbaseError> {
        self.entries.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), MdbaseError> {
        self.entries.clear();
        Ok(())
    }
}

/// A store persisted as a single pretty-printed JSON object.
///
/// Every write flushes the whole map back to disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MdbaseError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "store file missing, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), MdbaseError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, MdbaseError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), MdbaseError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn del(&mut self, key: &str) -> Result<(), MdbaseError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), MdbaseError> {
        self.entries.clear();
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_survives_reopen() {
        let path = std::env::temp_dir()
            .join(format!("mdbase-store-{}", rand::random::<u32>()))
            .join("documents.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v".into()).unwrap();
        store.set("gone", "x".into()).unwrap();
        store.del("gone").unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(reopened.get("gone").unwrap(), None);
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn memory_store_clear() {
        let mut store = MemoryStore::new();
        store.set("a", "1".into()).unwrap();
        store.clear().unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }
}
