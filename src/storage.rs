use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use tempfile::NamedTempFile;

use crate::errors::StorageError;

/// Durable, device-scoped string storage, in the manner of a
/// browser's local storage.
pub trait KeyValueStorage: Send + Sync {
    /// Gets the value stored under the given key, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrites the value stored under the given key.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Overwrites several keys at once. Either every value is stored or
    /// none is.
    fn set_all(&self, updates: &[(&str, &str)]) -> Result<(), StorageError>;
}

type Entries = BTreeMap<String, String>;

/// Storage kept as a single JSON object on disk. Every write replaces
/// the file atomically.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Creates a new instance. The file and its parent directories are
    /// created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStorage { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Entries, StorageError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(source) => return Err(StorageError::Io { source }),
        };

        serde_json::from_slice(&raw).map_err(|source| StorageError::Serialization { source })
    }

    fn persist(&self, entries: &Entries) -> Result<(), StorageError> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        fs::create_dir_all(&directory).map_err(|source| StorageError::Io { source })?;

        let mut file =
            NamedTempFile::new_in(&directory).map_err(|source| StorageError::Io { source })?;
        let contents = serde_json::to_vec_pretty(entries)
            .map_err(|source| StorageError::Serialization { source })?;

        file.write_all(&contents)
            .map_err(|source| StorageError::Io { source })?;
        file.persist(&self.path)
            .map_err(|source| StorageError::Persist { source })?;

        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_all(&[(key, value)])
    }

    fn set_all(&self, updates: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut entries = match self.load() {
            Ok(entries) => entries,
            // a corrupt file is replaced rather than left to block every write
            Err(StorageError::Serialization { .. }) => Entries::new(),
            Err(e) => return Err(e),
        };

        for (key, value) in updates {
            entries.insert((*key).to_owned(), (*value).to_owned());
        }

        self.persist(&entries)
    }
}

/// Storage that lives only as long as the process.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<Entries>,
    read_only: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, like a full or disabled
    /// browser storage.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_all(&[(key, value)])
    }

    fn set_all(&self, updates: &[(&str, &str)]) -> Result<(), StorageError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::ReadOnly);
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        for (key, value) in updates {
            entries.insert((*key).to_owned(), (*value).to_owned());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{FileStorage, KeyValueStorage, MemoryStorage};
    use crate::errors::StorageError;

    #[test]
    fn file_storage_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get("theme").unwrap(), None);

        storage.set("theme", "dark").unwrap();
        storage.set("review_submission_count", "2").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(
            reopened.get("review_submission_count").unwrap().as_deref(),
            Some("2")
        );
    }

    #[test]
    fn corrupt_files_fail_reads_and_are_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, b"{not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get("anything"),
            Err(StorageError::Serialization { .. })
        ));

        storage.set("key", "value").unwrap();
        assert_eq!(storage.get("key").unwrap().as_deref(), Some("value"));
    }

    #[test]
    fn unreadable_files_fail_writes_instead_of_being_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::create_dir(&path).unwrap();

        let storage = FileStorage::new(&path);

        assert!(matches!(storage.get("key"), Err(StorageError::Io { .. })));
        assert!(matches!(
            storage.set("key", "value"),
            Err(StorageError::Io { .. })
        ));
        assert!(path.is_dir());
    }

    #[test]
    fn several_keys_are_written_together() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let storage = FileStorage::new(&path);
        storage.set("theme", "light").unwrap();
        storage
            .set_all(&[("review_submitted_email", "amy@x.com"), ("review_submission_count", "2")])
            .unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("light"));
        assert_eq!(
            reopened.get("review_submitted_email").unwrap().as_deref(),
            Some("amy@x.com")
        );
        assert_eq!(
            reopened.get("review_submission_count").unwrap().as_deref(),
            Some("2")
        );
    }

    #[test]
    fn read_only_memory_storage_rejects_writes() {
        let storage = MemoryStorage::new();
        storage.set("key", "one").unwrap();
        storage.set_read_only(true);

        assert!(matches!(storage.set("key", "two"), Err(StorageError::ReadOnly)));
        assert_eq!(storage.get("key").unwrap().as_deref(), Some("one"));
    }
}
