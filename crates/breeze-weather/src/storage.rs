//! Key-value persistence layer.
//!
//! Stores raw bytes under string keys. The location store and forecast cache
//! serialize their collections to JSON and keep each under a single key.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use crate::types::StorageError;

/// Durable key-value storage.
///
/// Implementations must be safe to share between tasks; callers still
/// serialize read-modify-write sequences themselves.
pub trait KeyValueStorage: Send + Sync {
    /// Read the bytes stored under `key`. `Ok(None)` means never written.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace whatever is stored under `key`.
    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;
}

/// Storage handle shared by the location store and the forecast cache.
pub type SharedStorage = Arc<dyn KeyValueStorage>;

/// Read and deserialize a JSON document. Unparseable bytes are `Corrupt`.
pub fn read_json<T: DeserializeOwned>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match storage.read(key)? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::corrupt(key, e)),
        None => Ok(None),
    }
}

/// Serialize `value` as JSON and write it under `key`.
pub fn write_json<T: Serialize + ?Sized>(
    storage: &dyn KeyValueStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StorageError::write(key, e))?;
    storage.write(key, &bytes)
}

/// In-process storage. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStorage {
        Arc::new(Self::new())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        valid.then(|| self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self
            .path_for(key)
            .ok_or_else(|| StorageError::read(key, "invalid storage key"))?;

        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::read(key, e)),
        }
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let path = self
            .path_for(key)
            .ok_or_else(|| StorageError::write(key, "invalid storage key"))?;

        fs::create_dir_all(&self.dir).map_err(|e| StorageError::write(key, e))?;

        // Write atomically via temp file
        let temp_path = path.with_extension("tmp");
        let write_temp = || -> std::io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(value)?;
            file.sync_all()?;
            fs::rename(&temp_path, &path)
        };
        write_temp().map_err(|e| StorageError::write(key, e))?;

        tracing::debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

/// Single-table SQLite storage.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open or create the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| StorageError::read("sqlite", e))?;
        Self::with_connection(conn)
    }

    /// Database that lives only as long as this value.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::read("sqlite", e))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| StorageError::write("sqlite", e))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KeyValueStorage for SqliteStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.conn
            .lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()
            .map_err(|e| StorageError::read(key, e))
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn
            .lock()
            .execute(
                "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, now],
            )
            .map_err(|e| StorageError::write(key, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_absent_then_written() {
        let storage = MemoryStorage::new();
        assert!(storage.read("locations").unwrap().is_none());

        storage.write("locations", b"[]").unwrap();
        assert_eq!(storage.read("locations").unwrap().as_deref(), Some(&b"[]"[..]));
    }

    #[test]
    fn test_file_storage_overwrites_without_leaving_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("data"));

        storage.write("weather_cache", b"{}").unwrap();
        storage.write("weather_cache", b"{\"a\":1}").unwrap();

        assert_eq!(
            storage.read("weather_cache").unwrap().as_deref(),
            Some(&b"{\"a\":1}"[..])
        );
        assert!(!dir.path().join("data").join("weather_cache.tmp").exists());
    }

    #[test]
    fn test_file_storage_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert!(matches!(
            storage.write("../escape", b"x"),
            Err(StorageError::Write { .. })
        ));
        assert!(matches!(storage.read(""), Err(StorageError::Read { .. })));
    }

    #[test]
    fn test_file_storage_unreadable_path_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the read fail
        std::fs::create_dir_all(dir.path().join("locations.json")).unwrap();
        let storage = FileStorage::new(dir.path());

        assert!(matches!(storage.read("locations"), Err(StorageError::Read { .. })));
    }

    #[test]
    fn test_sqlite_storage_replaces_value() {
        let storage = SqliteStorage::in_memory().unwrap();
        assert!(storage.read("locations").unwrap().is_none());

        storage.write("locations", b"one").unwrap();
        storage.write("locations", b"two").unwrap();
        assert_eq!(storage.read("locations").unwrap().as_deref(), Some(&b"two"[..]));
    }

    #[test]
    fn test_read_json_reports_corruption() {
        let storage = MemoryStorage::new();
        storage.write("locations", b"not json").unwrap();

        let result: Result<Option<Vec<u32>>, _> = read_json(&storage, "locations");
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }
}
