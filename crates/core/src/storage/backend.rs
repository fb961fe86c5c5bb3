//! Key-value backends the storage manager sits on.
//!
//! Both backends are synchronous: each call completes before returning, the
//! same way browser local/session storage behaves.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tokio_rusqlite::rusqlite::{self, Connection, OptionalExtension, params};

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("storage is disabled")]
    Disabled,

    #[error("quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("storage lock poisoned")]
    Poisoned,
}

/// A string key-value store.
pub trait StorageBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError>;
    fn remove_item(&self, key: &str) -> Result<(), BackendError>;
    fn keys(&self) -> Result<Vec<String>, BackendError>;
    fn clear(&self) -> Result<(), BackendError>;
}

/// In-process backend. Used for session scope and as the test fake.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: Mutex<BTreeMap<String, String>>,
    /// Maximum total bytes of keys plus values.
    quota: Option<usize>,
    disabled: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self { quota: Some(quota), ..Self::default() }
    }

    /// A backend that rejects every operation, like storage in private mode.
    pub fn disabled() -> Self {
        Self { disabled: true, ..Self::default() }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, BackendError> {
        if self.disabled {
            return Err(BackendError::Disabled);
        }
        self.items.lock().map_err(|_| BackendError::Poisoned)
    }
}

impl StorageBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let mut items = self.lock()?;
        if let Some(quota) = self.quota {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(BackendError::QuotaExceeded { needed, quota });
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), BackendError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn clear(&self) -> Result<(), BackendError> {
        self.lock()?.clear();
        Ok(())
    }
}

/// Durable backend persisted in a SQLite file.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, BackendError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, BackendError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             CREATE TABLE IF NOT EXISTS storage (
                 key TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, BackendError> {
        self.conn.lock().map_err(|_| BackendError::Poisoned)
    }
}

impl StorageBackend for SqliteBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM storage WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError> {
        self.lock()?.execute(
            "INSERT INTO storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), BackendError> {
        self.lock()?.execute("DELETE FROM storage WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM storage ORDER BY key ASC")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn clear(&self) -> Result<(), BackendError> {
        self.lock()?.execute("DELETE FROM storage", [])?;
        Ok(())
    }
}
