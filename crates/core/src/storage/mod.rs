//! Versioned key-value storage over a durable and a session backend.
//!
//! Every value is wrapped in a [`StoredRecord`] with its write time, schema
//! version and optional expiry. Reads that find a different version, or an
//! expired record, delete the key and report it as absent. Nothing here
//! returns an error to the caller: failures degrade to `false` / `None`.

pub mod backend;
pub mod keys;
pub mod record;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::clock::Clock;

pub use backend::{BackendError, MemoryBackend, SqliteBackend, StorageBackend};
pub use keys::{AppStorage, FilterPage, STORAGE_PREFIX, StorageKey};
pub use record::{DEFAULT_VERSION, StoredRecord};

const PROBE_KEY: &str = "__beekon_storage_test__";

/// Which backend an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StorageArea {
    /// Survives restarts.
    Durable,
    /// Lives as long as the process.
    Session,
}

/// Options for [`StorageManager::set`].
#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    pub version: u32,
    /// Relative lifetime; the record expires at write time plus this.
    pub expires_in: Option<Duration>,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self { version: DEFAULT_VERSION, expires_in: None }
    }
}

impl SetOptions {
    pub fn version(version: u32) -> Self {
        Self { version, ..Self::default() }
    }

    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.expires_in = Some(ttl);
        self
    }
}

/// Diagnostics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct StorageStats {
    pub durable_size: usize,
    pub session_size: usize,
    pub durable_available: bool,
    pub session_available: bool,
}

struct ProbedBackend {
    backend: Box<dyn StorageBackend>,
    available: OnceLock<bool>,
    area: StorageArea,
}

impl ProbedBackend {
    fn new(backend: Box<dyn StorageBackend>, area: StorageArea) -> Self {
        Self { backend, available: OnceLock::new(), area }
    }

    /// The backend, if the one-time write/remove probe succeeded.
    fn get(&self) -> Option<&dyn StorageBackend> {
        let available = *self.available.get_or_init(|| {
            let probe = self
                .backend
                .set_item(PROBE_KEY, PROBE_KEY)
                .and_then(|()| self.backend.remove_item(PROBE_KEY));
            match probe {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(area = ?self.area, error = %e, "storage backend unavailable");
                    false
                }
            }
        });
        available.then_some(&*self.backend)
    }
}

/// Storage facade handed to every consumer.
///
/// Construct one at startup and share it by reference.
pub struct StorageManager {
    durable: ProbedBackend,
    session: ProbedBackend,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager").field("clock", &self.clock).finish_non_exhaustive()
    }
}

impl StorageManager {
    pub fn new(durable: Box<dyn StorageBackend>, session: Box<dyn StorageBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            durable: ProbedBackend::new(durable, StorageArea::Durable),
            session: ProbedBackend::new(session, StorageArea::Session),
            clock,
        }
    }

    /// Both areas in memory.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(Box::new(MemoryBackend::new()), Box::new(MemoryBackend::new()), clock)
    }

    fn backend(&self, area: StorageArea) -> Option<&dyn StorageBackend> {
        match area {
            StorageArea::Durable => self.durable.get(),
            StorageArea::Session => self.session.get(),
        }
    }

    pub fn is_available(&self, area: StorageArea) -> bool {
        self.backend(area).is_some()
    }

    /// Wrap and store `value` under `key`.
    ///
    /// Returns false if the backend is unavailable, the expiry can't be
    /// represented, serialization fails or the write is rejected.
    pub fn set<T: Serialize>(&self, area: StorageArea, key: &str, value: &T, options: SetOptions) -> bool {
        let Some(backend) = self.backend(area) else {
            return false;
        };

        let now = self.clock.now();
        let expires_at = match options.expires_in {
            Some(ttl) => {
                let Some(at) = chrono::Duration::from_std(ttl).ok().and_then(|ttl| now.checked_add_signed(ttl)) else {
                    tracing::warn!(key, ?ttl, "expiry out of range, not stored");
                    return false;
                };
                Some(at.timestamp_millis())
            }
            None => None,
        };
        let record = StoredRecord { data: value, timestamp: now.timestamp_millis(), version: options.version, expires_at };

        let encoded = match serde_json::to_string(&record) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to encode stored record");
                return false;
            }
        };

        match backend.set_item(key, &encoded) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, ?area, error = %e, "storage write failed");
                false
            }
        }
    }

    /// Read the payload under `key` if it was written with `expected_version`
    /// and hasn't expired.
    ///
    /// Version mismatches and expired records are deleted. Missing keys and
    /// undecodable values both read as `None`.
    pub fn get<T: DeserializeOwned>(&self, area: StorageArea, key: &str, expected_version: u32) -> Option<T> {
        let backend = self.backend(area)?;

        let raw = match backend.get_item(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, ?area, error = %e, "storage read failed");
                return None;
            }
        };

        let record: StoredRecord<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(key, error = %e, "undecodable stored record");
                return None;
            }
        };

        if !record.is_valid(expected_version, self.clock.now()) {
            tracing::debug!(
                key,
                stored_version = record.version,
                expected_version,
                "discarding stale stored record"
            );
            if let Err(e) = backend.remove_item(key) {
                tracing::warn!(key, error = %e, "failed to remove stale record");
            }
            return None;
        }

        match serde_json::from_value(record.data) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::debug!(key, error = %e, "stored payload has unexpected shape");
                None
            }
        }
    }

    pub fn remove(&self, area: StorageArea, key: &str) -> bool {
        let Some(backend) = self.backend(area) else {
            return false;
        };
        match backend.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, ?area, error = %e, "storage remove failed");
                false
            }
        }
    }

    /// Remove every key starting with `prefix`, or everything without one.
    pub fn clear(&self, area: StorageArea, prefix: Option<&str>) -> bool {
        let Some(backend) = self.backend(area) else {
            return false;
        };

        let result = match prefix {
            None => backend.clear(),
            Some(prefix) => backend.keys().and_then(|keys| {
                keys.iter()
                    .filter(|key| key.starts_with(prefix))
                    .try_for_each(|key| backend.remove_item(key))
            }),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(?area, prefix, error = %e, "storage clear failed");
                false
            }
        }
    }

    /// Approximate sizes (key plus value bytes) and availability.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            durable_size: self.backend(StorageArea::Durable).map_or(0, approximate_size),
            session_size: self.backend(StorageArea::Session).map_or(0, approximate_size),
            durable_available: self.is_available(StorageArea::Durable),
            session_available: self.is_available(StorageArea::Session),
        }
    }
}

fn approximate_size(backend: &dyn StorageBackend) -> usize {
    let Ok(keys) = backend.keys() else {
        return 0;
    };
    keys.iter()
        .map(|key| key.len() + backend.get_item(key).ok().flatten().map_or(0, |v| v.len()))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    fn manager() -> (StorageManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (StorageManager::in_memory(clock.clone()), clock)
    }

    #[test]
    fn test_set_then_get_same_version() {
        let (storage, _) = manager();
        let prefs = json!({"theme": "dark"});
        assert!(storage.set(StorageArea::Durable, "beekon_user_preferences", &prefs, SetOptions::default()));

        let read: Option<serde_json::Value> = storage.get(StorageArea::Durable, "beekon_user_preferences", 1);
        assert_eq!(read, Some(json!({"theme": "dark"})));
    }

    #[test]
    fn test_version_mismatch_removes_key() {
        let (storage, _) = manager();
        storage.set(StorageArea::Durable, "beekon_user_preferences", &json!({"theme": "dark"}), SetOptions::default());

        let read: Option<serde_json::Value> = storage.get(StorageArea::Durable, "beekon_user_preferences", 2);
        assert!(read.is_none());

        let backend = storage.backend(StorageArea::Durable).unwrap();
        assert_eq!(backend.get_item("beekon_user_preferences").unwrap(), None);

        // Gone for the original version too.
        let again: Option<serde_json::Value> = storage.get(StorageArea::Durable, "beekon_user_preferences", 1);
        assert!(again.is_none());
    }

    #[test]
    fn test_expired_record_is_absent() {
        let (storage, clock) = manager();
        let options = SetOptions::default().expires_in(Duration::from_millis(500));
        assert!(storage.set(StorageArea::Session, "beekon_topics_cache", &vec!["a", "b"], options));

        clock.advance(chrono::Duration::milliseconds(499));
        let fresh: Option<Vec<String>> = storage.get(StorageArea::Session, "beekon_topics_cache", 1);
        assert_eq!(fresh, Some(vec!["a".to_string(), "b".to_string()]));

        clock.advance(chrono::Duration::milliseconds(1));
        let expired: Option<Vec<String>> = storage.get(StorageArea::Session, "beekon_topics_cache", 1);
        assert!(expired.is_none());
        let backend = storage.backend(StorageArea::Session).unwrap();
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn test_unrepresentable_expiry_is_rejected() {
        let (storage, _) = manager();
        for secs in [10_000_000_000_000, u64::MAX] {
            let options = SetOptions::default().expires_in(Duration::from_secs(secs));
            assert!(!storage.set(StorageArea::Session, "beekon_x", &1, options));
        }

        let backend = storage.backend(StorageArea::Session).unwrap();
        assert_eq!(backend.get_item("beekon_x").unwrap(), None);
    }

    #[test]
    fn test_long_expiry_is_kept() {
        let (storage, _) = manager();
        let options = SetOptions::default().expires_in(Duration::from_secs(10 * 365 * 24 * 60 * 60));
        assert!(storage.set(StorageArea::Session, "beekon_x", &1, options));

        let backend = storage.backend(StorageArea::Session).unwrap();
        let raw = backend.get_item("beekon_x").unwrap().unwrap();
        let record: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(record["expiresAt"].is_i64());
    }

    #[test]
    fn test_undecodable_value_reads_as_missing() {
        let (storage, _) = manager();
        let backend = storage.backend(StorageArea::Durable).unwrap();
        backend.set_item("beekon_broken", "{not json").unwrap();

        let read: Option<serde_json::Value> = storage.get(StorageArea::Durable, "beekon_broken", 1);
        assert!(read.is_none());
    }

    #[test]
    fn test_wrong_payload_shape_reads_as_missing() {
        let (storage, _) = manager();
        storage.set(StorageArea::Durable, "beekon_x", &"text", SetOptions::default());
        let read: Option<Vec<u32>> = storage.get(StorageArea::Durable, "beekon_x", 1);
        assert!(read.is_none());
    }

    #[test]
    fn test_unavailable_backend_is_noop() {
        let clock = Arc::new(ManualClock::starting_now());
        let storage = StorageManager::new(Box::new(MemoryBackend::disabled()), Box::new(MemoryBackend::new()), clock);

        assert!(!storage.set(StorageArea::Durable, "beekon_a", &1, SetOptions::default()));
        assert!(storage.get::<i32>(StorageArea::Durable, "beekon_a", 1).is_none());
        assert!(!storage.remove(StorageArea::Durable, "beekon_a"));
        assert!(!storage.clear(StorageArea::Durable, None));

        assert!(storage.set(StorageArea::Session, "beekon_a", &1, SetOptions::default()));

        let stats = storage.stats();
        assert!(!stats.durable_available);
        assert!(stats.session_available);
        assert_eq!(stats.durable_size, 0);
        assert!(stats.session_size > 0);
    }

    #[test]
    fn test_quota_exceeded_returns_false() {
        let clock = Arc::new(ManualClock::starting_now());
        let storage = StorageManager::new(Box::new(MemoryBackend::with_quota(64)), Box::new(MemoryBackend::new()), clock);

        assert!(storage.is_available(StorageArea::Durable));
        let big = "x".repeat(128);
        assert!(!storage.set(StorageArea::Durable, "beekon_big", &big, SetOptions::default()));
    }

    #[test]
    fn test_clear_with_prefix() {
        let (storage, _) = manager();
        storage.set(StorageArea::Durable, "beekon_a", &1, SetOptions::default());
        storage.set(StorageArea::Durable, "beekon_b", &2, SetOptions::default());
        storage.set(StorageArea::Durable, "vendor_c", &3, SetOptions::default());

        assert!(storage.clear(StorageArea::Durable, Some("beekon_")));
        let backend = storage.backend(StorageArea::Durable).unwrap();
        assert_eq!(backend.keys().unwrap(), vec!["vendor_c".to_string()]);

        assert!(storage.clear(StorageArea::Durable, None));
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn test_areas_are_independent() {
        let (storage, _) = manager();
        storage.set(StorageArea::Durable, "beekon_a", &"durable", SetOptions::default());
        assert!(storage.get::<String>(StorageArea::Session, "beekon_a", 1).is_none());
        assert!(storage.remove(StorageArea::Session, "beekon_a"));
        assert_eq!(storage.get::<String>(StorageArea::Durable, "beekon_a", 1).as_deref(), Some("durable"));
    }

    #[test]
    fn test_custom_version_round_trip() {
        let (storage, _) = manager();
        storage.set(StorageArea::Durable, "beekon_a", &"v3", SetOptions::version(3));
        assert_eq!(storage.get::<String>(StorageArea::Durable, "beekon_a", 3).as_deref(), Some("v3"));
    }
}
