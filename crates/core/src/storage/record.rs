//! The envelope every stored value is wrapped in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version assumed when the caller doesn't pass one.
pub const DEFAULT_VERSION: u32 = 1;

/// A payload plus the metadata needed to invalidate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord<T> {
    pub data: T,
    /// Write time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub version: u32,
    /// Absolute expiry, milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl<T> StoredRecord<T> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now.timestamp_millis())
    }

    /// Valid iff the version matches and the record hasn't expired.
    pub fn is_valid(&self, expected_version: u32, now: DateTime<Utc>) -> bool {
        self.version == expected_version && !self.is_expired(now)
    }
}
