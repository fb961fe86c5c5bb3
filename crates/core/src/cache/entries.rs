//! Cached response CRUD operations.
//!
//! Each row is one HTTP response stored under a namespace. Age is always
//! derived from the response's own `Date` header, never from the row.

use std::time::Duration;

use super::connection::CacheDb;
use super::hash::compute_entry_key;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A stored HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    /// Header pairs in the order they were received.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// RFC 3339 time the row was written.
    pub stored_at: String,
}

impl CachedResponse {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The parsed `Date` header, if present and well-formed.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.header("date").and_then(parse_http_date)
    }

    /// Age of the response relative to `now`.
    ///
    /// `None` when the `Date` header is missing or unparseable.
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.date().map(|date| now - date)
    }

    /// Whether the response is younger than `window`.
    ///
    /// A response without a usable `Date` header is never fresh; one dated in
    /// the future always is.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now)
            .is_some_and(|age| age.to_std().map_or(true, |age| age < window))
    }
}

/// Parse an HTTP `Date` header value (IMF-fixdate / RFC 2822).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a timestamp as an IMF-fixdate `Date` header value.
pub fn format_http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

type RawRow = (String, u16, String, Vec<u8>, String);

fn from_raw((url, status, headers_json, body, stored_at): RawRow) -> Result<CachedResponse, Error> {
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
    Ok(CachedResponse { url, status, headers, body, stored_at })
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

impl CacheDb {
    /// Insert or replace the response for `response.url` in `namespace`.
    ///
    /// The namespace is created if it doesn't exist yet.
    pub async fn put_entry(&self, namespace: &str, response: &CachedResponse) -> Result<(), Error> {
        self.put_entries(namespace, std::slice::from_ref(response)).await
    }

    /// Insert or replace every response in one transaction: either all rows
    /// (and the namespace) are written or none are.
    pub async fn put_entries(&self, namespace: &str, responses: &[CachedResponse]) -> Result<(), Error> {
        let namespace = namespace.to_string();
        let rows = responses
            .iter()
            .map(|response| -> Result<_, Error> {
                let key_hash = compute_entry_key(&namespace, &response.url);
                let headers_json = serde_json::to_string(&response.headers)?;
                Ok((key_hash, headers_json, response.clone()))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let now = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_namespaces (name, created_at) VALUES (?1, ?2)",
                    params![&namespace, &now],
                )?;
                {
                    let mut stmt = tx.prepare_cached(
                        "INSERT INTO cache_entries (key_hash, namespace, url, status_code, headers_json, body, stored_at)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                        ON CONFLICT(key_hash) DO UPDATE SET
                            status_code = excluded.status_code,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            stored_at = excluded.stored_at",
                    )?;
                    for (key_hash, headers_json, response) in &rows {
                        stmt.execute(params![
                            key_hash,
                            &namespace,
                            &response.url,
                            response.status,
                            headers_json,
                            &response.body,
                            &response.stored_at,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the response stored for `url` in `namespace`.
    pub async fn get_entry(&self, namespace: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        let key_hash = compute_entry_key(namespace, url);
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status_code, headers_json, body, stored_at
                    FROM cache_entries WHERE key_hash = ?1",
                )?;

                match stmt.query_row(params![key_hash], read_raw) {
                    Ok(raw) => from_raw(raw).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Find the most recently stored response for `url` in any namespace.
    pub async fn match_any(&self, url: &str) -> Result<Option<CachedResponse>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status_code, headers_json, body, stored_at
                    FROM cache_entries WHERE url = ?1
                    ORDER BY stored_at DESC LIMIT 1",
                )?;

                match stmt.query_row(params![url], read_raw) {
                    Ok(raw) => from_raw(raw).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the response for `url` in `namespace`.
    ///
    /// Returns true if a row was removed.
    pub async fn delete_entry(&self, namespace: &str, url: &str) -> Result<bool, Error> {
        let key_hash = compute_entry_key(namespace, url);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE key_hash = ?1", params![key_hash])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// All responses stored in `namespace`, oldest write first.
    pub async fn list_entries(&self, namespace: &str) -> Result<Vec<CachedResponse>, Error> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status_code, headers_json, body, stored_at
                    FROM cache_entries WHERE namespace = ?1
                    ORDER BY stored_at ASC",
                )?;
                let rows = stmt.query_map(params![namespace], read_raw)?;

                let mut entries = Vec::new();
                for raw in rows {
                    entries.push(from_raw(raw?)?);
                }
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count_entries(&self, namespace: &str) -> Result<u64, Error> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE namespace = ?1",
                    params![namespace],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
