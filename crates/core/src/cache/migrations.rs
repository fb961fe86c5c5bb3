//! Schema for the response cache.
//!
//! Two tables: `cache_namespaces` (one row per named cache, e.g.
//! `beekon-static-v1`) and `cache_entries` (one response per namespace and
//! URL, removed with its namespace via `ON DELETE CASCADE`). Applied
//! versions are recorded in `_migrations`; each version runs in its own
//! transaction.

use super::Error;
use tokio_rusqlite::{Connection, params};

const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_cache_namespaces.sql")),
    (2, include_str!("../../migrations/002_cache_entries.sql")),
];

/// Apply every version newer than the highest recorded one.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version, "applied cache migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_exists(conn: &Connection, name: &'static str) -> bool {
        conn.call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                [name],
                |row| row.get(0),
            )
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_twice_records_each_version_once() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        assert!(table_exists(&conn, "cache_namespaces").await);
        assert!(table_exists(&conn, "cache_entries").await);

        let count: i64 = conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_deleting_namespace_cascades_to_entries() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let remaining: i64 = conn
            .call(|conn| {
                conn.execute_batch(
                    "PRAGMA foreign_keys=ON;
                    INSERT INTO cache_namespaces (name, created_at) VALUES ('beekon-api-v0', '2024-01-01T00:00:00Z');
                    INSERT INTO cache_entries (key_hash, namespace, url, status_code, headers_json, body, stored_at)
                    VALUES ('k', 'beekon-api-v0', 'https://beekon.ai/api/x', 200, '[]', x'', '2024-01-01T00:00:00Z');
                    DELETE FROM cache_namespaces WHERE name = 'beekon-api-v0';",
                )?;
                conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
