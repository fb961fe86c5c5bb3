//! Namespace bookkeeping.

use super::connection::CacheDb;
use crate::Error;
use chrono::Utc;
use tokio_rusqlite::params;

impl CacheDb {
    /// Create the namespace if it doesn't exist.
    pub async fn open_namespace(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_namespaces (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every namespace, sorted.
    pub async fn namespace_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_namespaces ORDER BY name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Drop a namespace and every response in it.
    ///
    /// Returns false if the namespace didn't exist.
    pub async fn delete_namespace(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                conn.execute("DELETE FROM cache_entries WHERE namespace = ?1", params![&name])?;
                let count = conn.execute("DELETE FROM cache_namespaces WHERE name = ?1", params![&name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedResponse;

    #[tokio::test]
    async fn test_open_and_list() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_namespace("beekon-static-v1").await.unwrap();
        db.open_namespace("beekon-api-v1").await.unwrap();
        db.open_namespace("beekon-api-v1").await.unwrap();

        let names = db.namespace_names().await.unwrap();
        assert_eq!(names, vec!["beekon-api-v1".to_string(), "beekon-static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_namespace_drops_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let response = CachedResponse {
            url: "https://beekon.ai/app.js".into(),
            status: 200,
            headers: vec![],
            body: b"console.log(1)".to_vec(),
            stored_at: Utc::now().to_rfc3339(),
        };
        db.put_entry("beekon-static-v0", &response).await.unwrap();

        assert!(db.delete_namespace("beekon-static-v0").await.unwrap());
        assert!(!db.delete_namespace("beekon-static-v0").await.unwrap());
        assert!(db.match_any(&response.url).await.unwrap().is_none());
        assert!(db.namespace_names().await.unwrap().is_empty());
    }
}
