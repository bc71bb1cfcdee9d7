//! SQLite-backed forecast cache that survives restarts.
//!
//! Values are stored as JSON with an absolute expiry in unix milliseconds.

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::Path;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::error::CacheError;

/// SQLite cache keyed by cache key.
pub struct SqliteCache<V> {
    conn: Mutex<Connection>,
    _value: PhantomData<fn() -> V>,
}

impl<V> std::fmt::Debug for SqliteCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCache").finish_non_exhaustive()
    }
}

impl<V> SqliteCache<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Open (or create) a cache database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory cache.
    pub fn in_memory() -> Result<Self, CacheError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CacheError> {
        let cache = Self {
            conn: Mutex::new(conn),
            _value: PhantomData,
        };
        cache.init_schema()?;
        Ok(cache)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), CacheError> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS forecast_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                cached_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_forecast_cache_expires ON forecast_cache(expires_at);
            "#,
        )?;
        Ok(())
    }

    /// Live value for `key`. Expired or undecodable rows are removed and read as absent.
    pub fn try_get(&self, key: &str) -> Result<Option<V>, CacheError> {
        let now = Utc::now().timestamp_millis();
        let conn = self.conn.lock();

        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, expires_at FROM forecast_cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((json, expires_at)) = row else {
            return Ok(None);
        };

        if expires_at <= now {
            conn.execute("DELETE FROM forecast_cache WHERE key = ?1", params![key])?;
            return Ok(None);
        }

        match serde_json::from_str(&json) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, "Dropping undecodable cache row: {}", e);
                conn.execute("DELETE FROM forecast_cache WHERE key = ?1", params![key])?;
                Ok(None)
            }
        }
    }

    /// Store `value` under `key`, replacing any previous row.
    pub fn try_insert(&self, key: &str, value: &V, ttl: Duration) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;
        let now = Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl_ms);

        self.conn.lock().execute(
            r#"
            INSERT OR REPLACE INTO forecast_cache (key, value, expires_at, cached_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![key, json, expires_at, now],
        )?;
        Ok(())
    }

    /// Remove the row for `key`. Returns true if one existed.
    pub fn try_delete(&self, key: &str) -> Result<bool, CacheError> {
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM forecast_cache WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    /// Delete every expired row. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = Utc::now().timestamp_millis();
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM forecast_cache WHERE expires_at <= ?1", params![now])?;
        Ok(removed)
    }

    /// Number of stored rows, including expired ones not yet purged.
    pub fn len(&self) -> Result<usize, CacheError> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM forecast_cache", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }

    /// Clear all cached data.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.conn.lock().execute_batch("DELETE FROM forecast_cache;")?;
        Ok(())
    }
}

// A broken cache must not break forecasts: faults are logged and read as a miss.
impl<V> CacheStore<V> for SqliteCache<V>
where
    V: Serialize + DeserializeOwned,
{
    fn get(&self, key: &str) -> Option<V> {
        self.try_get(key).unwrap_or_else(|e| {
            tracing::warn!(key, "Cache read failed: {}", e);
            None
        })
    }

    fn insert(&self, key: &str, value: V, ttl: Duration) {
        if let Err(e) = self.try_insert(key, &value, ttl) {
            tracing::warn!(key, "Cache write failed: {}", e);
        }
    }

    fn delete(&self, key: &str) -> bool {
        self.try_delete(key).unwrap_or_else(|e| {
            tracing::warn!(key, "Cache delete failed: {}", e);
            false
        })
    }
}
