//! Persistent content cache
//!
//! A key→bytes store over SQLite used as a read-through/write-through cache
//! for fetched archive content. Keys are `"{prefix}_{url}_{timestamp}"`;
//! absence of a key is not an error. The store keeps itself under a size
//! budget by evicting oldest-written entries after each insert.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite-backed content cache.
pub struct ContentCache {
    conn: Connection,
    size_limit_bytes: u64,
}

impl ContentCache {
    /// Opens (or creates) a cache database at `path`.
    pub fn open(path: &Path, size_limit_bytes: u64) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        // journal_mode reports the resulting mode as a row, so it has to be
        // read rather than executed.
        let _mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        Self::with_connection(conn, size_limit_bytes)
    }

    /// In-memory cache, used by tests.
    pub fn in_memory(size_limit_bytes: u64) -> rusqlite::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, size_limit_bytes)
    }

    fn with_connection(conn: Connection, size_limit_bytes: u64) -> rusqlite::Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS entries (
                key        TEXT PRIMARY KEY,
                content    BLOB NOT NULL,
                size       INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_entries_created ON entries (created_at)",
            [],
        )?;
        Ok(Self {
            conn,
            size_limit_bytes,
        })
    }

    /// Composes the cache key for one fetched item.
    pub fn key(prefix: &str, url: &str, timestamp: &str) -> String {
        format!("{}_{}_{}", prefix, url, timestamp)
    }

    /// Returns the cached bytes for `key`, if present.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let result = self
            .conn
            .query_row(
                "SELECT content FROM entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional();
        match result {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Stores `content` under `key`, then evicts oldest entries until the
    /// store is back within its size budget.
    pub fn put(&self, key: &str, content: &[u8]) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO entries (key, content, size, created_at)
             VALUES (?1, ?2, ?3, strftime('%s','now'))",
            params![key, content, content.len() as i64],
        )?;
        self.evict_to_budget()
    }

    /// Total bytes of cached content.
    pub fn total_size(&self) -> rusqlite::Result<u64> {
        let total: i64 = self
            .conn
            .query_row("SELECT COALESCE(SUM(size), 0) FROM entries", [], |row| {
                row.get(0)
            })?;
        Ok(total as u64)
    }

    fn evict_to_budget(&self) -> rusqlite::Result<()> {
        while self.total_size()? > self.size_limit_bytes {
            let evicted = self.conn.execute(
                "DELETE FROM entries WHERE key IN (
                    SELECT key FROM entries ORDER BY created_at ASC, key ASC LIMIT 1
                )",
                [],
            )?;
            if evicted == 0 {
                break;
            }
        }
        Ok(())
    }
}
