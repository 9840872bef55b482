//! SQLite-backed retry store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{PendingMatch, RetryScan, RetryStore, RetryStoreError};

/// SQLite-backed retry store.
pub struct SqliteRetryStore {
    conn: Mutex<Connection>,
    ttl: Duration,
}

impl SqliteRetryStore {
    /// Open (or create) the database file. Entries live for `ttl`.
    pub fn new(path: &Path, ttl: Duration) -> Result<Self, RetryStoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            ttl,
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory(ttl: Duration) -> Result<Self, RetryStoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            ttl,
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), RetryStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS pending_matches (
                contact_id TEXT PRIMARY KEY,
                document_key TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_pending_matches_expires_at
                ON pending_matches(expires_at);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RetryStoreError> {
        self.conn
            .lock()
            .map_err(|_| RetryStoreError::Database("connection lock poisoned".to_string()))
    }
}

impl RetryStore for SqliteRetryStore {
    fn get(&self, contact_id: &str) -> Result<Option<String>, RetryStoreError> {
        let conn = self.lock()?;
        let key = conn
            .query_row(
                "SELECT document_key FROM pending_matches WHERE contact_id = ? AND expires_at > ?",
                params![contact_id, Utc::now().timestamp()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(key)
    }

    fn scan_all(&self) -> Result<RetryScan, RetryStoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT contact_id FROM pending_matches WHERE expires_at > ? ORDER BY expires_at",
        )?;
        let contact_ids = stmt
            .query_map(params![Utc::now().timestamp()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(RetryScan::new(contact_ids))
    }

    fn put(&self, contact_id: &str, document_key: &str) -> Result<PendingMatch, RetryStoreError> {
        let conn = self.lock()?;
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .ok_or(RetryStoreError::ExpiryOutOfRange)?
            .timestamp();
        conn.execute(
            "INSERT INTO pending_matches (contact_id, document_key, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(contact_id) DO UPDATE SET
                document_key = excluded.document_key,
                expires_at = excluded.expires_at",
            params![contact_id, document_key, expires_at],
        )?;
        Ok(PendingMatch {
            contact_id: contact_id.to_string(),
            document_key: document_key.to_string(),
            expires_at,
        })
    }

    fn delete(&self, contact_id: &str) -> Result<bool, RetryStoreError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM pending_matches WHERE contact_id = ?",
            params![contact_id],
        )?;
        Ok(removed > 0)
    }

    fn prune_expired(&self) -> Result<usize, RetryStoreError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM pending_matches WHERE expires_at <= ?",
            params![Utc::now().timestamp()],
        )?;
        Ok(removed)
    }
}
