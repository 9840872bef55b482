//! Retry store trait and types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for retry store operations.
#[derive(Debug, Error)]
pub enum RetryStoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Expiry time out of range")]
    ExpiryOutOfRange,
}

impl From<rusqlite::Error> for RetryStoreError {
    fn from(e: rusqlite::Error) -> Self {
        RetryStoreError::Database(e.to_string())
    }
}

/// A contact waiting for its ticket to appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMatch {
    pub contact_id: String,
    /// Locator of the analysis document.
    pub document_key: String,
    /// Epoch seconds after which the entry is dead.
    pub expires_at: i64,
}

/// Result of a full scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetryScan {
    pub contact_ids: Vec<String>,
    pub count: usize,
}

impl RetryScan {
    pub fn new(contact_ids: Vec<String>) -> Self {
        let count = contact_ids.len();
        Self { contact_ids, count }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Storage for pending matches, keyed by contact id.
///
/// Expired entries are never returned, whether or not they were pruned.
pub trait RetryStore: Send + Sync {
    /// Document key of a live entry.
    fn get(&self, contact_id: &str) -> Result<Option<String>, RetryStoreError>;

    /// Contact ids of all live entries.
    fn scan_all(&self) -> Result<RetryScan, RetryStoreError>;

    /// Insert or replace the entry for `contact_id`, restarting its expiry.
    fn put(&self, contact_id: &str, document_key: &str) -> Result<PendingMatch, RetryStoreError>;

    /// Remove an entry. Returns whether one existed.
    fn delete(&self, contact_id: &str) -> Result<bool, RetryStoreError>;

    /// Drop expired entries. Returns how many were removed.
    fn prune_expired(&self) -> Result<usize, RetryStoreError>;
}
