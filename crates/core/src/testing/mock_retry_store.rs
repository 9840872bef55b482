//! Mock retry store for testing.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{Duration, Utc};

use crate::retry::{PendingMatch, RetryScan, RetryStore, RetryStoreError};

/// A write received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedStoreOp {
    Put {
        contact_id: String,
        document_key: String,
    },
    Delete {
        contact_id: String,
    },
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, String>,
    ops: Vec<RecordedStoreOp>,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-memory retry store that records writes and can be told to fail.
///
/// Entries never expire. The store trait is synchronous, so the controls
/// are too.
#[derive(Debug, Default)]
pub struct MockRetryStore {
    state: Mutex<State>,
}

impl MockRetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts and deletes, in order, including failed ones.
    pub fn recorded_ops(&self) -> Vec<RecordedStoreOp> {
        self.state.lock().unwrap().ops.clone()
    }

    /// `get` and `scan_all` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    /// `put` and `delete` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }
}

fn unavailable() -> RetryStoreError {
    RetryStoreError::Database("mock store unavailable".to_string())
}

impl RetryStore for MockRetryStore {
    fn get(&self, contact_id: &str) -> Result<Option<String>, RetryStoreError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(unavailable());
        }
        Ok(state.entries.get(contact_id).cloned())
    }

    fn scan_all(&self) -> Result<RetryScan, RetryStoreError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(unavailable());
        }
        Ok(RetryScan::new(state.entries.keys().cloned().collect()))
    }

    fn put(&self, contact_id: &str, document_key: &str) -> Result<PendingMatch, RetryStoreError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(RecordedStoreOp::Put {
            contact_id: contact_id.to_string(),
            document_key: document_key.to_string(),
        });
        if state.fail_writes {
            return Err(unavailable());
        }
        state
            .entries
            .insert(contact_id.to_string(), document_key.to_string());
        Ok(PendingMatch {
            contact_id: contact_id.to_string(),
            document_key: document_key.to_string(),
            expires_at: (Utc::now() + Duration::days(1)).timestamp(),
        })
    }

    fn delete(&self, contact_id: &str) -> Result<bool, RetryStoreError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(RecordedStoreOp::Delete {
            contact_id: contact_id.to_string(),
        });
        if state.fail_writes {
            return Err(unavailable());
        }
        Ok(state.entries.remove(contact_id).is_some())
    }

    fn prune_expired(&self) -> Result<usize, RetryStoreError> {
        Ok(0)
    }
}
