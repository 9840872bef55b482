//! Durable queue of contacts whose ticket could not be matched yet.

mod sqlite_store;
mod store;

pub use sqlite_store::SqliteRetryStore;
pub use store::{PendingMatch, RetryScan, RetryStore, RetryStoreError};
