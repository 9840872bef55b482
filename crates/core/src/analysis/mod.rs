//! Conversation-analysis documents and where they come from.

mod fs_source;
mod types;

pub use fs_source::FsAnalysisSource;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when fetching an analysis document.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Analysis document not found: {0}")]
    NotFound(String),

    #[error("Invalid document key: {0}")]
    InvalidKey(String),

    #[error("Failed to read analysis document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse analysis document: {0}")]
    Parse(String),
}

/// Storage holding analysis documents, addressed by document key.
#[async_trait]
pub trait AnalysisSource: Send + Sync {
    async fn fetch(&self, document_key: &str) -> Result<AnalysisRecord, AnalysisError>;
}
