//! Mock analysis source for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::analysis::{AnalysisError, AnalysisRecord, AnalysisSource};

/// Analysis documents held in memory, keyed by document key.
#[derive(Debug, Default)]
pub struct MockAnalysisSource {
    documents: Arc<RwLock<HashMap<String, AnalysisRecord>>>,
    fetches: Arc<RwLock<Vec<String>>>,
}

impl MockAnalysisSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_document(&self, document_key: &str, record: AnalysisRecord) {
        self.documents
            .write()
            .await
            .insert(document_key.to_string(), record);
    }

    /// Keys of every fetch, including misses.
    pub async fn recorded_fetches(&self) -> Vec<String> {
        self.fetches.read().await.clone()
    }
}

#[async_trait]
impl AnalysisSource for MockAnalysisSource {
    async fn fetch(&self, document_key: &str) -> Result<AnalysisRecord, AnalysisError> {
        self.fetches.write().await.push(document_key.to_string());
        self.documents
            .read()
            .await
            .get(document_key)
            .cloned()
            .ok_or_else(|| AnalysisError::NotFound(document_key.to_string()))
    }
}
