//! Filesystem-backed analysis source.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{AnalysisError, AnalysisRecord, AnalysisSource};

/// Reads analysis documents from `<root>/<document key>`.
#[derive(Debug, Clone)]
pub struct FsAnalysisSource {
    root: PathBuf,
}

impl FsAnalysisSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to a path below the root. Keys may not escape it.
    fn resolve(&self, document_key: &str) -> Result<PathBuf, AnalysisError> {
        let key = Path::new(document_key);
        let escapes = key
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if document_key.is_empty() || escapes {
            return Err(AnalysisError::InvalidKey(document_key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl AnalysisSource for FsAnalysisSource {
    async fn fetch(&self, document_key: &str) -> Result<AnalysisRecord, AnalysisError> {
        let path = self.resolve(document_key)?;
        debug!(path = %path.display(), "Reading analysis document");

        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AnalysisError::NotFound(document_key.to_string()))
            }
            Err(e) => return Err(AnalysisError::Io(e)),
        };

        serde_json::from_str(&body).map_err(|e| AnalysisError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_document() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("analysis/2024")).unwrap();
        std::fs::write(
            dir.path().join("analysis/2024/C1.json"),
            r#"{"CustomerMetadata": {"ContactId": "C1"}, "Categories": {"MatchedCategories": ["x"]}}"#,
        )
        .unwrap();

        let source = FsAnalysisSource::new(dir.path());
        let record = source.fetch("analysis/2024/C1.json").await.unwrap();
        assert_eq!(record.contact_id(), "C1");
        assert!(record.has_category("x"));
    }

    #[tokio::test]
    async fn test_missing_document() {
        let dir = TempDir::new().unwrap();
        let source = FsAnalysisSource::new(dir.path());
        let err = source.fetch("nope.json").await.unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.json"), "not json").unwrap();
        let source = FsAnalysisSource::new(dir.path());
        let err = source.fetch("bad.json").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)));
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let source = FsAnalysisSource::new("/tmp/analysis");
        for key in ["../etc/passwd", "/etc/passwd", "a/../../b", ""] {
            let err = source.fetch(key).await.unwrap_err();
            assert!(matches!(err, AnalysisError::InvalidKey(_)), "key {:?}", key);
        }
    }
}
