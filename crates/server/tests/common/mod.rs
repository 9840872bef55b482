//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with a mock helpdesk, a SQLite retry store and analysis documents in a
//! temporary directory.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use lensdesk_core::{
    testing::{MockConnector, MockHelpdesk},
    AnalysisRecord, Config, FsAnalysisSource, Reconciler, RetryStore, SqliteRetryStore,
};
use lensdesk_server::state::AppState;

/// Re-export fixtures for test convenience
pub use lensdesk_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() {
///     let fixture = TestFixture::new();
///     let response = fixture.get("/api/v1/health").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock helpdesk - configure tickets and inspect requests
    pub helpdesk: Arc<MockHelpdesk>,
    /// Retry store backing the router
    pub store: Arc<SqliteRetryStore>,
    /// Temporary directory for the database and analysis documents
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default config.
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.server.host = std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
        config.server.api_key = test_config.api_key;
        config.helpdesk.token = Some("super-secret-token".to_string());
        config.filter.exclusion_category = Some("do-not-sync".to_string());
        config.retry.database_path = temp_dir.path().join("retry.db");
        config.analysis.root_dir = temp_dir.path().join("analysis");
        config.sweep.enabled = false;

        let helpdesk = Arc::new(MockHelpdesk::new());
        let connector = Arc::new(MockConnector::new(Arc::clone(&helpdesk)));
        let store = Arc::new(
            SqliteRetryStore::new(&config.retry.database_path, config.retry.ttl())
                .expect("Failed to create retry store"),
        );
        let source = Arc::new(FsAnalysisSource::new(&config.analysis.root_dir));

        let reconciler = Reconciler::new(
            &config,
            connector,
            Arc::clone(&store) as Arc<dyn RetryStore>,
            source,
        );
        let state = Arc::new(AppState::new(config, Arc::new(reconciler)));
        let router = lensdesk_server::api::create_router(state);

        Self {
            router,
            helpdesk,
            store,
            temp_dir,
        }
    }

    /// Write an analysis document under the analysis root.
    pub fn write_document(&self, key: &str, record: &AnalysisRecord) {
        let path = self.temp_dir.path().join("analysis").join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, serde_json::to_string(record).unwrap()).unwrap();
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, &[]).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), &[]).await
    }

    /// Send a request with extra headers.
    pub async fn request_with_headers(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        self.request(method, path, body, headers).await
    }

    /// Send a request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).to_string())
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Require this API key on trigger endpoints
    pub api_key: Option<String>,
}

impl TestConfig {
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
