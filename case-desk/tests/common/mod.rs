//! Common test utilities for case-desk integration tests.

use case_core::config::ApiSettings;
use case_core::{ApiClient, MemorySessionStore, Session};
use std::sync::Arc;
use wiremock::MockServer;

pub const REFRESH_PATH: &str = "/api/token/refresh/";

/// Mocked case API with a signed-in client.
pub struct TestBackend {
    pub server: MockServer,
    pub store: Arc<MemorySessionStore>,
    pub api: Arc<ApiClient>,
}

impl TestBackend {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemorySessionStore::with_session(Session::new("T1", "R1")));
        let settings = ApiSettings {
            base_url: format!("{}/api", server.uri()),
            refresh_path: "token/refresh/".to_string(),
        };
        let api = Arc::new(
            ApiClient::new(&settings, store.clone()).expect("Failed to build API client"),
        );

        Self { server, store, api }
    }

    pub async fn requests_to(&self, method: &str, path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.to_string() == method && r.url.path() == path)
            .count()
    }
}
