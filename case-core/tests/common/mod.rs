//! Common test utilities for API client integration tests.

use case_core::config::ApiSettings;
use case_core::{ApiClient, MemorySessionStore, Session};
use std::sync::Arc;
use wiremock::MockServer;

pub const INITIAL_ACCESS: &str = "T1";
pub const INITIAL_REFRESH: &str = "R1";
pub const REFRESH_PATH: &str = "/api/token/refresh/";

/// A mocked case API plus a client pointed at it.
pub struct TestBackend {
    pub server: MockServer,
    pub store: Arc<MemorySessionStore>,
    pub client: Arc<ApiClient>,
}

impl TestBackend {
    /// Backend with a signed-in session holding `T1` / `R1`.
    pub async fn start() -> Self {
        let store = Arc::new(MemorySessionStore::with_session(Session::new(
            INITIAL_ACCESS,
            INITIAL_REFRESH,
        )));
        Self::with_store(store).await
    }

    /// Backend with nobody signed in.
    pub async fn without_session() -> Self {
        Self::with_store(Arc::new(MemorySessionStore::new())).await
    }

    async fn with_store(store: Arc<MemorySessionStore>) -> Self {
        let server = MockServer::start().await;
        let settings = ApiSettings {
            base_url: format!("{}/api", server.uri()),
            refresh_path: "token/refresh/".to_string(),
        };
        let client = Arc::new(
            ApiClient::new(&settings, store.clone()).expect("Failed to build API client"),
        );

        Self {
            server,
            store,
            client,
        }
    }
}
