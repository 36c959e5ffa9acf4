use crate::error::{ClientError, RefreshFailure};
use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

/// Tokens handed back by a successful refresh exchange.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access: Secret<String>,
    /// Present when the endpoint rotates refresh tokens.
    pub refresh: Option<Secret<String>>,
}

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &Secret<String>)
        -> Result<RefreshedTokens, RefreshFailure>;
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Calls the backend's refresh endpoint: `POST {"refresh": ...}` → `{"access": ...}`.
pub struct HttpTokenRefresher {
    client: Client,
    url: Url,
}

impl HttpTokenRefresher {
    pub fn new(client: Client, base_url: &Url, refresh_path: &str) -> Result<Self, ClientError> {
        let url = base_url
            .join(refresh_path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidPath(format!("{}: {}", refresh_path, e)))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(
        &self,
        refresh_token: &Secret<String>,
    ) -> Result<RefreshedTokens, RefreshFailure> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&serde_json::json!({ "refresh": refresh_token.expose_secret() }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %self.url, "Failed to send refresh request: {}", e);
                RefreshFailure::transport(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(RefreshFailure::transport)?;

        if !status.is_success() {
            return Err(RefreshFailure::rejected(status, body));
        }

        let tokens: RefreshResponse = serde_json::from_str(&body).map_err(|e| {
            RefreshFailure::transport(format!("unreadable refresh response: {}", e))
        })?;

        if tokens.access.is_empty() {
            return Err(RefreshFailure::rejected(status, "empty access token"));
        }

        Ok(RefreshedTokens {
            access: Secret::new(tokens.access),
            refresh: tokens.refresh.filter(|r| !r.is_empty()).map(Secret::new),
        })
    }
}
