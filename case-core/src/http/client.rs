use super::refresher::{HttpTokenRefresher, TokenRefresher};
use super::request::{parse_base_url, Method, Payload, RequestDescriptor};
use super::single_flight::{FlightPhase, SingleFlight};
use crate::config::ApiSettings;
use crate::error::{ClientError, RefreshFailure};
use crate::observability::metrics::{record_refresh, record_request};
use crate::session::{Session, SessionStore};
use reqwest::{Client, Response, StatusCode, Url};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Session lifecycle notifications.
///
/// `ReauthenticationRequired` is the cue to send the user back to sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SessionEstablished,
    SessionRefreshed,
    ReauthenticationRequired,
    LoggedOut,
}

const EVENT_CAPACITY: usize = 16;

/// Authenticated client for the case API.
///
/// Every call carries the stored access token. When the backend rejects it
/// with 401 the client refreshes the session once, shared by every call that
/// is rejected meanwhile, and replays each rejected call a single time with
/// the new token.
pub struct ApiClient {
    http: Client,
    base_url: Url,
    store: Arc<dyn SessionStore>,
    refresher: Arc<dyn TokenRefresher>,
    refresh_flight: SingleFlight<Secret<String>, RefreshFailure>,
    events: broadcast::Sender<AuthEvent>,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings, store: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let http = Client::new();
        let base_url = parse_base_url(&settings.base_url)?;
        let refresher = HttpTokenRefresher::new(http.clone(), &base_url, &settings.refresh_path)?;

        tracing::info!(
            base_url = %base_url,
            refresh_url = %refresher.url(),
            "API client configured"
        );

        Ok(Self::with_refresher(
            http,
            base_url,
            store,
            Arc::new(refresher),
        ))
    }

    pub fn with_refresher(
        http: Client,
        base_url: Url,
        store: Arc<dyn SessionStore>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            http,
            base_url,
            store,
            refresher,
            refresh_flight: SingleFlight::new(),
            events,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn refresh_phase(&self) -> FlightPhase {
        self.refresh_flight.phase()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Store the tokens obtained at sign-in.
    pub async fn establish_session(&self, session: Session) -> Result<(), ClientError> {
        self.store.save(&session).await?;
        tracing::info!("Session established");
        self.notify(AuthEvent::SessionEstablished);
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.store.clear().await?;
        tracing::info!("Session cleared by logout");
        self.notify(AuthEvent::LoggedOut);
        Ok(())
    }

    pub async fn is_signed_in(&self) -> Result<bool, ClientError> {
        Ok(self
            .store
            .load()
            .await?
            .map(|s| s.has_access_token())
            .unwrap_or(false))
    }

    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.request(Method::Get, path, None).await
    }

    pub async fn post(&self, path: &str, body: Payload) -> Result<Value, ClientError> {
        self.request(Method::Post, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Payload) -> Result<Value, ClientError> {
        self.request(Method::Put, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: Payload) -> Result<Value, ClientError> {
        self.request(Method::Patch, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        self.request(Method::Delete, path, None).await
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        payload: Option<Payload>,
    ) -> Result<Value, ClientError> {
        let mut descriptor = RequestDescriptor::new(method, path);
        descriptor.payload = payload;
        self.send(&descriptor).await
    }

    /// Same as [`ApiClient::request`], decoding the body into `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Option<Payload>,
    ) -> Result<T, ClientError> {
        let body = self.request(method, path, payload).await?;
        Ok(serde_json::from_value(body)?)
    }

    #[tracing::instrument(
        name = "api_request",
        skip(self, descriptor),
        fields(method = %descriptor.method, path = %descriptor.path, request_id)
    )]
    pub async fn send(&self, descriptor: &RequestDescriptor) -> Result<Value, ClientError> {
        let session = match self.store.load().await? {
            Some(session) if session.has_access_token() => session,
            _ => {
                tracing::warn!("No session available, request not sent");
                return Err(ClientError::NoSession);
            }
        };

        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let sent_with = session.access_token().clone();
        let response = self.dispatch(descriptor, &sent_with, &request_id).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return read_body(descriptor, response).await;
        }

        tracing::info!("Access token rejected, waiting for a fresh one");
        let exchange = RefreshExchange {
            store: self.store.clone(),
            refresher: self.refresher.clone(),
            events: self.events.clone(),
        };
        let fresh = self
            .refresh_flight
            .run(move || exchange.run(sent_with))
            .await?;

        // Replayed once; a second 401 is returned as is.
        let replay = self.dispatch(descriptor, &fresh, &request_id).await?;
        read_body(descriptor, replay).await
    }

    async fn dispatch(
        &self,
        descriptor: &RequestDescriptor,
        access_token: &Secret<String>,
        request_id: &str,
    ) -> Result<Response, ClientError> {
        let start = Instant::now();
        let response = descriptor
            .build(&self.http, &self.base_url, access_token, request_id)?
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to send {} request to {}: {}",
                    descriptor.method,
                    descriptor.path,
                    e
                );
                ClientError::Transport(e)
            })?;

        record_request(
            descriptor.method.as_str(),
            response.status().as_u16(),
            start.elapsed(),
        );
        Ok(response)
    }

    fn notify(&self, event: AuthEvent) {
        notify(&self.events, event);
    }
}

fn notify(events: &broadcast::Sender<AuthEvent>, event: AuthEvent) {
    // No subscribers is fine.
    let _ = events.send(event);
}

/// Owned handles for one refresh, so the exchange outlives the request that
/// started it.
struct RefreshExchange {
    store: Arc<dyn SessionStore>,
    refresher: Arc<dyn TokenRefresher>,
    events: broadcast::Sender<AuthEvent>,
}

impl RefreshExchange {
    /// When the store already holds a different access token than the one
    /// that was rejected, an earlier refresh won the race and its token is
    /// reused without another exchange.
    async fn run(self, rejected: Secret<String>) -> Result<Secret<String>, RefreshFailure> {
        let session = match self.store.load().await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(RefreshFailure::no_session()),
            Err(e) => return Err(RefreshFailure::storage(e)),
        };

        if session.has_access_token()
            && session.access_token().expose_secret() != rejected.expose_secret()
        {
            tracing::debug!("Session already refreshed, reusing stored access token");
            return Ok(session.access_token().clone());
        }

        match self.refresher.refresh(session.refresh_token()).await {
            Ok(tokens) => {
                let renewed = session.renewed(tokens.access, tokens.refresh);
                if let Err(e) = self.store.save(&renewed).await {
                    tracing::error!("Failed to persist refreshed session: {}", e);
                    record_refresh("failure");
                    return Err(RefreshFailure::storage(e));
                }

                record_refresh("success");
                tracing::info!("Session refreshed");
                notify(&self.events, AuthEvent::SessionRefreshed);
                Ok(renewed.access_token().clone())
            }
            Err(failure) => {
                tracing::warn!(
                    status = ?failure.status,
                    "Token refresh failed, clearing session: {}",
                    failure
                );
                if let Err(e) = self.store.clear().await {
                    tracing::error!("Failed to clear session after refresh failure: {}", e);
                }

                record_refresh("failure");
                notify(&self.events, AuthEvent::ReauthenticationRequired);
                Err(failure)
            }
        }
    }
}

async fn read_body(descriptor: &RequestDescriptor, response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_str(&text)?);
    }

    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    tracing::warn!(
        status = status.as_u16(),
        "{} {} failed",
        descriptor.method,
        descriptor.path
    );
    Err(ClientError::Request { status, body })
}
