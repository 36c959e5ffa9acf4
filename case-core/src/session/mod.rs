//! Persisted session credentials.
//!
//! A session is created when the user signs in, rewritten after every
//! successful token refresh, and removed when a refresh fails or the user
//! logs out.

mod file;

pub use file::FileSessionStore;

use crate::config::SessionSettings;
use crate::error::SessionError;
use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Access and refresh tokens for the signed-in user.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: Secret<String>,
    refresh_token: Secret<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            refresh_token: Secret::new(refresh_token.into()),
        }
    }

    pub fn access_token(&self) -> &Secret<String> {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &Secret<String> {
        &self.refresh_token
    }

    pub fn has_access_token(&self) -> bool {
        !self.access_token.expose_secret().is_empty()
    }

    /// Replace the access token, and the refresh token too when the
    /// refresh endpoint rotated it.
    pub fn renewed(&self, access_token: Secret<String>, refresh_token: Option<Secret<String>>) -> Self {
        Self {
            access_token,
            refresh_token: refresh_token.unwrap_or_else(|| self.refresh_token.clone()),
        }
    }
}

/// On-disk shape of a session.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    access_token: String,
    refresh_token: String,
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.access_token.expose_secret().clone(),
            refresh_token: session.refresh_token.expose_secret().clone(),
        }
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        Session::new(stored.access_token, stored.refresh_token)
    }
}

/// Storage for the single session record.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<Session>, SessionError>;
    async fn save(&self, session: &Session) -> Result<(), SessionError>;
    async fn clear(&self) -> Result<(), SessionError>;
}

/// Keeps the session in process memory only.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        *self.session.write().await = None;
        Ok(())
    }
}

/// The store described by `settings`: the session file unless memory-only
/// storage was asked for.
pub fn build_store(settings: &SessionSettings) -> Arc<dyn SessionStore> {
    if settings.in_memory {
        tracing::warn!("Session kept in memory only; it ends with this process");
        Arc::new(MemorySessionStore::new())
    } else {
        tracing::debug!(path = %settings.path.display(), "Using session file");
        Arc::new(FileSessionStore::new(&settings.path))
    }
}
