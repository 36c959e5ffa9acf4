use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Why a refresh-token exchange did not yield a new access token.
///
/// Cloned out to every request queued behind the failed exchange.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RefreshFailure {
    /// Status returned by the refresh endpoint, when it answered at all.
    pub status: Option<StatusCode>,
    pub message: String,
    abandoned: bool,
}

impl RefreshFailure {
    pub fn rejected(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: format!("refresh token rejected ({}): {}", status, body.into()),
            abandoned: false,
        }
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self {
            status: None,
            message: format!("refresh request failed: {}", err),
            abandoned: false,
        }
    }

    pub fn no_session() -> Self {
        Self {
            status: None,
            message: "session was cleared before the refresh could run".to_string(),
            abandoned: false,
        }
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self {
            status: None,
            message: format!("session storage failed during refresh: {}", err),
            abandoned: false,
        }
    }

    /// The exchange never finished; the stored session was left untouched.
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }
}

/// The shared refresh stopped before producing a result.
#[derive(Debug, Clone, Copy, Error)]
#[error("refresh was abandoned before it completed")]
pub struct Abandoned;

impl From<Abandoned> for RefreshFailure {
    fn from(err: Abandoned) -> Self {
        Self {
            status: None,
            message: err.to_string(),
            abandoned: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session record is malformed: {0}")]
    Format(serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No session: sign in before calling the API")]
    NoSession,

    #[error("Session refresh failed: {0}")]
    RefreshFailed(RefreshFailure),

    /// The shared refresh stopped without an answer. The session is still stored.
    #[error("Session refresh interrupted: {0}")]
    RefreshInterrupted(RefreshFailure),

    #[error("Request failed with status {status}")]
    Request { status: StatusCode, body: Value },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Session storage error: {0}")]
    Session(#[from] SessionError),

    #[error("Invalid resource path: {0}")]
    InvalidPath(String),
}

impl From<RefreshFailure> for ClientError {
    fn from(failure: RefreshFailure) -> Self {
        if failure.is_abandoned() {
            ClientError::RefreshInterrupted(failure)
        } else {
            ClientError::RefreshFailed(failure)
        }
    }
}

/// Coarse classification of a [`ClientError`] for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No access token was available; nothing was sent.
    NoSession,
    /// The session could not be refreshed and has been cleared.
    RefreshFailed,
    /// The refresh stopped without an answer; retrying may succeed.
    Interrupted,
    /// The backend answered with a non-success status.
    Request,
    /// The backend could not be reached.
    Transport,
    Internal,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::NoSession => ErrorKind::NoSession,
            ClientError::RefreshFailed(_) => ErrorKind::RefreshFailed,
            ClientError::RefreshInterrupted(_) => ErrorKind::Interrupted,
            ClientError::Request { .. } => ErrorKind::Request,
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Decode(_) | ClientError::Session(_) | ClientError::InvalidPath(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// HTTP status carried by the error, if the backend answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Request { status, .. } => Some(*status),
            ClientError::RefreshFailed(failure) => failure.status,
            ClientError::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// Whether the user has to sign in again before further calls can succeed.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self.kind(), ErrorKind::NoSession | ErrorKind::RefreshFailed)
    }
}
