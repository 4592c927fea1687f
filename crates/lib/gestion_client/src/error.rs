//! Client error types.

use gestion_core::CoreError;
use gestion_core::authz::Denied;
use thiserror::Error;

use crate::credentials::StoreError;
use crate::refresh::RefreshFailure;

/// Convenience alias for client results.
pub type ClientResult<T> = Result<T, ClientError>;

/// Everything an API call can fail with, grouped the way callers react to it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response was received. Never ends the session.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not logged in")]
    NotLoggedIn,

    /// The token endpoint rejected the username/password.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The token refresh failed; the session has been purged.
    #[error("Session expired: {0}")]
    SessionExpired(RefreshFailure),

    /// The request was still rejected with 401 after a refresh; the session
    /// has been purged.
    #[error("Authentication failed after token refresh")]
    AuthenticationFailed,

    /// Server-side authorization rejection (HTTP 403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Local authorization gate denial; nothing was sent.
    #[error("Not allowed: {0}")]
    Denied(#[from] Denied),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error (HTTP {status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Credential storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether this error ended the session (tokens purged, login required).
    pub fn is_session_terminal(&self) -> bool {
        matches!(
            self,
            ClientError::SessionExpired(_) | ClientError::AuthenticationFailed
        )
    }
}

impl From<CoreError> for ClientError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(msg) => ClientError::Validation(msg),
            CoreError::Token(msg) => ClientError::Serialization(msg),
        }
    }
}
