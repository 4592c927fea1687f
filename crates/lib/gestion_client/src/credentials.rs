// @zen-component: AUTH-CredentialStore
//
//! Credential store: the single source of truth for the session's tokens.
//!
//! Tokens live behind a [`CredentialPersistence`] backend and are re-read on
//! every access, so no component holds a token longer than one outgoing call.
//! The resolved [`Actor`] is kept in memory only and dies with the tokens.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use gestion_core::models::auth::{Actor, CredentialPair};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Credential persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Corrupt credentials file: {0}")]
    Format(#[from] serde_json::Error),
}

/// Durable key-value backing for the credential pair.
pub trait CredentialPersistence: Send + Sync {
    /// Current pair; an empty pair when nothing is stored.
    fn load(&self) -> Result<CredentialPair, StoreError>;

    fn save(&self, pair: &CredentialPair) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

// =============================================================================
// Backends
// =============================================================================

/// JSON file backend storing `accessToken` / `refreshToken`.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialPersistence for FilePersistence {
    fn load(&self) -> Result<CredentialPair, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CredentialPair::default()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(CredentialPair::default());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crash never leaves a truncated file behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(pair)?)?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// In-memory backend; lost on restart.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    pair: Mutex<CredentialPair>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with a pair, as if persisted by an earlier run.
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            pair: Mutex::new(pair),
        }
    }
}

impl CredentialPersistence for MemoryPersistence {
    fn load(&self) -> Result<CredentialPair, StoreError> {
        Ok(self
            .pair
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        *self.pair.lock().unwrap_or_else(PoisonError::into_inner) = pair.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.pair.lock().unwrap_or_else(PoisonError::into_inner) = CredentialPair::default();
        Ok(())
    }
}

// =============================================================================
// Store
// =============================================================================

/// UI-visible session status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticated(Actor),
}

/// Holds the credential pair (via persistence) and the resolved actor.
pub struct CredentialStore {
    persistence: Box<dyn CredentialPersistence>,
    actor: RwLock<Option<Actor>>,
    status: watch::Sender<SessionStatus>,
}

impl CredentialStore {
    pub fn new(persistence: impl CredentialPersistence + 'static) -> Self {
        Self {
            persistence: Box::new(persistence),
            actor: RwLock::new(None),
            status: watch::Sender::new(SessionStatus::Anonymous),
        }
    }

    pub fn get(&self) -> Result<CredentialPair, StoreError> {
        self.persistence.load()
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.get()?.access_token)
    }

    /// Replace the whole pair (login). The previous actor no longer applies.
    pub fn set(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        self.persistence.save(pair)?;
        self.replace_actor(None);
        Ok(())
    }

    /// Swap in a refreshed access token, keeping the refresh token.
    pub fn set_access_token(&self, access_token: &str) -> Result<(), StoreError> {
        let mut pair = self.get()?;
        pair.access_token = Some(access_token.to_string());
        self.persistence.save(&pair)
    }

    /// Drop tokens and actor. Infallible for callers: a backend failure is
    /// logged and the in-memory session is ended regardless.
    pub fn clear(&self) {
        if let Err(e) = self.persistence.clear() {
            warn!(error = %e, "failed to clear persisted credentials");
        }
        self.replace_actor(None);
    }

    pub fn actor(&self) -> Option<Actor> {
        self.actor
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_actor(&self, actor: Actor) {
        self.replace_actor(Some(actor));
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status change, including the forced
    /// logout after a failed refresh.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    fn replace_actor(&self, actor: Option<Actor>) {
        let status = match &actor {
            Some(a) => SessionStatus::Authenticated(a.clone()),
            None => SessionStatus::Anonymous,
        };
        *self.actor.write().unwrap_or_else(PoisonError::into_inner) = actor;
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}
