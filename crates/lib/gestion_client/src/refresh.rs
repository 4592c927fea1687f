// @zen-component: AUTH-RefreshCoordinator
//
//! Token refresh coordinator.
//!
//! Turns a 401 into either a fresh access token or a terminated session.
//! However many requests fail at once, only one refresh call is in flight:
//! the first caller starts it and everyone else awaits the same shared
//! future. Deciding to start or join happens under a single lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use gestion_core::models::auth::{RefreshRequest, RefreshedAccess};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::credentials::CredentialStore;

/// Why a refresh did not produce a token. Shared by all waiters, hence `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshFailure {
    #[error("no refresh token available")]
    MissingRefreshToken,

    #[error("refresh token rejected (HTTP {0})")]
    Rejected(u16),

    #[error("refresh request failed: {0}")]
    Network(String),

    #[error("refresh response unreadable: {0}")]
    Decode(String),

    #[error("credential storage failed: {0}")]
    Storage(String),

    #[error("session already terminated")]
    SessionTerminated,
}

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshFailure>;
}

/// `POST /users/token/refresh/`, sent outside the gateway so it can never
/// recurse into another refresh.
pub struct HttpTokenRefresher {
    client: reqwest::Client,
    url: String,
}

impl HttpTokenRefresher {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<String, RefreshFailure> {
        let resp = self
            .client
            .post(&self.url)
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await
            .map_err(|e| RefreshFailure::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RefreshFailure::Rejected(resp.status().as_u16()));
        }

        resp.json::<RefreshedAccess>()
            .await
            .map(|body| body.access)
            .map_err(|e| RefreshFailure::Decode(e.to_string()))
    }
}

/// Observable coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
    /// Terminal until [`RefreshCoordinator::reset`] (a fresh login).
    Failed,
}

type PendingRefresh = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

enum Phase {
    Idle,
    Refreshing(PendingRefresh),
    Failed,
}

struct Slot {
    /// Bumped by `reset`; a refresh started under an older generation must
    /// not touch the store when it finishes.
    generation: u64,
    phase: Phase,
}

struct Inner {
    store: Arc<CredentialStore>,
    refresher: Arc<dyn TokenRefresher>,
    slot: Mutex<Slot>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(self: Arc<Self>, generation: u64, refresh_token: String) -> Result<String, RefreshFailure> {
        info!("refreshing access token");
        let outcome = self.refresher.refresh(&refresh_token).await;

        let mut slot = self.lock();
        if slot.generation != generation {
            debug!("discarding refresh outcome from a previous session");
            return Err(RefreshFailure::SessionTerminated);
        }

        let outcome = outcome.and_then(|access| {
            self.store
                .set_access_token(&access)
                .map(|()| access)
                .map_err(|e| RefreshFailure::Storage(e.to_string()))
        });
        match &outcome {
            Ok(_) => {
                slot.phase = Phase::Idle;
                info!("access token refreshed");
            }
            Err(e) => {
                slot.phase = Phase::Failed;
                warn!(error = %e, "token refresh failed; ending session");
                self.store.clear();
            }
        }
        outcome
    }
}

/// Single-flight refresh state machine over the credential store.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<CredentialStore>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                refresher,
                slot: Mutex::new(Slot {
                    generation: 0,
                    phase: Phase::Idle,
                }),
            }),
        }
    }

    pub fn state(&self) -> RefreshState {
        match self.inner.lock().phase {
            Phase::Idle => RefreshState::Idle,
            Phase::Refreshing(_) => RefreshState::Refreshing,
            Phase::Failed => RefreshState::Failed,
        }
    }

    /// Obtain a new access token, starting a refresh or joining the one in
    /// flight. On success the token is already in the store.
    pub async fn refresh(&self) -> Result<String, RefreshFailure> {
        let pending = self.begin_or_join()?;
        pending.await
    }

    /// Back to `Idle` for a new session, or after logout. An in-flight
    /// refresh from the old session finishes without touching the store and
    /// its waiters see `SessionTerminated`. Call before writing or clearing
    /// the store.
    pub fn reset(&self) {
        let mut slot = self.inner.lock();
        slot.generation += 1;
        slot.phase = Phase::Idle;
    }

    /// Force the terminal state and purge the session.
    pub fn terminate(&self) {
        {
            let mut slot = self.inner.lock();
            slot.phase = Phase::Failed;
        }
        self.inner.store.clear();
    }

    fn begin_or_join(&self) -> Result<PendingRefresh, RefreshFailure> {
        let mut slot = self.inner.lock();
        match &slot.phase {
            Phase::Refreshing(pending) => {
                debug!("joining in-flight token refresh");
                return Ok(pending.clone());
            }
            Phase::Failed => return Err(RefreshFailure::SessionTerminated),
            Phase::Idle => {}
        }

        let refresh_token = match self.inner.store.get() {
            Ok(pair) => pair.refresh_token,
            Err(e) => {
                slot.phase = Phase::Failed;
                drop(slot);
                warn!(error = %e, "cannot read refresh token; ending session");
                self.inner.store.clear();
                return Err(RefreshFailure::Storage(e.to_string()));
            }
        };
        let Some(refresh_token) = refresh_token else {
            slot.phase = Phase::Failed;
            drop(slot);
            warn!("no refresh token; ending session");
            self.inner.store.clear();
            return Err(RefreshFailure::MissingRefreshToken);
        };

        let pending = Arc::clone(&self.inner)
            .run(slot.generation, refresh_token)
            .boxed()
            .shared();
        slot.phase = Phase::Refreshing(pending.clone());
        Ok(pending)
    }
}
