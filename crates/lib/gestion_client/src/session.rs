// @zen-component: AUTH-SessionContext
//
//! Session context: login, logout and the current actor.
//!
//! A `Session` owns the credential store, the refresh coordinator and the
//! gateway. It is passed explicitly to whatever needs it; there is no global
//! session state.

use std::sync::Arc;

use gestion_core::models::auth::{Actor, CredentialPair, Credentials, TokenPair};
use reqwest::StatusCode;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::{ProjectsApi, TasksApi, UsersApi};
use crate::config::ClientConfig;
use crate::credentials::{CredentialPersistence, CredentialStore, FilePersistence, SessionStatus};
use crate::error::{ClientError, ClientResult};
use crate::gateway::{ApiRequest, ApiResponse, Gateway};
use crate::refresh::{HttpTokenRefresher, RefreshCoordinator, RefreshState, TokenRefresher};

const TOKEN_PATH: &str = "/users/token/";
const REFRESH_PATH: &str = "/users/token/refresh/";
const IDENTITY_PATH: &str = "/users/me/";
const REGISTER_PATH: &str = "/users/register/";

pub struct Session {
    config: ClientConfig,
    http: reqwest::Client,
    store: Arc<CredentialStore>,
    coordinator: RefreshCoordinator,
    gateway: Gateway,
}

impl Session {
    /// Session backed by the credentials file named in the config.
    pub fn from_config(config: ClientConfig) -> Self {
        let persistence = FilePersistence::new(config.credentials_path.clone());
        Self::new(config, persistence)
    }

    /// Session refreshing tokens over HTTP.
    pub fn new(config: ClientConfig, persistence: impl CredentialPersistence + 'static) -> Self {
        let http = reqwest::Client::new();
        let refresher = Arc::new(HttpTokenRefresher::new(
            http.clone(),
            config.endpoint(REFRESH_PATH),
        ));
        Self::with_refresher(config, http, persistence, refresher)
    }

    /// Session with an explicit HTTP client and refresher.
    pub fn with_refresher(
        config: ClientConfig,
        http: reqwest::Client,
        persistence: impl CredentialPersistence + 'static,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let store = Arc::new(CredentialStore::new(persistence));
        let coordinator = RefreshCoordinator::new(store.clone(), refresher);
        let gateway = Gateway::new(
            http.clone(),
            config.api_base_url.clone(),
            store.clone(),
            coordinator.clone(),
        );
        Self {
            config,
            http,
            store,
            coordinator,
            gateway,
        }
    }

    /// Restore a persisted session by resolving the actor silently.
    ///
    /// Returns `Ok(None)` when nothing is stored. A network failure keeps the
    /// stored tokens (the caller may retry); any other failure rolls the
    /// session back to logged-out.
    pub async fn init(&self) -> ClientResult<Option<Actor>> {
        if self.store.get()?.is_empty() {
            return Ok(None);
        }
        match self.resolve_identity().await {
            Ok(actor) => {
                info!(username = %actor.username, "session restored");
                Ok(Some(actor))
            }
            Err(e @ ClientError::Network(_)) => {
                warn!(error = %e, "identity check unreachable; keeping stored credentials");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "stored credentials rejected; logging out");
                self.store.clear();
                Err(e)
            }
        }
    }

    /// Exchange username/password for tokens, then resolve the actor. If the
    /// identity call fails the session is rolled back to logged-out.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<Actor> {
        require_field("username", username)?;
        require_field("password", password)?;

        let resp = self
            .post_unauthenticated(TOKEN_PATH, &Credentials { username, password })
            .await?;
        let tokens: TokenPair = match resp.status() {
            s if s.is_success() => resp.json()?,
            StatusCode::UNAUTHORIZED => return Err(ClientError::InvalidCredentials(resp.detail())),
            _ => return Err(resp.error_for_status().err().unwrap_or(ClientError::AuthenticationFailed)),
        };

        self.coordinator.reset();
        self.store.set(&CredentialPair::from(tokens))?;

        match self.resolve_identity().await {
            Ok(actor) => {
                info!(username = %actor.username, id = actor.id, "logged in");
                Ok(actor)
            }
            Err(e) => {
                warn!(error = %e, "identity resolution failed after login; rolling back");
                self.store.clear();
                Err(e)
            }
        }
    }

    /// Local, unconditional logout. Never touches the network. A refresh
    /// still in flight is abandoned and cannot write its token back.
    pub fn logout(&self) {
        self.coordinator.reset();
        self.store.clear();
        info!("logged out");
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, username: &str, password: &str) -> ClientResult<()> {
        require_field("username", username)?;
        require_field("password", password)?;
        self.post_unauthenticated(REGISTER_PATH, &Credentials { username, password })
            .await?
            .error_for_status()?;
        info!(username, "account registered");
        Ok(())
    }

    pub fn actor(&self) -> Option<Actor> {
        self.store.actor()
    }

    /// Current actor, or `NotLoggedIn`.
    pub fn require_actor(&self) -> ClientResult<Actor> {
        self.store.actor().ok_or(ClientError::NotLoggedIn)
    }

    pub fn status(&self) -> SessionStatus {
        self.store.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.store.subscribe()
    }

    pub fn credentials(&self) -> ClientResult<CredentialPair> {
        Ok(self.store.get()?)
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.coordinator.state()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn projects(&self) -> ProjectsApi<'_> {
        ProjectsApi::new(self)
    }

    pub fn tasks(&self) -> TasksApi<'_> {
        TasksApi::new(self)
    }

    pub fn users(&self) -> UsersApi<'_> {
        UsersApi::new(self)
    }

    async fn resolve_identity(&self) -> ClientResult<Actor> {
        let actor: Actor = self.gateway.send_json(ApiRequest::get(IDENTITY_PATH)).await?;
        self.store.set_actor(actor.clone());
        Ok(actor)
    }

    /// Token and registration endpoints bypass the gateway: a 401 there means
    /// bad credentials, not an expired token.
    async fn post_unauthenticated(
        &self,
        path: &str,
        body: &Credentials<'_>,
    ) -> ClientResult<ApiResponse> {
        let resp = self
            .http
            .post(self.config.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(ApiResponse::new(status, bytes.to_vec()))
    }
}

fn require_field(field: &str, value: &str) -> ClientResult<()> {
    if value.trim().is_empty() {
        return Err(ClientError::Validation(format!("{field} is required")));
    }
    Ok(())
}
