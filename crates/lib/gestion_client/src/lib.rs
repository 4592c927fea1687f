//! # gestion_client
//!
//! Session-aware client for the Gestion project/task API.
//!
//! Every API call goes through the [`gateway::Gateway`], which attaches the
//! bearer token held by the [`credentials::CredentialStore`]. A 401 triggers
//! at most one refresh (shared by all concurrent callers, see
//! [`refresh::RefreshCoordinator`]) and exactly one retry. The
//! [`session::Session`] owns these pieces and exposes login/logout plus the
//! typed resource APIs in [`api`].

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod refresh;
pub mod session;

pub use api::{ProjectsApi, TasksApi, UsersApi};
pub use config::ClientConfig;
pub use credentials::{
    CredentialPersistence, CredentialStore, FilePersistence, MemoryPersistence, SessionStatus,
};
pub use error::{ClientError, ClientResult};
pub use gateway::{ApiRequest, ApiResponse, Gateway};
pub use refresh::{
    HttpTokenRefresher, RefreshCoordinator, RefreshFailure, RefreshState, TokenRefresher,
};
pub use session::Session;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
