//! # gestion_core
//!
//! Core domain logic for Gestion: the project/task data model, the local
//! authorization gate, and the kanban board projection.

pub mod auth;
pub mod authz;
pub mod board;
pub mod error;
pub mod models;

pub use error::{CoreError, CoreResult};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
