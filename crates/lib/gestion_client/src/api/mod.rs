//! Typed wrappers over the project, task and user endpoints.
//!
//! Every call goes through the session's [`Gateway`](crate::Gateway).
//! Mutations run the local authorization gate first; a denial never reaches
//! the network.

mod projects;
mod tasks;
mod users;

pub use projects::ProjectsApi;
pub use tasks::TasksApi;
pub use users::UsersApi;
