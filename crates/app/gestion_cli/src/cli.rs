use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use gestion_core::authz::RoleFilter;
use gestion_core::models::task::{TaskPriority, TaskStatus};

/// Command-line client for the Gestion project/task API.
#[derive(Parser, Debug)]
#[command(name = "gestion", version, about = "Gestion project/task client")]
pub struct Cli {
    /// API root URL.
    #[arg(long, global = true, env = "GESTION_API_URL")]
    pub api_url: Option<String>,

    /// File holding the persisted access/refresh tokens.
    #[arg(long, global = true, env = "GESTION_CREDENTIALS_PATH")]
    pub credentials: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store tokens.
    Login {
        username: String,
        #[arg(long, env = "GESTION_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget stored tokens. Local only.
    Logout,
    /// Show the logged-in user and token expiry.
    Whoami,
    /// Create an account.
    Register {
        username: String,
        #[arg(long, env = "GESTION_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// List users.
    Users,
    /// List projects visible to you.
    Projects {
        #[arg(long, value_enum, default_value_t = RoleArg::All)]
        filter: RoleArg,
    },
    /// Delete a project (owner only).
    ProjectDelete { project: i64 },
    /// Hand a project to another user (owner only).
    ProjectTransfer { project: i64, new_owner_id: i64 },
    /// List tasks.
    Tasks {
        #[arg(long)]
        project: Option<i64>,
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
        #[arg(long)]
        assignee: Option<i64>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<TaskPriority>,
    },
    /// Show a project's tasks as a kanban board.
    Board { project: i64 },
    /// Move a task to another column.
    TaskStatus {
        task: i64,
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },
    /// Delete a task (project owner or task creator only).
    TaskDelete { task: i64 },
    /// Print version.
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleArg {
    All,
    Owner,
    Manager,
    Member,
}

impl From<RoleArg> for RoleFilter {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::All => RoleFilter::All,
            RoleArg::Owner => RoleFilter::Owner,
            RoleArg::Manager => RoleFilter::Manager,
            RoleArg::Member => RoleFilter::Member,
        }
    }
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    s.parse().map_err(|e: gestion_core::CoreError| e.to_string())
}

fn parse_priority(s: &str) -> Result<TaskPriority, String> {
    s.parse().map_err(|e: gestion_core::CoreError| e.to_string())
}
